use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets (SHOP_PAYMENT_SECRET_KEY, SHOP_ADMIN_TOKEN, SHOP_DATABASE_URL) are never printed
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "SHOP_HOST",
        "SHOP_PORT",
        "SHOP_DATA_DIR",
        "SHOP_PAYMENT_BASE_URL",
        "SHOP_PAYMENT_NOTIFY_URL",
        "SHOP_PAYMENT_RETURN_URL",
        "SHOP_PAYMENT_TIMEOUT",
        "SHOP_ALLOW_MOCK_SIGNATURE",
        "SHOP_FRONTEND_URL",
        "SHOP_ORDER_TTL",
        "SHOP_USE_X_FORWARDED_FOR",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    });
    let backend = if env::var("SHOP_DATABASE_URL").is_ok() { "postgres (SHOP_DATABASE_URL is set)" } else { "json-file" };
    println!("  {:<35} {backend}", "Backend");
}
