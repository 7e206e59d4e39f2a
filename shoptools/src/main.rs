use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use shop_common::Cents;

mod callback;
mod migrate;

use crate::{callback::print_callback, callback::print_signature, migrate::run_migration};

#[derive(Parser, Debug)]
#[command(version, about = "Operator tools for the card shop")]
pub struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "migrate", about = "Copy a JSON file store into a Postgres database")]
    Migrate(MigrateParams),
    #[clap(name = "callback", about = "Print a signed payment notification form body")]
    Callback(CallbackParams),
    #[clap(name = "sign", about = "Sign an arbitrary list of fields with the gateway secret")]
    Sign(SignParams),
}

#[derive(Debug, Args)]
pub struct MigrateParams {
    /// Directory holding products.json, card-secrets.json and orders.json
    #[arg(short = 'd', long = "data-dir", env = "SHOP_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,
    /// Target Postgres database
    #[arg(short = 'u', long = "database-url", env = "SHOP_DATABASE_URL")]
    database_url: String,
}

#[derive(Debug, Args)]
pub struct CallbackParams {
    /// The shop's order id. Also used as the gateway payId.
    #[arg(short = 'o', long = "order-id")]
    order_id: String,
    #[arg(short = 'p', long = "product-id")]
    product_id: String,
    /// The contact info the order was placed with
    #[arg(short = 'c', long = "contact")]
    contact_info: String,
    /// Order price, in major units (e.g. 15.50)
    #[arg(long = "price")]
    price: Cents,
    /// Amount actually paid. Defaults to the price.
    #[arg(long = "really-price")]
    really_price: Option<Cents>,
    /// wechat or alipay
    #[arg(short = 't', long = "type", default_value = "alipay")]
    payment_type: pay_gateway::PaymentType,
    /// The gateway's shared secret
    #[arg(short = 's', long = "secret", env = "SHOP_PAYMENT_SECRET_KEY")]
    secret: String,
}

#[derive(Debug, Args)]
pub struct SignParams {
    /// The gateway's shared secret
    #[arg(short = 's', long = "secret", env = "SHOP_PAYMENT_SECRET_KEY")]
    secret: String,
    /// Field values, in signing order
    #[arg(required = true)]
    fields: Vec<String>,
}

fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();
    let cli = Arguments::parse();
    let result = match cli.command {
        Command::Migrate(params) => run_migration(params),
        Command::Callback(params) => print_callback(params),
        Command::Sign(params) => {
            print_signature(params);
            Ok(())
        },
    };
    if let Err(e) = result {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
