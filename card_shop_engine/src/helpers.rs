use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static MOBILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^1[3-9]\d{9}$").unwrap());

/// `ORD` + UTC timestamp to the second + four random digits, e.g. `ORD202405011200001234`.
pub fn new_order_number(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("ORD{}{suffix:04}", now.format("%Y%m%d%H%M%S"))
}

/// Accepts an email address or a mainland China mobile number.
pub fn is_valid_contact_info(contact: &str) -> bool {
    let contact = contact.trim();
    EMAIL.is_match(contact) || MOBILE.is_match(contact)
}
