//! MD5 request signatures.
//!
//! The gateway signs by concatenating a fixed list of fields, then the shared secret, with no separators, and taking
//! the lowercase hex MD5 digest. There are exactly three field orderings, one per call site, and each is its own
//! function here so that callers cannot reorder fields.
use md5::{Digest, Md5};

/// Concatenate `fields` followed by `secret` and return the lowercase hex MD5 digest.
pub fn sign<S: AsRef<str>>(fields: &[S], secret: &str) -> String {
    let mut hasher = Md5::new();
    for field in fields {
        hasher.update(field.as_ref().as_bytes());
    }
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Exact, case-sensitive comparison against a freshly computed digest.
pub fn verify<S: AsRef<str>>(fields: &[S], secret: &str, candidate: &str) -> bool {
    sign(fields, secret) == candidate
}

/// `payId, param, type, price, secret`
pub fn create_order_signature(pay_id: &str, param: &str, payment_type: &str, price: &str, secret: &str) -> String {
    sign(&[pay_id, param, payment_type, price], secret)
}

/// `payId, param, type, price, reallyPrice, secret`
pub fn callback_signature(
    pay_id: &str,
    param: &str,
    payment_type: &str,
    price: &str,
    really_price: &str,
    secret: &str,
) -> String {
    sign(&[pay_id, param, payment_type, price, really_price], secret)
}

/// `orderId, secret`
pub fn close_order_signature(order_id: &str, secret: &str) -> String {
    sign(&[order_id], secret)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_digest() {
        // md5("abc")
        assert_eq!(sign(&["a", "b"], "c"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(sign::<&str>(&[], ""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn deterministic() {
        let fields = ["ORD1", "{\"a\":1}", "1", "15"];
        assert_eq!(sign(&fields, "key"), sign(&fields, "key"));
    }

    #[test]
    fn verify_accepts_own_signature_and_rejects_any_mutation() {
        let fields = ["ORD1", "{\"productId\":\"p\"}", "1", "15", "15"];
        let secret = "s3cret";
        let digest = sign(&fields, secret);
        assert!(verify(&fields, secret, &digest));
        for i in 0..fields.len() {
            let mut mutated = fields;
            let changed = format!("{}x", fields[i]);
            mutated[i] = &changed;
            assert!(!verify(&mutated, secret, &digest), "mutating field {i} should break the signature");
        }
        assert!(!verify(&fields, "other", &digest));
        assert!(!verify(&fields, secret, &digest.to_uppercase()));
    }

    #[test]
    fn orderings_are_fixed() {
        let secret = "k";
        assert_eq!(create_order_signature("P", "{}", "2", "0.01", secret), sign(&["P", "{}", "2", "0.01"], secret));
        assert_eq!(callback_signature("P", "{}", "2", "1", "0.99", secret), sign(&["P", "{}", "2", "1", "0.99"], secret));
        assert_eq!(close_order_signature("G1", secret), sign(&["G1"], secret));
        assert_ne!(create_order_signature("P", "{}", "2", "1", secret), create_order_signature("{}", "P", "2", "1", secret));
    }
}
