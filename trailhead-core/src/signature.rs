//! Payment callback signatures.
//!
//! The gateway signs `order_id|payment_id` with the merchant secret using
//! HMAC-SHA256 and hands the lowercase hex digest to the checkout client.
//! The digest is recomputed here instead of trusting the client.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, order_ref: &str, payment_ref: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(order_ref.as_bytes());
    mac.update(b"|");
    mac.update(payment_ref.as_bytes());
    Some(mac)
}

/// Lowercase hex signature the gateway would produce
pub fn expected_signature(secret: &str, order_ref: &str, payment_ref: &str) -> Option<String> {
    let mac = mac_for(secret, order_ref, payment_ref)?;
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature. Anything that is not valid hex fails.
pub fn verify_signature(order_ref: &str, payment_ref: &str, signature: &str, secret: &str) -> bool {
    let Ok(supplied) = hex::decode(signature.trim()) else {
        return false;
    };
    mac_for(secret, order_ref, payment_ref)
        .is_some_and(|mac| mac.verify_slice(&supplied).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret";
    const ORDER: &str = "order_Lx9b2K";
    const PAYMENT: &str = "pay_Lx9c8P";
    const KNOWN: &str = "95755461e1c4e206ba859dce4a74e69d7b056cefac4d7bfddc6ddefd73172e07";

    #[test]
    fn test_expected_signature_matches_reference() {
        assert_eq!(expected_signature(SECRET, ORDER, PAYMENT).as_deref(), Some(KNOWN));
    }

    #[test]
    fn test_verify_accepts_reference_signature() {
        assert!(verify_signature(ORDER, PAYMENT, KNOWN, SECRET));
        assert!(verify_signature(ORDER, PAYMENT, &KNOWN.to_uppercase(), SECRET));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let mut forged = KNOWN.to_string();
        forged.replace_range(0..2, "00");
        assert!(!verify_signature(ORDER, PAYMENT, &forged, SECRET));
        assert!(!verify_signature(ORDER, "pay_other", KNOWN, SECRET));
        assert!(!verify_signature(ORDER, PAYMENT, KNOWN, "wrong_secret"));
        assert!(!verify_signature(ORDER, PAYMENT, "not-hex", SECRET));
        assert!(!verify_signature(ORDER, PAYMENT, &KNOWN[..32], SECRET));
        assert!(!verify_signature(ORDER, PAYMENT, "", SECRET));
    }
}
