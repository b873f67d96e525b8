use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A wrapper for personal data (booker phone numbers) that masks its value in
/// Debug and Display output.
///
/// Serialization still yields the real value: the admin API needs it, while
/// tracing macros like `info!("{:?}", registration)` must not leak it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_hide_value() {
        let phone = Masked::new("+91 98765 43210".to_string());
        assert_eq!(format!("{:?}", phone), "********");
        assert_eq!(phone.to_string(), "********");
        assert_eq!(phone.expose(), "+91 98765 43210");
    }

    #[test]
    fn test_serialization_keeps_value() {
        let phone = Masked::new("9876543210".to_string());
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"9876543210\"");

        let back: Masked<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, phone);
    }
}
