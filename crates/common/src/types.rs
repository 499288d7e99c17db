use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Batch key taken from a message's `timestamp` field.
///
/// Keys are equal when their textual form is equal, so `100` and `"100"`
/// collide. Numeric keys sort by value and before any non-numeric key;
/// non-numeric keys sort lexically. Integer keys compare exactly, beyond
/// the range an `f64` can hold without rounding.
#[derive(Debug, Clone)]
pub struct TimestampKey {
    raw: String,
    numeric: Option<f64>,
    integer: Option<i128>,
}

impl TimestampKey {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let trimmed = raw.trim();
        let numeric = trimmed.parse::<f64>().ok().filter(|v| v.is_finite());
        let integer = trimmed.parse::<i128>().ok();
        Self {
            raw,
            numeric,
            integer,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn numeric(&self) -> Option<f64> {
        self.numeric
    }
}

impl PartialEq for TimestampKey {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for TimestampKey {}

impl Ord for TimestampKey {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Some(a), Some(b)) = (self.integer, other.integer) {
            return a.cmp(&b).then_with(|| self.raw.cmp(&other.raw));
        }
        match (self.numeric, other.numeric) {
            // Tie-break on text so `1` and `1.0` stay distinct keys.
            (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for TimestampKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for TimestampKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for TimestampKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<i64> for TimestampKey {
    fn from(value: i64) -> Self {
        Self::new(value.to_string())
    }
}

impl Serialize for TimestampKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for TimestampKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = TimestampKey;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a timestamp number or string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(TimestampKey::new(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(TimestampKey::new(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(TimestampKey::new(Value::from(v).to_string()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(TimestampKey::new(v))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

/// Alert record carried in a queue message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub timestamp: TimestampKey,

    /// Measured change reported by the producer. Absent values read as `null`.
    #[serde(default)]
    pub difference: Value,

    /// Any other producer fields, preserved untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl AlertMessage {
    /// Parse a queue message body.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// `difference` rendered for notification text (strings unquoted).
    pub fn difference_text(&self) -> String {
        match &self.difference {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Messages accumulated during a single drain cycle, keyed by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    messages: BTreeMap<TimestampKey, AlertMessage>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message under its own timestamp. A colliding timestamp replaces
    /// the earlier message.
    pub fn insert(&mut self, message: AlertMessage) -> Option<AlertMessage> {
        self.messages.insert(message.timestamp.clone(), message)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The message with the greatest key.
    pub fn most_recent(&self) -> Option<&AlertMessage> {
        self.messages.last_key_value().map(|(_, message)| message)
    }

    /// Messages in key order.
    pub fn iter(&self) -> impl Iterator<Item = &AlertMessage> {
        self.messages.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(timestamp: i64, difference: i64) -> AlertMessage {
        AlertMessage::parse(&format!(
            r#"{{"timestamp": {timestamp}, "difference": {difference}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_parse_numeric_timestamp() {
        let msg = AlertMessage::parse(r#"{"timestamp": 1700000000, "difference": 5, "sensor": "a"}"#)
            .unwrap();
        assert_eq!(msg.timestamp.as_str(), "1700000000");
        assert_eq!(msg.timestamp.numeric(), Some(1_700_000_000.0));
        assert_eq!(msg.difference_text(), "5");
        assert_eq!(msg.extra["sensor"], Value::from("a"));
    }

    #[test]
    fn test_parse_string_timestamp_and_difference() {
        let msg = AlertMessage::parse(r#"{"timestamp": "2024-01-01T00:00:00Z", "difference": "high"}"#)
            .unwrap();
        assert_eq!(msg.timestamp.to_string(), "2024-01-01T00:00:00Z");
        assert_eq!(msg.timestamp.numeric(), None);
        assert_eq!(msg.difference_text(), "high");
    }

    #[test]
    fn test_parse_rejects_missing_timestamp() {
        assert!(AlertMessage::parse(r#"{"difference": 3}"#).is_err());
        assert!(AlertMessage::parse(r#"{"timestamp": null}"#).is_err());
        assert!(AlertMessage::parse("not json").is_err());
    }

    #[test]
    fn test_missing_difference_is_null() {
        let msg = AlertMessage::parse(r#"{"timestamp": 7}"#).unwrap();
        assert_eq!(msg.difference_text(), "null");
    }

    #[test]
    fn test_numeric_keys_sort_by_value() {
        let mut batch = Batch::new();
        batch.insert(message(900, 1));
        batch.insert(message(1000, 2));
        batch.insert(message(99, 3));

        assert_eq!(batch.most_recent().unwrap().timestamp.as_str(), "1000");
        let order: Vec<_> = batch.iter().map(|m| m.timestamp.to_string()).collect();
        assert_eq!(order, vec!["99", "900", "1000"]);
    }

    #[test]
    fn test_text_keys_sort_after_numeric() {
        let mut a = TimestampKey::from("abc");
        let b = TimestampKey::from(5i64);
        assert!(b < a);
        a = TimestampKey::from("abd");
        assert!(TimestampKey::from("abc") < a);
    }

    #[test]
    fn test_large_integer_keys_compare_exactly() {
        // Both round to the same f64.
        let high = TimestampKey::from("10000000000000000001");
        let low = TimestampKey::from("9999999999999999999");
        assert_eq!(high.numeric(), low.numeric());
        assert!(low < high);

        let mut batch = Batch::new();
        batch.insert(AlertMessage::parse(r#"{"timestamp": 10000000000000000001, "difference": 1}"#).unwrap());
        batch.insert(AlertMessage::parse(r#"{"timestamp": 9999999999999999999, "difference": 2}"#).unwrap());
        assert_eq!(
            batch.most_recent().unwrap().timestamp.as_str(),
            "10000000000000000001"
        );
    }

    #[test]
    fn test_integer_and_fractional_keys_interleave() {
        let mut batch = Batch::new();
        batch.insert(AlertMessage::parse(r#"{"timestamp": 2, "difference": 1}"#).unwrap());
        batch.insert(AlertMessage::parse(r#"{"timestamp": 2.5, "difference": 2}"#).unwrap());
        batch.insert(AlertMessage::parse(r#"{"timestamp": 3, "difference": 3}"#).unwrap());
        let order: Vec<_> = batch.iter().map(|m| m.timestamp.to_string()).collect();
        assert_eq!(order, vec!["2", "2.5", "3"]);
    }

    #[test]
    fn test_colliding_timestamp_last_write_wins() {
        let mut batch = Batch::new();
        batch.insert(message(100, 1));
        let replaced = batch.insert(message(100, 2));

        assert_eq!(replaced.unwrap().difference, Value::from(1));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.most_recent().unwrap().difference, Value::from(2));
    }

    #[test]
    fn test_string_and_number_keys_collide() {
        let mut batch = Batch::new();
        batch.insert(message(100, 1));
        batch.insert(AlertMessage::parse(r#"{"timestamp": "100", "difference": 4}"#).unwrap());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_empty_batch_has_no_most_recent() {
        assert!(Batch::new().most_recent().is_none());
    }
}
