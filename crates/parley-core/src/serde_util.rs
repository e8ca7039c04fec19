//! Serde helpers for wire payloads

/// Field that distinguishes "absent" from "explicitly null" in update payloads.
///
/// `None` means the key was not present in the JSON object; `Some(None)` means
/// the server sent an explicit `null` (clear the field); `Some(Some(v))` sets
/// a new value. Use together with `#[serde(default, skip_serializing_if =
/// "Option::is_none")]`.
pub mod nullable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        // The key is present, so the outer Option is always Some; the inner
        // Option captures null vs value.
        Option::<T>::deserialize(deserializer).map(Some)
    }

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            // Unreachable when paired with skip_serializing_if
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            with = "super::nullable"
        )]
        topic: Option<Option<String>>,
    }

    #[test]
    fn test_absent_key() {
        let p: Payload = serde_json::from_str("{}").unwrap();
        assert_eq!(p.topic, None);
        assert_eq!(serde_json::to_string(&p).unwrap(), "{}");
    }

    #[test]
    fn test_explicit_null() {
        let p: Payload = serde_json::from_str(r#"{"topic":null}"#).unwrap();
        assert_eq!(p.topic, Some(None));
        assert_eq!(serde_json::to_string(&p).unwrap(), r#"{"topic":null}"#);
    }

    #[test]
    fn test_value() {
        let p: Payload = serde_json::from_str(r#"{"topic":"general"}"#).unwrap();
        assert_eq!(p.topic, Some(Some("general".to_string())));
    }
}
