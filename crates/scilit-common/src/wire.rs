//! Lenient decoders for the backend's JSON.
//!
//! The paper store is assembled from several parsers, so the same field may
//! arrive as a number, a numeric string, or `null` depending on the collection.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Int(u64),
    Float(f64),
    Str(String),
}

/// Character offset sent as either `12` or `"12"`.
pub fn offset<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match NumOrString::deserialize(deserializer)? {
        NumOrString::Int(n) => Ok(n as usize),
        NumOrString::Float(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as usize),
        NumOrString::Float(f) => Err(de::Error::custom(format!("invalid offset {f}"))),
        NumOrString::Str(s) => s
            .trim()
            .parse::<usize>()
            .map_err(|e| de::Error::custom(format!("invalid offset {s:?}: {e}"))),
    }
}

/// Free-text field that may be missing, `null`, or a bare number.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// Treat an explicit `null` like a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "offset")]
        start: usize,
        #[serde(default, deserialize_with = "lenient_string")]
        venue: String,
        #[serde(default, deserialize_with = "null_as_default")]
        items: Vec<u32>,
    }

    #[test]
    fn test_offset_accepts_numbers_and_strings() {
        let a: Probe = serde_json::from_str(r#"{"start": 7}"#).unwrap();
        let b: Probe = serde_json::from_str(r#"{"start": "7"}"#).unwrap();
        let c: Probe = serde_json::from_str(r#"{"start": 7.0}"#).unwrap();
        assert_eq!(a.start, 7);
        assert_eq!(b.start, 7);
        assert_eq!(c.start, 7);
    }

    #[test]
    fn test_offset_rejects_garbage() {
        assert!(serde_json::from_str::<Probe>(r#"{"start": "seven"}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"start": 1.5}"#).is_err());
    }

    #[test]
    fn test_nulls_become_defaults() {
        let p: Probe = serde_json::from_str(r#"{"start": 0, "venue": null, "items": null}"#).unwrap();
        assert_eq!(p.venue, "");
        assert!(p.items.is_empty());

        let p: Probe = serde_json::from_str(r#"{"start": 0, "venue": 2021}"#).unwrap();
        assert_eq!(p.venue, "2021");
    }
}
