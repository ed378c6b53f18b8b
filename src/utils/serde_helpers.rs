//! 后端标识符的序列化/反序列化辅助模块
use serde::{Deserialize, Deserializer, Serializer};

/// 标识符既可能是字符串（如 "welcome"），也可能是数字主键
pub mod string_or_number {
    use super::*;

    pub fn serialize<S>(id: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(id)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IdValue {
            String(String),
            Number(serde_json::Number),
        }

        match IdValue::deserialize(deserializer)? {
            IdValue::String(s) => Ok(s),
            IdValue::Number(n) => Ok(n.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::string_or_number")]
        id: String,
    }

    #[test]
    fn test_string_and_number_ids() {
        let w: Wrapper = serde_json::from_str(r#"{"id": "welcome"}"#).unwrap();
        assert_eq!(w.id, "welcome");

        let w: Wrapper = serde_json::from_str(r#"{"id": 1718000000123}"#).unwrap();
        assert_eq!(w.id, "1718000000123");

        assert_eq!(serde_json::to_string(&w).unwrap(), r#"{"id":"1718000000123"}"#);
    }
}
