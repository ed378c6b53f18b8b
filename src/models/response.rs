use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 列表响应：后端可能返回裸数组，也可能返回分页对象
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Plain(Vec<T>),
    Paginated {
        results: Vec<T>,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
    },
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Plain(items) => items,
            ListEnvelope::Paginated { results, .. } => results,
        }
    }
}

/// 错误响应格式
///
/// Django REST Framework 的错误体有多种形态：`{"detail": ...}`、
/// `{"error": ...}`、`{"non_field_errors": [...]}` 或字段错误字典。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub non_field_errors: Vec<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl ApiErrorBody {
    pub fn message(&self) -> Option<String> {
        if let Some(detail) = &self.detail {
            return Some(detail.clone());
        }
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        if let Some(first) = self.non_field_errors.first() {
            return Some(first.clone());
        }

        self.fields.iter().find_map(|(field, value)| {
            let text = match value {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Array(items) => {
                    items.first().and_then(|v| v.as_str()).map(str::to_string)
                }
                _ => None,
            }?;
            Some(format!("{}: {}", field, text))
        })
    }
}
