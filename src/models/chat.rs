use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::serde_helpers::string_or_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(with = "string_or_number")]
    pub id: String,
    #[serde(rename = "rol")]
    pub role: ChatRole,
    #[serde(rename = "contenido")]
    pub content: String,
    #[serde(default)]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::User,
            content: content.into(),
            error: false,
            metadata: None,
        }
    }

    pub fn assistant(content: impl Into<String>, metadata: Option<serde_json::Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::Assistant,
            content: content.into(),
            error: false,
            metadata,
        }
    }

    /// 仅在本地注入，从不发送到后端
    pub fn local(id: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            role: ChatRole::Assistant,
            content: content.to_string(),
            error: false,
            metadata: None,
        }
    }

    pub fn failure(content: &str) -> Self {
        Self {
            error: true,
            ..Self::assistant(content, None)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub mensaje: String,
    pub articulo_contexto_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConversationRequest {
    pub articulo_contexto_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub respuesta: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub sugerencias: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Suggestions {
    #[serde(default)]
    pub sugerencias: Vec<String>,
}

/// 历史会话（`historial/` 与 `conversacion_actual/`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub mensajes: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequentQuestion {
    pub pregunta: String,
    #[serde(default)]
    pub categoria: Option<String>,
}
