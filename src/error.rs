use reqwest::StatusCode;
use thiserror::Error;

use crate::models::response::ApiErrorBody;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Validation error: {0}")]
    ValidatorError(#[from] validator::ValidationErrors),
}

impl AppError {
    /// 根据后端返回的状态码和错误体构造错误
    pub fn from_status(status: StatusCode, body: &ApiErrorBody) -> Self {
        let message = body
            .message()
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

        match status {
            StatusCode::UNAUTHORIZED => AppError::Authentication(message),
            StatusCode::FORBIDDEN => AppError::Authorization(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            s if s.is_server_error() => {
                tracing::error!("Backend returned {}: {}", s, message);
                AppError::ExternalService(message)
            }
            _ => AppError::BadRequest(message),
        }
    }

    /// 401：会话失效，前端需要跳转到登录页
    pub fn is_session_expired(&self) -> bool {
        matches!(self, AppError::Authentication(_))
    }

    /// 展示给用户的提示文本（toast / 行内消息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Authentication(_) => {
                "Tu sesión ha expirado. Inicia sesión nuevamente.".to_string()
            }
            AppError::Authorization(_) => "No tienes permiso para realizar esta acción.".to_string(),
            AppError::Validation(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(_) => "El recurso solicitado no existe.".to_string(),
            AppError::ValidatorError(e) => e
                .field_errors()
                .iter()
                .flat_map(|(_, errors)| errors.iter())
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "Revisa los campos del formulario.".to_string()),
            AppError::Request(_) | AppError::ExternalService(_) => {
                "No se pudo conectar con el servidor. Intenta de nuevo.".to_string()
            }
            _ => "Ocurrió un error inesperado.".to_string(),
        }
    }
}

// 便利函数，用于创建常见错误
impl AppError {
    pub fn validation(msg: &str) -> Self {
        Self::Validation(msg.to_string())
    }

    pub fn storage(msg: impl std::fmt::Display) -> Self {
        Self::Storage(msg.to_string())
    }
}
