use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub titulo: String,
    pub mensaje: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub leida: bool,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// `GET /consultas/notificaciones/no_leidas/` 的响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnreadNotifications {
    #[serde(default)]
    pub notificaciones: Vec<Notification>,
    #[serde(default)]
    pub count: u32,
}

/// 对外暴露的通知视图（服务端快照叠加本地已读）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationView {
    pub items: Vec<Notification>,
    pub unread_count: u32,
}
