//! SISFOM 市政门户的无界面客户端
//!
//! 封装门户后端的 REST 接口，并提供与前端组件对应的状态对象：
//! 全局搜索、聊天窗口、通知轮询、咨询操作判定与偏好设置。

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::PortalState;
