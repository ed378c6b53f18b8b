use crate::{
    config::Config,
    error::{AppError, Result},
    models::response::ApiErrorBody,
    utils::storage::KeyValueStore,
};
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

pub const TOKEN_KEY: &str = "token";

/// 会话事件；前端收到 `Expired` 时应跳转到登录页
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Expired,
}

/// REST API 的轻量封装：附加认证头，401 时清除令牌并广播会话失效
pub struct ApiClient {
    http: Client,
    base_url: String,
    auth_scheme: String,
    storage: Arc<dyn KeyValueStore>,
    token: RwLock<Option<String>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(config: &Config, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let parsed = Url::parse(&config.api_base_url)?;
        if parsed.cannot_be_a_base() {
            return Err(AppError::validation("API_BASE_URL must be an http(s) URL"));
        }

        let http = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let token = storage.get(TOKEN_KEY)?;
        if token.is_some() {
            debug!("Restored stored API token");
        }

        let (events, _) = broadcast::channel(16);

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_scheme: config.auth_scheme.clone(),
            storage,
            token: RwLock::new(token),
            events,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.storage.set(TOKEN_KEY, token)?;
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    pub fn clear_token(&self) -> Result<()> {
        *self.token.write() = None;
        self.storage.remove(TOKEN_KEY)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.token.read().as_deref() {
            Some(token) => builder.header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", self.auth_scheme, token),
            ),
            None => builder,
        }
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.request(Method::PATCH, path)
    }

    /// 发送请求并把响应体解析为 JSON
    pub async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.execute(builder).await?;
        Ok(response.json::<T>().await?)
    }

    /// 发送请求，忽略响应体
    pub async fn send_unit(&self, builder: RequestBuilder) -> Result<()> {
        self.execute(builder).await?;
        Ok(())
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build()?;
        debug!("{} {}", request.method(), request.url().path());

        let response = self.http.execute(request).await.map_err(|e| {
            warn!("Request to backend failed: {}", e);
            AppError::Request(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = response.text().await.unwrap_or_default();
        let body: ApiErrorBody = serde_json::from_str(&raw).unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_session();
        } else {
            warn!("Backend returned {}: {}", status, raw);
        }

        Err(AppError::from_status(status, &body))
    }

    fn invalidate_session(&self) {
        if let Err(e) = self.clear_token() {
            warn!("Failed to remove stored token: {}", e);
        }
        info!("Session expired, redirecting to login");
        // 没有订阅者时发送失败是正常情况
        let _ = self.events.send(SessionEvent::Expired);
    }
}
