use crate::{
    error::Result,
    models::user::{
        AuthResponse, ChangePasswordRequest, LoginRequest, ProfileUpdate, RegisterRequest, User,
    },
    services::api::{ApiClient, SessionEvent},
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use validator::Validate;

/// 当前会话：用户信息与派生的角色标记
///
/// 用户信息只是服务端数据的临时副本，登出或 401 时失效。
pub struct AuthSession {
    api: Arc<ApiClient>,
    user: Arc<RwLock<Option<User>>>,
    loading: RwLock<bool>,
    listener: JoinHandle<()>,
}

impl AuthSession {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let user = Arc::new(RwLock::new(None));
        let listener = Self::watch_session(api.subscribe(), user.clone());

        Self {
            api,
            user,
            loading: RwLock::new(true),
            listener,
        }
    }

    fn watch_session(
        mut events: tokio::sync::broadcast::Receiver<SessionEvent>,
        user: Arc<RwLock<Option<User>>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::Expired) | Err(RecvError::Lagged(_)) => {
                        if user.write().take().is_some() {
                            info!("Session expired, current user cleared");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.read()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }

    pub fn is_experto(&self) -> bool {
        self.user.read().as_ref().map_or(false, User::is_experto)
    }

    pub fn is_admin(&self) -> bool {
        self.user.read().as_ref().map_or(false, User::is_admin)
    }

    /// 启动时恢复会话：有令牌则拉取个人资料，失败则丢弃令牌
    pub async fn restore(&self) -> Option<User> {
        if !self.api.has_token() {
            *self.loading.write() = false;
            return None;
        }

        let result = self.api.send::<User>(self.api.get("/auth/profile/")).await;
        let restored = match result {
            Ok(user) => {
                info!("Session restored for {}", user.username);
                *self.user.write() = Some(user.clone());
                Some(user)
            }
            Err(e) => {
                warn!("Stored token rejected: {}", e);
                if let Err(e) = self.api.clear_token() {
                    warn!("Failed to remove stored token: {}", e);
                }
                None
            }
        };

        *self.loading.write() = false;
        restored
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let req = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        req.validate()?;

        let response: AuthResponse = self
            .api
            .send(self.api.post("/auth/login/").json(&req))
            .await?;

        info!("User {} logged in", response.user.username);
        self.start_session(response)
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User> {
        req.validate()?;

        let response: AuthResponse = self
            .api
            .send(self.api.post("/auth/register/").json(&req))
            .await?;

        info!("User {} registered", response.user.username);
        self.start_session(response)
    }

    fn start_session(&self, response: AuthResponse) -> Result<User> {
        self.api.set_token(&response.token)?;
        *self.user.write() = Some(response.user.clone());
        Ok(response.user)
    }

    /// 登出：后端请求失败也照常清理本地状态
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.api.send_unit(self.api.post("/auth/logout/")).await {
            debug!("Ignoring logout error: {}", e);
        }

        self.api.clear_token()?;
        *self.user.write() = None;
        info!("User logged out");
        Ok(())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let user: User = self
            .api
            .send(self.api.patch("/auth/profile/").json(update))
            .await?;

        *self.user.write() = Some(user.clone());
        Ok(user)
    }

    /// 完成引导：请求失败不阻塞用户，本地标记照常更新
    pub async fn complete_onboarding(&self) {
        if let Err(e) = self
            .api
            .send_unit(self.api.post("/auth/profile/complete_onboarding/"))
            .await
        {
            warn!("Error completing onboarding: {}", e);
        }

        if let Some(user) = self.user.write().as_mut() {
            user.onboarding_completado = true;
        }
    }

    pub async fn change_password(&self, req: &ChangePasswordRequest) -> Result<()> {
        req.validate()?;

        self.api
            .send_unit(self.api.post("/auth/change-password/").json(req))
            .await?;

        info!("Password changed");
        Ok(())
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
