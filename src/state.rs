use crate::{
    config::Config,
    error::Result,
    services::{
        ApiClient, AuthSession, BibliotecaService, ChatbotService, ChatbotWidget,
        ConsultaService, DocumentClasses, GlosarioCache, NotificationCenter,
        NotificationService, SettingsStore, SpotlightSearch, UsuarioService,
    },
    utils::storage::KeyValueStore,
};
use std::sync::Arc;

/// 门户客户端的共享状态
/// 包含配置、会话、各服务与界面组件
#[derive(Clone)]
pub struct PortalState {
    /// 应用配置
    pub config: Config,

    /// REST 客户端（附带认证令牌）
    pub api: Arc<ApiClient>,

    /// 登录会话
    pub session: Arc<AuthSession>,

    /// 用户偏好设置
    pub settings: Arc<SettingsStore>,

    /// 文档库服务
    pub biblioteca: BibliotecaService,

    /// 术语表缓存
    pub glosario: Arc<GlosarioCache>,

    /// 咨询服务
    pub consultas: ConsultaService,

    /// 收藏与阅读记录
    pub usuario: UsuarioService,

    /// 聊天服务（历史会话、常见问题）
    pub chatbot: ChatbotService,

    /// 全局搜索浮层
    pub spotlight: SpotlightSearch,

    /// 聊天窗口
    pub chat: ChatbotWidget,

    /// 通知中心
    pub notifications: NotificationCenter,
}

impl PortalState {
    /// 组装全部服务；需要在 tokio 运行时内调用
    pub fn new(config: Config, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let api = Arc::new(ApiClient::new(&config, storage.clone())?);
        let session = Arc::new(AuthSession::new(api.clone()));
        let settings = Arc::new(SettingsStore::load(storage, DocumentClasses::new()));

        let biblioteca = BibliotecaService::new(api.clone());
        let chatbot = ChatbotService::new(api.clone());

        let spotlight = SpotlightSearch::new(
            Arc::new(biblioteca.clone()),
            config.search_debounce(),
            config.search_min_length,
        );
        let chat = ChatbotWidget::new(Arc::new(chatbot.clone()));
        let notifications = NotificationCenter::new(
            Arc::new(NotificationService::new(api.clone())),
            config.notification_poll_interval(),
        );

        Ok(Self {
            glosario: Arc::new(GlosarioCache::new(biblioteca.clone())),
            consultas: ConsultaService::new(api.clone()),
            usuario: UsuarioService::new(api.clone()),
            config,
            api,
            session,
            settings,
            biblioteca,
            chatbot,
            spotlight,
            chat,
            notifications,
        })
    }
}
