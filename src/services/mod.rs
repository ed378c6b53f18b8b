pub mod api;
pub mod auth;
pub mod biblioteca;
pub mod chatbot;
pub mod consulta;
pub mod glosario;
pub mod notification;
pub mod search;
pub mod settings;
pub mod usuario;

// 重新导出常用类型
pub use api::{ApiClient, SessionEvent};
pub use auth::AuthSession;
pub use biblioteca::BibliotecaService;
pub use chatbot::{ChatBackend, ChatbotService, ChatbotWidget};
pub use consulta::{ConsultaActions, ConsultaService, FeedbackPanel};
pub use glosario::GlosarioCache;
pub use notification::{NotificationCenter, NotificationService, NotificationSource, PollerHandle};
pub use search::{SearchSource, SpotlightSearch};
pub use settings::{DocumentClasses, SettingsStore};
pub use usuario::UsuarioService;
