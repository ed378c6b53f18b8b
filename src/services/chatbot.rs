use crate::{
    error::Result,
    models::{
        chat::{
            ChatMessage, ChatReply, Conversation, FrequentQuestion, NewConversationRequest,
            SendMessageRequest, Suggestions,
        },
        response::ListEnvelope,
    },
    services::api::ApiClient,
    utils::route::article_slug_from_path,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const WELCOME_ID: &str = "welcome";
pub const WELCOME_NEW_ID: &str = "welcome-new";

pub const WELCOME_MESSAGE: &str = "¡Hola! 👋 Soy el asistente virtual de SISFOM. Puedo ayudarte con:\n\n\
• Información sobre procedimientos administrativos\n\
• Explicar términos y conceptos\n\
• Orientarte sobre normativa municipal\n\n\
¿En qué puedo ayudarte hoy?";

pub const NEW_CONVERSATION_MESSAGE: &str = "¡Nueva conversación iniciada! ¿En qué puedo ayudarte?";

pub const SEND_FAILURE_MESSAGE: &str =
    "Lo siento, hubo un error al procesar tu mensaje. Por favor intenta de nuevo.";

/// 聊天助手后端
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, mensaje: &str, articulo_id: Option<i64>) -> Result<ChatReply>;
    async fn new_conversation(&self, articulo_id: Option<i64>) -> Result<()>;
    async fn suggestions(&self, articulo_id: Option<i64>) -> Result<Vec<String>>;
}

#[derive(Clone)]
pub struct ChatbotService {
    api: Arc<ApiClient>,
}

impl ChatbotService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn historial(&self) -> Result<Vec<Conversation>> {
        let envelope: ListEnvelope<Conversation> =
            self.api.send(self.api.get("/chatbot/historial/")).await?;
        Ok(envelope.into_vec())
    }

    pub async fn conversacion_actual(&self) -> Result<Conversation> {
        self.api
            .send(self.api.get("/chatbot/conversacion_actual/"))
            .await
    }

    pub async fn preguntas_frecuentes(&self) -> Result<Vec<FrequentQuestion>> {
        let envelope: ListEnvelope<FrequentQuestion> = self
            .api
            .send(self.api.get("/chatbot/preguntas_frecuentes/"))
            .await?;
        Ok(envelope.into_vec())
    }
}

#[async_trait]
impl ChatBackend for ChatbotService {
    async fn send(&self, mensaje: &str, articulo_id: Option<i64>) -> Result<ChatReply> {
        let req = SendMessageRequest {
            mensaje: mensaje.to_string(),
            articulo_contexto_id: articulo_id,
        };
        self.api
            .send(self.api.post("/chatbot/enviar/").json(&req))
            .await
    }

    async fn new_conversation(&self, articulo_id: Option<i64>) -> Result<()> {
        let req = NewConversationRequest {
            articulo_contexto_id: articulo_id,
        };
        self.api
            .send_unit(self.api.post("/chatbot/nueva_conversacion/").json(&req))
            .await
    }

    async fn suggestions(&self, articulo_id: Option<i64>) -> Result<Vec<String>> {
        let mut builder = self.api.get("/chatbot/sugerencias/");
        if let Some(id) = articulo_id {
            builder = builder.query(&[("articulo_id", id)]);
        }
        let suggestions: Suggestions = self.api.send(builder).await?;
        Ok(suggestions.sugerencias)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatStatus {
    #[default]
    Idle,
    Sending,
}

/// 当前路由对应的文章；id 在文章加载后才可知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContext {
    pub slug: String,
    pub articulo_id: Option<i64>,
}

#[derive(Default)]
struct ChatState {
    open: bool,
    messages: Vec<ChatMessage>,
    input: String,
    status: ChatStatus,
    suggestions: Vec<String>,
    context: Option<ArticleContext>,
}

impl ChatState {
    fn articulo_id(&self) -> Option<i64> {
        self.context.as_ref().and_then(|c| c.articulo_id)
    }
}

/// 浮动聊天窗口
///
/// 消息只存在于窗口实例内，不做持久化。同一时间最多一个请求在途。
#[derive(Clone)]
pub struct ChatbotWidget {
    backend: Arc<dyn ChatBackend>,
    state: Arc<Mutex<ChatState>>,
}

impl ChatbotWidget {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(ChatState::default())),
        }
    }

    pub async fn open(&self) {
        {
            let mut state = self.state.lock();
            state.open = true;
            if state.messages.is_empty() {
                state
                    .messages
                    .push(ChatMessage::local(WELCOME_ID, WELCOME_MESSAGE));
            }
        }
        self.refresh_suggestions().await;
    }

    pub fn close(&self) {
        self.state.lock().open = false;
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().messages.clone()
    }

    pub fn input(&self) -> String {
        self.state.lock().input.clone()
    }

    pub fn status(&self) -> ChatStatus {
        self.state.lock().status
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.state.lock().suggestions.clone()
    }

    pub fn context(&self) -> Option<ArticleContext> {
        self.state.lock().context.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.state.lock().input = text.into();
    }

    /// 建议只填入输入框，不自动发送
    pub fn use_suggestion(&self, suggestion: &str) {
        self.set_input(suggestion);
    }

    /// 发送输入框中的内容
    ///
    /// 输入为空或已有请求在途时返回 `false`。用户消息立即追加；
    /// 失败时追加一条带错误标记的助手消息。
    pub async fn submit(&self) -> bool {
        let (content, articulo_id) = {
            let mut state = self.state.lock();
            let content = state.input.trim().to_string();
            if content.is_empty() || state.status == ChatStatus::Sending {
                return false;
            }

            state.messages.push(ChatMessage::user(content.clone()));
            state.input.clear();
            state.status = ChatStatus::Sending;
            (content, state.articulo_id())
        };

        let outcome = self.backend.send(&content, articulo_id).await;

        let mut state = self.state.lock();
        match outcome {
            Ok(reply) => {
                state
                    .messages
                    .push(ChatMessage::assistant(reply.respuesta, reply.metadata));
                if let Some(suggestions) = reply.sugerencias {
                    state.suggestions = suggestions;
                }
            }
            Err(e) => {
                error!("Chatbot request failed: {}", e);
                state.messages.push(ChatMessage::failure(SEND_FAILURE_MESSAGE));
            }
        }
        state.status = ChatStatus::Idle;
        true
    }

    /// 本地立即重置；后端会话的重建失败只记录日志
    pub async fn new_conversation(&self) {
        let articulo_id = {
            let mut state = self.state.lock();
            state.messages = vec![ChatMessage::local(WELCOME_NEW_ID, NEW_CONVERSATION_MESSAGE)];
            state.articulo_id()
        };

        if let Err(e) = self.backend.new_conversation(articulo_id).await {
            warn!("Error starting new conversation: {}", e);
        }
    }

    /// 路由变化时更新文章上下文；窗口打开且上下文改变时刷新建议
    pub async fn set_route(&self, path: &str) {
        let context = article_slug_from_path(path).map(|slug| ArticleContext {
            slug,
            articulo_id: None,
        });
        self.replace_context(context).await;
    }

    /// 绑定当前文章的 id（文章详情加载完成后调用）
    pub async fn bind_article(&self, articulo_id: i64) {
        let context = self.context().map(|c| ArticleContext {
            articulo_id: Some(articulo_id),
            ..c
        });
        if context.is_some() {
            self.replace_context(context).await;
        }
    }

    async fn replace_context(&self, context: Option<ArticleContext>) {
        let refresh = {
            let mut state = self.state.lock();
            if state.context == context {
                return;
            }
            debug!("Chatbot article context changed: {:?}", context);
            state.context = context;
            state.open
        };

        if refresh {
            self.refresh_suggestions().await;
        }
    }

    async fn refresh_suggestions(&self) {
        let articulo_id = self.state.lock().articulo_id();
        match self.backend.suggestions(articulo_id).await {
            Ok(suggestions) => self.state.lock().suggestions = suggestions,
            Err(e) => warn!("Error fetching suggestions: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::chat::ChatRole;

    fn backend_with_suggestions() -> MockChatBackend {
        let mut backend = MockChatBackend::new();
        backend
            .expect_suggestions()
            .returning(|_| Ok(vec!["¿Qué es el DAFIM?".to_string()]));
        backend
    }

    #[tokio::test]
    async fn test_open_seeds_welcome_once() {
        let widget = ChatbotWidget::new(Arc::new(backend_with_suggestions()));

        widget.open().await;
        widget.close();
        widget.open().await;

        let messages = widget.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, WELCOME_ID);
        assert_eq!(widget.suggestions(), vec!["¿Qué es el DAFIM?".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_send_appends_single_error_turn() {
        let mut backend = backend_with_suggestions();
        backend
            .expect_send()
            .times(1)
            .returning(|_, _| Err(AppError::ExternalService("down".to_string())));
        let widget = ChatbotWidget::new(Arc::new(backend));
        widget.open().await;

        widget.set_input("  ¿Cómo solicito el fondo rotativo?  ");
        assert!(widget.submit().await);

        let messages = widget.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, "¿Cómo solicito el fondo rotativo?");
        assert!(!messages[1].error);
        assert!(messages[2].error);
        assert_eq!(messages[2].content, SEND_FAILURE_MESSAGE);
        assert_eq!(widget.input(), "");
        assert_eq!(widget.status(), ChatStatus::Idle);
    }

    #[tokio::test]
    async fn test_reply_replaces_suggestions() {
        let mut backend = backend_with_suggestions();
        backend.expect_send().times(1).returning(|_, _| {
            Ok(ChatReply {
                respuesta: "El DAFIM es la dirección de finanzas.".to_string(),
                metadata: None,
                sugerencias: Some(vec!["Ver organigrama".to_string()]),
            })
        });
        let widget = ChatbotWidget::new(Arc::new(backend));
        widget.open().await;

        widget.set_input("DAFIM");
        widget.submit().await;

        let last = widget.messages().pop().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert!(!last.error);
        assert_eq!(widget.suggestions(), vec!["Ver organigrama".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_input_is_not_sent() {
        let mut backend = MockChatBackend::new();
        backend.expect_send().times(0);
        let widget = ChatbotWidget::new(Arc::new(backend));

        widget.set_input("   ");
        assert!(!widget.submit().await);
        assert!(widget.messages().is_empty());
    }

    #[tokio::test]
    async fn test_new_conversation_resets_even_if_backend_fails() {
        let mut backend = backend_with_suggestions();
        backend
            .expect_new_conversation()
            .times(1)
            .returning(|_| Err(AppError::ExternalService("down".to_string())));
        let widget = ChatbotWidget::new(Arc::new(backend));
        widget.open().await;

        widget.new_conversation().await;

        let messages = widget.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, WELCOME_NEW_ID);
        assert_eq!(messages[0].content, NEW_CONVERSATION_MESSAGE);
    }

    #[tokio::test]
    async fn test_use_suggestion_only_fills_input() {
        let mut backend = MockChatBackend::new();
        backend.expect_send().times(0);
        let widget = ChatbotWidget::new(Arc::new(backend));

        widget.use_suggestion("¿Qué es la licencia de construcción?");

        assert_eq!(widget.input(), "¿Qué es la licencia de construcción?");
        assert!(widget.messages().is_empty());
    }

    #[tokio::test]
    async fn test_route_context_and_article_binding() {
        let mut backend = MockChatBackend::new();
        backend.expect_suggestions().times(3).returning(|_| Ok(vec![]));
        backend
            .expect_send()
            .withf(|_, articulo_id| *articulo_id == Some(42))
            .times(1)
            .returning(|_, _| {
                Ok(ChatReply {
                    respuesta: "ok".to_string(),
                    metadata: None,
                    sugerencias: None,
                })
            });
        let widget = ChatbotWidget::new(Arc::new(backend));
        widget.open().await;

        widget.set_route("/biblioteca/fondo-rotativo").await;
        widget.set_route("/biblioteca/fondo-rotativo").await;
        assert_eq!(
            widget.context(),
            Some(ArticleContext {
                slug: "fondo-rotativo".to_string(),
                articulo_id: None
            })
        );

        widget.bind_article(42).await;
        widget.set_input("resumen");
        widget.submit().await;

        widget.close();
        widget.set_route("/biblioteca/dependencia/dafim").await;
        assert_eq!(widget.context(), None);
    }
}
