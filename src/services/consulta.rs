use crate::{
    error::Result,
    models::{
        consulta::{
            AsignarRequest, Consulta, ConsultaAction, ConsultaFilter, ConsultaStats,
            EstadoConsulta, Feedback, NuevaConsulta, ResponderRequest,
        },
        response::ListEnvelope,
        user::User,
    },
    services::api::ApiClient,
    utils::validation::require_text,
};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

const BASE: &str = "/consultas/consultas/";

/// 咨询工单服务
#[derive(Clone)]
pub struct ConsultaService {
    api: Arc<ApiClient>,
}

impl ConsultaService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    async fn list(&self, path: &str) -> Result<Vec<Consulta>> {
        let envelope: ListEnvelope<Consulta> = self.api.send(self.api.get(path)).await?;
        Ok(envelope.into_vec())
    }

    /// 按状态列出；服务端忽略过滤参数时也在本地再过滤一次
    pub async fn listar(&self, filter: ConsultaFilter) -> Result<Vec<Consulta>> {
        let mut builder = self.api.get(BASE);
        if filter != ConsultaFilter::Todas {
            builder = builder.query(&[("estado", filter.query_value())]);
        }

        let envelope: ListEnvelope<Consulta> = self.api.send(builder).await?;
        Ok(envelope
            .into_vec()
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect())
    }

    pub async fn obtener(&self, id: i64) -> Result<Consulta> {
        self.api
            .send(self.api.get(&format!("{}{}/", BASE, id)))
            .await
    }

    /// 创建咨询；必填项为空时不发送请求
    pub async fn crear(&self, nueva: &NuevaConsulta) -> Result<Consulta> {
        nueva.validate()?;
        require_text(&nueva.asunto, "El asunto es obligatorio")?;
        require_text(&nueva.descripcion, "La descripción es obligatoria")?;

        let consulta: Consulta = self.api.send(self.api.post(BASE).json(nueva)).await?;
        info!("Consulta {} created", consulta.id);
        Ok(consulta)
    }

    pub async fn mis_consultas(&self) -> Result<Vec<Consulta>> {
        self.list(&format!("{}mis_consultas/", BASE)).await
    }

    pub async fn pendientes(&self) -> Result<Vec<Consulta>> {
        self.list(&format!("{}pendientes/", BASE)).await
    }

    pub async fn asignar(&self, id: i64, experto_id: i64) -> Result<()> {
        self.api
            .send_unit(
                self.api
                    .post(&format!("{}{}/asignar/", BASE, id))
                    .json(&AsignarRequest { experto_id }),
            )
            .await?;

        info!("Consulta {} assigned to expert {}", id, experto_id);
        Ok(())
    }

    pub async fn responder(&self, id: i64, respuesta: &str) -> Result<()> {
        require_text(respuesta, "La respuesta no puede estar vacía")?;

        let req = ResponderRequest {
            respuesta: respuesta.trim().to_string(),
        };
        self.api
            .send_unit(self.api.post(&format!("{}{}/responder/", BASE, id)).json(&req))
            .await?;

        info!("Consulta {} answered", id);
        Ok(())
    }

    pub async fn feedback(&self, id: i64, feedback: &Feedback) -> Result<()> {
        feedback.validate()?;

        self.api
            .send_unit(
                self.api
                    .post(&format!("{}{}/feedback/", BASE, id))
                    .json(feedback),
            )
            .await
    }

    pub async fn estadisticas(&self) -> Result<ConsultaStats> {
        self.api
            .send(self.api.get(&format!("{}estadisticas/", BASE)))
            .await
    }

    /// 仪表盘用：失败时返回全零统计
    pub async fn estadisticas_or_default(&self) -> ConsultaStats {
        self.estadisticas().await.unwrap_or_else(|e| {
            warn!("Error fetching consulta stats: {}", e);
            ConsultaStats::default()
        })
    }
}

/// 评价提交成功后更新本地副本；只允许向前的状态转换
pub fn apply_feedback(consulta: &mut Consulta, feedback: &Feedback) -> bool {
    if !consulta.estado.can_advance_to(EstadoConsulta::Cerrada) {
        return false;
    }

    consulta.estado = EstadoConsulta::Cerrada;
    consulta.calificacion = Some(feedback.calificacion);
    if !feedback.comentario.trim().is_empty() {
        consulta.comentario_calificacion = Some(feedback.comentario.clone());
    }
    true
}

/// 当前查看者对某条咨询可执行的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsultaActions {
    pub assign: bool,
    pub respond: bool,
    pub feedback: bool,
}

impl ConsultaActions {
    pub fn for_viewer(consulta: &Consulta, viewer: Option<&User>) -> Self {
        if let Some(declared) = &consulta.acciones_permitidas {
            return Self {
                assign: declared.contains(&ConsultaAction::Assign),
                respond: declared.contains(&ConsultaAction::Respond),
                feedback: declared.contains(&ConsultaAction::Feedback),
            };
        }

        let is_experto = viewer.map_or(false, User::is_experto);
        let assigned_to_viewer = viewer.map_or(false, |u| consulta.is_assigned_to(u.id));

        Self {
            assign: is_experto
                && consulta.estado == EstadoConsulta::Pendiente
                && consulta.experto_asignado.is_none(),
            respond: matches!(
                consulta.estado,
                EstadoConsulta::Pendiente | EstadoConsulta::EnRevision
            ) && assigned_to_viewer,
            feedback: consulta.estado == EstadoConsulta::Respondida
                && consulta.calificacion.is_none(),
        }
    }

    pub fn allows(&self, action: ConsultaAction) -> bool {
        match action {
            ConsultaAction::Assign => self.assign,
            ConsultaAction::Respond => self.respond,
            ConsultaAction::Feedback => self.feedback,
        }
    }
}

/// 详情页的评价区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackPanel {
    RatingForm,
    AlreadyRated { calificacion: u8 },
    Hidden,
}

impl FeedbackPanel {
    pub fn for_consulta(consulta: &Consulta, viewer: Option<&User>) -> Self {
        if let Some(calificacion) = consulta.calificacion {
            return FeedbackPanel::AlreadyRated { calificacion };
        }

        if ConsultaActions::for_viewer(consulta, viewer).feedback {
            FeedbackPanel::RatingForm
        } else {
            FeedbackPanel::Hidden
        }
    }
}
