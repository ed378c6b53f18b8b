use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::UserRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoConsulta {
    Pendiente,
    EnRevision,
    Respondida,
    Cerrada,
}

impl EstadoConsulta {
    pub const ALL: [EstadoConsulta; 4] = [
        EstadoConsulta::Pendiente,
        EstadoConsulta::EnRevision,
        EstadoConsulta::Respondida,
        EstadoConsulta::Cerrada,
    ];

    fn rank(self) -> u8 {
        match self {
            EstadoConsulta::Pendiente => 0,
            EstadoConsulta::EnRevision => 1,
            EstadoConsulta::Respondida => 2,
            EstadoConsulta::Cerrada => 3,
        }
    }

    /// 状态只能向前推进，不存在回退
    pub fn can_advance_to(self, next: EstadoConsulta) -> bool {
        next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EstadoConsulta::Pendiente => "pendiente",
            EstadoConsulta::EnRevision => "en_revision",
            EstadoConsulta::Respondida => "respondida",
            EstadoConsulta::Cerrada => "cerrada",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EstadoConsulta::Pendiente => "Pendiente",
            EstadoConsulta::EnRevision => "En revisión",
            EstadoConsulta::Respondida => "Respondida",
            EstadoConsulta::Cerrada => "Cerrada",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Prioridad {
    Baja,
    #[default]
    Media,
    Alta,
    Urgente,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoriaConsulta {
    #[default]
    Procedimiento,
    Normativa,
    Tecnico,
    Otro,
}

/// 服务端声明的可执行操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultaAction {
    Assign,
    Respond,
    Feedback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consulta {
    pub id: i64,
    pub asunto: String,
    pub descripcion: String,
    #[serde(default)]
    pub categoria: CategoriaConsulta,
    #[serde(default)]
    pub dependencia_relacionada: Option<i64>,
    #[serde(default)]
    pub prioridad: Prioridad,
    pub estado: EstadoConsulta,
    #[serde(default)]
    pub usuario_nombre: Option<String>,
    #[serde(default)]
    pub usuario_municipalidad: Option<String>,
    #[serde(default)]
    pub experto_asignado: Option<UserRef>,
    #[serde(default)]
    pub respuesta: Option<String>,
    #[serde(default)]
    pub fecha_respuesta: Option<DateTime<Utc>>,
    #[serde(default)]
    pub calificacion: Option<u8>,
    #[serde(default)]
    pub comentario_calificacion: Option<String>,
    #[serde(default)]
    pub leido_por_usuario: bool,
    #[serde(default)]
    pub acciones_permitidas: Option<Vec<ConsultaAction>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Consulta {
    pub fn is_assigned_to(&self, user_id: i64) -> bool {
        self.experto_asignado.as_ref().map(|e| e.id) == Some(user_id)
    }

    /// 有新回复且用户尚未查看
    pub fn has_unread_response(&self) -> bool {
        self.estado == EstadoConsulta::Respondida && !self.leido_por_usuario
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NuevaConsulta {
    #[validate(length(min = 1, message = "El asunto es obligatorio"))]
    pub asunto: String,
    #[validate(length(min = 1, message = "La descripción es obligatoria"))]
    pub descripcion: String,
    pub categoria: CategoriaConsulta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencia_relacionada: Option<i64>,
    pub prioridad: Prioridad,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Feedback {
    #[validate(range(min = 1, max = 5, message = "La calificación debe estar entre 1 y 5"))]
    pub calificacion: u8,
    #[serde(default)]
    pub comentario: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsignarRequest {
    pub experto_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderRequest {
    pub respuesta: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultaStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pendientes: u64,
    #[serde(default)]
    pub en_revision: u64,
    #[serde(default)]
    pub respondidas: u64,
    #[serde(default)]
    pub cerradas: u64,
    /// 专家面板：尚未指派的咨询
    #[serde(default)]
    pub sin_asignar: u64,
    /// 专家面板：指派给当前专家的咨询
    #[serde(default)]
    pub mis_asignadas: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsultaFilter {
    #[default]
    Todas,
    Estado(EstadoConsulta),
}

impl ConsultaFilter {
    pub fn matches(&self, consulta: &Consulta) -> bool {
        match self {
            ConsultaFilter::Todas => true,
            ConsultaFilter::Estado(estado) => consulta.estado == *estado,
        }
    }

    /// 作为 `?estado=` 查询参数；`Todas` 发送空字符串
    pub fn query_value(&self) -> &'static str {
        match self {
            ConsultaFilter::Todas => "",
            ConsultaFilter::Estado(estado) => estado.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lifecycle_is_forward_only() {
        use EstadoConsulta::*;

        assert!(Pendiente.can_advance_to(EnRevision));
        assert!(Pendiente.can_advance_to(Respondida));
        assert!(Respondida.can_advance_to(Cerrada));
        assert!(!Cerrada.can_advance_to(Respondida));
        assert!(!Respondida.can_advance_to(Pendiente));
        assert!(!EnRevision.can_advance_to(EnRevision));
    }

    #[test]
    fn test_consulta_deserializes_backend_payload() {
        let consulta: Consulta = serde_json::from_value(json!({
            "id": 12,
            "asunto": "Fondo rotativo",
            "descripcion": "¿Cómo se liquida?",
            "categoria": "normativa",
            "prioridad": "urgente",
            "estado": "en_revision",
            "experto_asignado": {
                "id": 3,
                "username": "experto1",
                "first_name": "Luis",
                "last_name": "Pérez"
            },
            "calificacion": null
        }))
        .unwrap();

        let experto = consulta.experto_asignado.as_ref().unwrap();
        assert_eq!(experto.display_name(), "Luis Pérez");

        assert_eq!(consulta.estado, EstadoConsulta::EnRevision);
        assert_eq!(consulta.prioridad, Prioridad::Urgente);
        assert!(consulta.is_assigned_to(3));
        assert!(!consulta.is_assigned_to(4));
        assert!(consulta.acciones_permitidas.is_none());
    }

    #[test]
    fn test_stats_keep_expert_panel_counters() {
        let stats: ConsultaStats = serde_json::from_value(json!({
            "total": 10,
            "pendientes": 4,
            "sin_asignar": 3,
            "mis_asignadas": 2
        }))
        .unwrap();

        assert_eq!(stats.sin_asignar, 3);
        assert_eq!(stats.mis_asignadas, 2);
        assert_eq!(stats.cerradas, 0);
    }

    #[test]
    fn test_empty_descripcion_fails_validation() {
        let nueva = NuevaConsulta {
            asunto: "Licencia".to_string(),
            descripcion: String::new(),
            ..Default::default()
        };

        let errors = nueva.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("descripcion"));
    }

    #[test]
    fn test_missing_dependencia_is_omitted_from_body() {
        let nueva = NuevaConsulta {
            asunto: "a".to_string(),
            descripcion: "b".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&nueva).unwrap();

        assert!(value.get("dependencia_relacionada").is_none());
        assert_eq!(value["categoria"], "procedimiento");
        assert_eq!(value["prioridad"], "media");
    }

    #[test]
    fn test_filter_matches() {
        let consulta: Consulta = serde_json::from_value(json!({
            "id": 1, "asunto": "a", "descripcion": "b", "estado": "respondida"
        }))
        .unwrap();

        assert!(ConsultaFilter::Todas.matches(&consulta));
        assert!(ConsultaFilter::Estado(EstadoConsulta::Respondida).matches(&consulta));
        assert!(!ConsultaFilter::Estado(EstadoConsulta::Cerrada).matches(&consulta));
        assert!(consulta.has_unread_response());
    }
}
