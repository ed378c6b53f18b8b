use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::biblioteca::ArticuloResumen;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorito {
    pub id: i64,
    pub articulo: ArticuloResumen,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LecturaHistorial {
    pub id: i64,
    pub articulo: ArticuloResumen,
    #[serde(default)]
    pub progreso: u8,
    #[serde(default)]
    pub ultima_lectura: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleFavoritoRequest {
    pub articulo_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleFavoritoResponse {
    #[serde(default)]
    pub es_favorito: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrarLecturaRequest {
    pub articulo_id: i64,
    pub progreso: u8,
}
