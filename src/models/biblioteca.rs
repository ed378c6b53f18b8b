use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seccion {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub orden: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependencia {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub nombre_corto: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
}

impl Dependencia {
    /// 下拉框中的展示文本："DAFIM - Dirección ..."
    pub fn option_label(&self) -> String {
        match &self.nombre_corto {
            Some(corto) if !corto.is_empty() => format!("{} - {}", corto, self.nombre),
            _ => self.nombre.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticuloResumen {
    pub id: i64,
    pub titulo: String,
    pub slug: String,
    #[serde(default)]
    pub resumen: Option<String>,
    #[serde(default)]
    pub seccion: Option<i64>,
    #[serde(default)]
    pub dependencia: Option<i64>,
    #[serde(default)]
    pub destacado: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Articulo {
    pub id: i64,
    pub titulo: String,
    pub slug: String,
    #[serde(default)]
    pub resumen: Option<String>,
    #[serde(default)]
    pub contenido: String,
    #[serde(default)]
    pub seccion: Option<i64>,
    #[serde(default)]
    pub dependencia: Option<i64>,
    #[serde(default)]
    pub es_favorito: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 文章列表过滤参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticuloQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seccion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencia: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminoGlosario {
    pub id: i64,
    pub siglas: String,
    #[serde(default)]
    pub termino: String,
    #[serde(default)]
    pub definicion: String,
}

impl TerminoGlosario {
    pub fn initial(&self) -> Option<char> {
        self.siglas.chars().next().map(|c| c.to_uppercase().next().unwrap_or(c))
    }

    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.siglas.to_lowercase().contains(&q)
            || self.termino.to_lowercase().contains(&q)
            || self.definicion.to_lowercase().contains(&q)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriaDocumento {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Documento {
    pub id: i64,
    pub titulo: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub categoria: Option<i64>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub archivo_url: Option<String>,
    #[serde(default)]
    pub tamano: Option<u64>,
    #[serde(default)]
    pub descargas: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentoQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categoria: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buscar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescargaDocumento {
    pub url: String,
}
