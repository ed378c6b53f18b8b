use crate::{
    error::Result,
    models::{
        biblioteca::{
            Articulo, ArticuloQuery, ArticuloResumen, CategoriaDocumento, DescargaDocumento,
            Dependencia, Documento, DocumentoQuery, Seccion, TerminoGlosario,
        },
        response::ListEnvelope,
        search::SearchResult,
    },
    services::{api::ApiClient, search::SearchSource},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// 文档库：栏目、部门、文章、术语表与可下载文档
#[derive(Clone)]
pub struct BibliotecaService {
    api: Arc<ApiClient>,
}

impl BibliotecaService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    async fn list<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let envelope: ListEnvelope<T> = self.api.send(self.api.get(path)).await?;
        Ok(envelope.into_vec())
    }

    pub async fn secciones(&self) -> Result<Vec<Seccion>> {
        self.list("/biblioteca/secciones/").await
    }

    pub async fn dependencias(&self) -> Result<Vec<Dependencia>> {
        self.list("/biblioteca/dependencias/").await
    }

    pub async fn articulos(&self, query: &ArticuloQuery) -> Result<Vec<ArticuloResumen>> {
        let envelope: ListEnvelope<ArticuloResumen> = self
            .api
            .send(self.api.get("/biblioteca/articulos/").query(query))
            .await?;
        Ok(envelope.into_vec())
    }

    pub async fn articulo(&self, slug: &str) -> Result<Articulo> {
        self.api
            .send(self.api.get(&format!("/biblioteca/articulos/{}/", slug)))
            .await
    }

    pub async fn destacados(&self) -> Result<Vec<ArticuloResumen>> {
        self.list("/biblioteca/articulos/destacados/").await
    }

    pub async fn relacionados(&self, slug: &str) -> Result<Vec<ArticuloResumen>> {
        self.list(&format!("/biblioteca/articulos/{}/relacionados/", slug))
            .await
    }

    pub async fn buscar(&self, q: &str) -> Result<Vec<SearchResult>> {
        debug!("Searching library for {:?}", q);
        let envelope: ListEnvelope<SearchResult> = self
            .api
            .send(self.api.get("/biblioteca/buscar/").query(&[("q", q)]))
            .await?;
        Ok(envelope.into_vec())
    }

    pub async fn glosario(&self) -> Result<Vec<TerminoGlosario>> {
        self.list("/biblioteca/glosario/").await
    }

    pub async fn termino(&self, sigla: &str) -> Result<TerminoGlosario> {
        self.api
            .send(
                self.api
                    .get("/biblioteca/glosario/por_sigla/")
                    .query(&[("sigla", sigla)]),
            )
            .await
    }

    pub async fn categorias_documentos(&self) -> Result<Vec<CategoriaDocumento>> {
        self.list("/biblioteca/categorias-documentos/").await
    }

    pub async fn documentos(&self, query: &DocumentoQuery) -> Result<Vec<Documento>> {
        let envelope: ListEnvelope<Documento> = self
            .api
            .send(self.api.get("/biblioteca/documentos/").query(query))
            .await?;
        Ok(envelope.into_vec())
    }

    pub async fn documento(&self, id: i64) -> Result<Documento> {
        self.api
            .send(self.api.get(&format!("/biblioteca/documentos/{}/", id)))
            .await
    }

    /// 登记下载并返回下载地址；失败时退回文档自带的直接链接
    pub async fn descargar_documento(&self, documento: &Documento) -> Result<String> {
        let result: Result<DescargaDocumento> = self
            .api
            .send(
                self.api
                    .post(&format!("/biblioteca/documentos/{}/descargar/", documento.id)),
            )
            .await;

        match (result, &documento.archivo_url) {
            (Ok(descarga), _) => Ok(descarga.url),
            (Err(e), Some(url)) => {
                debug!("Download registration failed, using direct URL: {}", e);
                Ok(url.clone())
            }
            (Err(e), None) => Err(e),
        }
    }

    pub async fn documentos_destacados(&self) -> Result<Vec<Documento>> {
        self.list("/biblioteca/documentos/destacados/").await
    }

    pub async fn documentos_recientes(&self) -> Result<Vec<Documento>> {
        self.list("/biblioteca/documentos/recientes/").await
    }
}

#[async_trait]
impl SearchSource for BibliotecaService {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.buscar(query).await
    }
}
