use crate::{
    error::Result,
    models::{
        response::ListEnvelope,
        usuario::{
            Favorito, LecturaHistorial, RegistrarLecturaRequest, ToggleFavoritoRequest,
            ToggleFavoritoResponse,
        },
    },
    services::api::ApiClient,
};
use std::sync::Arc;
use tracing::debug;

/// 个人收藏与阅读记录
#[derive(Clone)]
pub struct UsuarioService {
    api: Arc<ApiClient>,
}

impl UsuarioService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn favoritos(&self) -> Result<Vec<Favorito>> {
        let envelope: ListEnvelope<Favorito> =
            self.api.send(self.api.get("/auth/favoritos/")).await?;
        Ok(envelope.into_vec())
    }

    /// 切换收藏状态，返回服务端给出的新状态
    pub async fn toggle_favorito(&self, articulo_id: i64) -> Result<Option<bool>> {
        let response: ToggleFavoritoResponse = self
            .api
            .send(
                self.api
                    .post("/auth/favoritos/toggle/")
                    .json(&ToggleFavoritoRequest { articulo_id }),
            )
            .await?;
        Ok(response.es_favorito)
    }

    pub async fn historial(&self) -> Result<Vec<LecturaHistorial>> {
        let envelope: ListEnvelope<LecturaHistorial> =
            self.api.send(self.api.get("/auth/historial/")).await?;
        Ok(envelope.into_vec())
    }

    pub async fn registrar_lectura(&self, articulo_id: i64, progreso: i64) -> Result<()> {
        let req = RegistrarLecturaRequest {
            articulo_id,
            progreso: clamp_progress(progreso),
        };
        debug!("Reading progress {}% for article {}", req.progreso, articulo_id);

        self.api
            .send_unit(self.api.post("/auth/historial/registrar/").json(&req))
            .await
    }
}

fn clamp_progress(progreso: i64) -> u8 {
    progreso.clamp(0, 100) as u8
}
