use crate::{
    error::{AppError, Result},
    models::biblioteca::TerminoGlosario,
    services::biblioteca::BibliotecaService,
};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// 术语表缓存：预加载一次，按缩写查询时先查缓存再回退到接口
pub struct GlosarioCache {
    biblioteca: BibliotecaService,
    terms: RwLock<Option<Arc<Vec<TerminoGlosario>>>>,
}

impl GlosarioCache {
    pub fn new(biblioteca: BibliotecaService) -> Self {
        Self {
            biblioteca,
            terms: RwLock::new(None),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.terms.read().is_some()
    }

    /// 加载全部术语；已加载时直接返回
    pub async fn preload(&self) -> Result<usize> {
        if let Some(terms) = self.terms.read().as_ref() {
            return Ok(terms.len());
        }

        let terms = self.biblioteca.glosario().await?;
        let count = terms.len();
        *self.terms.write() = Some(Arc::new(terms));
        info!("Glossary loaded with {} terms", count);
        Ok(count)
    }

    fn cached(&self) -> Arc<Vec<TerminoGlosario>> {
        self.terms.read().clone().unwrap_or_default()
    }

    /// 按缩写查找（不区分大小写）
    pub async fn lookup(&self, sigla: &str) -> Result<Option<TerminoGlosario>> {
        let wanted = sigla.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(None);
        }

        if let Some(term) = self
            .cached()
            .iter()
            .find(|t| t.siglas.to_lowercase() == wanted)
        {
            return Ok(Some(term.clone()));
        }

        debug!("Glossary cache miss for {:?}", sigla);
        match self.biblioteca.termino(sigla.trim()).await {
            Ok(term) => Ok(Some(term)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 术语表页面的过滤：关键字与首字母可组合
    pub fn filter(&self, query: &str, letter: Option<char>) -> Vec<TerminoGlosario> {
        let query = query.trim();
        let letter = letter.map(|c| c.to_uppercase().next().unwrap_or(c));

        self.cached()
            .iter()
            .filter(|t| query.is_empty() || t.matches(query))
            .filter(|t| letter.map_or(true, |l| t.initial() == Some(l)))
            .cloned()
            .collect()
    }

    pub fn letters(&self) -> Vec<char> {
        self.cached()
            .iter()
            .filter_map(TerminoGlosario::initial)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, services::api::ApiClient, utils::storage::MemoryStore};

    fn term(id: i64, siglas: &str, termino: &str) -> TerminoGlosario {
        TerminoGlosario {
            id,
            siglas: siglas.to_string(),
            termino: termino.to_string(),
            definicion: format!("Definición de {}", termino),
        }
    }

    fn seeded() -> GlosarioCache {
        let api = ApiClient::new(&Config::default(), Arc::new(MemoryStore::new())).unwrap();
        let cache = GlosarioCache::new(BibliotecaService::new(Arc::new(api)));
        *cache.terms.write() = Some(Arc::new(vec![
            term(1, "DAFIM", "Dirección de Administración Financiera Municipal"),
            term(2, "DMP", "Dirección Municipal de Planificación"),
            term(3, "ISR", "Impuesto Sobre la Renta"),
        ]));
        cache
    }

    #[test]
    fn test_lookup_is_case_insensitive_against_cache() {
        let cache = seeded();
        let found = tokio_test::block_on(cache.lookup("dafim"));
        let found = tokio_test::assert_ok!(found).unwrap();
        assert_eq!(found.id, 1);
        assert!(cache.is_loaded());
    }

    #[test]
    fn test_filter_by_query_and_letter() {
        let cache = seeded();

        let planificacion = cache.filter("planificación", None);
        assert_eq!(planificacion.len(), 1);
        assert_eq!(planificacion[0].siglas, "DMP");

        let d = cache.filter("", Some('d'));
        assert_eq!(d.len(), 2);

        assert!(cache.filter("renta", Some('D')).is_empty());
    }

    #[test]
    fn test_letters_are_sorted_and_unique() {
        assert_eq!(seeded().letters(), vec!['D', 'I']);
    }
}
