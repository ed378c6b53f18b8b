use serde::{Deserialize, Serialize};

use crate::utils::serde_helpers::string_or_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchResultType {
    Articulo,
    Dependencia,
    Glosario,
    /// 客户端不认识的类型；这类结果不展示
    #[serde(other)]
    Otro,
}

impl SearchResultType {
    /// 展示分组的固定顺序
    pub const DISPLAY_ORDER: [SearchResultType; 3] = [
        SearchResultType::Articulo,
        SearchResultType::Dependencia,
        SearchResultType::Glosario,
    ];

    pub fn group_label(self) -> &'static str {
        match self {
            SearchResultType::Articulo => "Procedimientos",
            SearchResultType::Dependencia => "Dependencias",
            SearchResultType::Glosario => "Glosarios",
            SearchResultType::Otro => "Otros",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(with = "string_or_number")]
    pub id: String,
    pub tipo: SearchResultType,
    pub titulo: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    pub url: String,
}

/// 一个分组中的条目，携带它在扁平列表中的位置（键盘导航使用扁平索引）
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedEntry {
    pub index: usize,
    pub result: SearchResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchGroup {
    pub tipo: SearchResultType,
    pub entries: Vec<GroupedEntry>,
}
