use once_cell::sync::Lazy;
use regex::Regex;

static ARTICLE_ROUTE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/biblioteca/(.+)$").expect("valid article route regex"));

/// 从当前路由推断正在阅读的文章 slug
///
/// `/biblioteca/<slug>` 是文章页，`/biblioteca/dependencia/...` 是部门页，不算文章。
pub fn article_slug_from_path(path: &str) -> Option<String> {
    let captures = ARTICLE_ROUTE_REGEX.captures(path)?;
    let slug = captures.get(1)?.as_str();

    if slug.starts_with("dependencia") {
        return None;
    }

    Some(slug.trim_end_matches('/').to_string())
}
