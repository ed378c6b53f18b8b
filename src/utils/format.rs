use chrono::{DateTime, Utc};

/// 相对时间（"hace 2 días"），超过 30 天显示日期
pub fn relative_time(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - date).num_seconds().max(0);
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    let plural = |n: i64| if n > 1 { "s" } else { "" };

    if secs < 60 {
        "hace un momento".to_string()
    } else if mins < 60 {
        format!("hace {} minuto{}", mins, plural(mins))
    } else if hours < 24 {
        format!("hace {} hora{}", hours, plural(hours))
    } else if days < 7 {
        format!("hace {} día{}", days, plural(days))
    } else if days < 30 {
        let weeks = days / 7;
        format!("hace {} semana{}", weeks, plural(weeks))
    } else {
        date.format("%d/%m/%Y").to_string()
    }
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

pub fn initials(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect();

    if initials.is_empty() {
        "?".to_string()
    } else {
        initials
    }
}

pub fn file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_relative_time() {
        let now = Utc::now();
        assert_eq!(relative_time(now - Duration::seconds(10), now), "hace un momento");
        assert_eq!(relative_time(now - Duration::minutes(1), now), "hace 1 minuto");
        assert_eq!(relative_time(now - Duration::hours(5), now), "hace 5 horas");
        assert_eq!(relative_time(now - Duration::days(2), now), "hace 2 días");
        assert_eq!(relative_time(now - Duration::days(14), now), "hace 2 semanas");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("corto", 10), "corto");
        assert_eq!(truncate("licencia de construcción", 8), "licencia...");
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("ana maría lópez"), "AM");
        assert_eq!(initials(""), "?");
    }

    #[test]
    fn test_file_size() {
        assert_eq!(file_size(0), "0 Bytes");
        assert_eq!(file_size(512), "512 Bytes");
        assert_eq!(file_size(1536), "1.5 KB");
        assert_eq!(file_size(5 * 1024 * 1024), "5 MB");
    }
}
