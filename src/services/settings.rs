use crate::{
    error::{AppError, Result},
    models::settings::{Settings, Theme},
    utils::storage::KeyValueStore,
};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub const SETTINGS_KEY: &str = "sisfom_settings";

pub const DARK_CLASS: &str = "dark";
pub const COMPACT_CLASS: &str = "compact";

/// 进程级的文档样式标记（相当于 `document.documentElement.classList`）
#[derive(Debug, Clone, Default)]
pub struct DocumentClasses {
    classes: Arc<RwLock<BTreeSet<String>>>,
}

impl DocumentClasses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.read().contains(class)
    }

    pub fn toggle(&self, class: &str, enabled: bool) {
        let mut classes = self.classes.write();
        if enabled {
            classes.insert(class.to_string());
        } else {
            classes.remove(class);
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.classes.read().iter().cloned().collect()
    }
}

/// 基于键值存储的用户偏好设置
pub struct SettingsStore {
    storage: Arc<dyn KeyValueStore>,
    document: DocumentClasses,
    settings: RwLock<Settings>,
}

impl SettingsStore {
    /// 读取存储的设置；缺失或损坏时使用默认值
    pub fn load(storage: Arc<dyn KeyValueStore>, document: DocumentClasses) -> Self {
        let settings = match storage.get(SETTINGS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Stored settings are corrupt, using defaults: {}", e);
                Settings::default()
            }),
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Failed to read settings, using defaults: {}", e);
                Settings::default()
            }
        };

        let store = Self {
            storage,
            document,
            settings: RwLock::new(settings),
        };
        store.apply_document_classes();
        store
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn document(&self) -> &DocumentClasses {
        &self.document
    }

    /// 整体替换并同步持久化
    pub fn update_settings(&self, settings: Settings) -> Result<()> {
        let raw = serde_json::to_string(&settings)?;
        self.storage.set(SETTINGS_KEY, &raw)?;
        *self.settings.write() = settings;
        self.apply_document_classes();
        Ok(())
    }

    /// 修改单个设置项
    ///
    /// `notifications` / `display` 是嵌套命名空间，只合并 `key` 对应的叶子；
    /// `theme` 是标量，直接覆盖（忽略 `key`）。
    pub fn update_setting(&self, category: &str, key: &str, value: serde_json::Value) -> Result<()> {
        let mut current = serde_json::to_value(self.settings())?;

        let slot = current
            .get_mut(category)
            .ok_or_else(|| AppError::Validation(format!("Unknown settings category: {}", category)))?;

        match slot {
            serde_json::Value::Object(namespace) => {
                if !namespace.contains_key(key) {
                    return Err(AppError::Validation(format!(
                        "Unknown setting: {}.{}",
                        category, key
                    )));
                }
                namespace.insert(key.to_string(), value);
            }
            scalar => *scalar = value,
        }

        let updated: Settings = serde_json::from_value(current).map_err(|e| {
            AppError::Validation(format!("Invalid value for {}.{}: {}", category, key, e))
        })?;

        debug!("Setting {}.{} updated", category, key);
        self.update_settings(updated)
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        let mut settings = self.settings();
        settings.theme = theme;
        self.update_settings(settings)
    }

    /// 恢复内置默认值
    pub fn reset_settings(&self) -> Result<()> {
        self.update_settings(Settings::default())
    }

    pub fn is_dark_mode(&self) -> bool {
        self.settings.read().is_dark_mode()
    }

    pub fn is_compact_mode(&self) -> bool {
        self.settings.read().display.compact_mode
    }

    pub fn show_tips(&self) -> bool {
        self.settings.read().display.show_tips
    }

    pub fn default_sidebar_open(&self) -> bool {
        self.settings.read().display.sidebar_open
    }

    pub fn notification_sound_enabled(&self) -> bool {
        self.settings.read().notification_sound_enabled()
    }

    // 只有 dark 添加标记，system 与 light 都是原始浅色主题
    fn apply_document_classes(&self) {
        let settings = self.settings.read();
        self.document.toggle(DARK_CLASS, settings.theme == Theme::Dark);
        self.document.toggle(COMPACT_CLASS, settings.display.compact_mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::storage::MemoryStore;
    use serde_json::json;

    fn store_with(storage: Arc<MemoryStore>) -> SettingsStore {
        SettingsStore::load(storage, DocumentClasses::new())
    }

    #[test]
    fn test_update_setting_survives_reload() {
        let storage = Arc::new(MemoryStore::new());
        let store = store_with(storage.clone());

        store.update_setting("notifications", "sound", json!(false)).unwrap();
        store.update_setting("display", "compactMode", json!(true)).unwrap();
        store.update_setting("theme", "theme", json!("dark")).unwrap();

        let reloaded = store_with(storage);
        let settings = reloaded.settings();
        assert!(!settings.notifications.sound);
        assert!(settings.display.compact_mode);
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings, store.settings());
    }

    #[test]
    fn test_reset_restores_exact_defaults() {
        let storage = Arc::new(MemoryStore::new());
        let store = store_with(storage.clone());

        store.update_setting("display", "showTips", json!(false)).unwrap();
        store.set_theme(Theme::Light).unwrap();
        store.reset_settings().unwrap();

        assert_eq!(store.settings(), Settings::default());
        assert_eq!(store_with(storage).settings(), Settings::default());
    }

    #[test]
    fn test_theme_toggles_dark_class_only_for_dark() {
        let document = DocumentClasses::new();
        let store = SettingsStore::load(Arc::new(MemoryStore::new()), document.clone());
        assert!(!document.contains(DARK_CLASS));

        store.set_theme(Theme::Dark).unwrap();
        assert!(document.contains(DARK_CLASS));
        assert!(store.is_dark_mode());

        store.set_theme(Theme::Light).unwrap();
        assert!(!document.contains(DARK_CLASS));

        store.set_theme(Theme::System).unwrap();
        assert!(!document.contains(DARK_CLASS));
    }

    #[test]
    fn test_compact_mode_class() {
        let store = store_with(Arc::new(MemoryStore::new()));
        store.update_setting("display", "compactMode", json!(true)).unwrap();

        assert!(store.document().contains(COMPACT_CLASS));
        assert!(store.is_compact_mode());
    }

    #[test]
    fn test_invalid_updates_leave_store_unchanged() {
        let store = store_with(Arc::new(MemoryStore::new()));

        assert!(store.update_setting("colors", "accent", json!("red")).is_err());
        assert!(store.update_setting("display", "fontSize", json!(12)).is_err());
        assert!(store.update_setting("notifications", "email", json!("yes")).is_err());
        assert!(store.update_setting("theme", "theme", json!("sepia")).is_err());

        assert_eq!(store.settings(), Settings::default());
    }

    #[test]
    fn test_failed_persist_is_not_visible_after_reload() {
        use crate::utils::storage::FileStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let storage = Arc::new(FileStore::open(&path).unwrap());

        // 存储路径被目录占用，写盘失败
        std::fs::create_dir(&path).unwrap();

        let store = SettingsStore::load(storage.clone(), DocumentClasses::new());
        assert!(store
            .update_setting("display", "compactMode", json!(true))
            .is_err());
        assert!(!store.is_compact_mode());
        assert!(!store.document().contains(COMPACT_CLASS));

        let reloaded = SettingsStore::load(storage, DocumentClasses::new());
        assert!(!reloaded.is_compact_mode());
        assert_eq!(reloaded.settings(), Settings::default());
    }

    #[test]
    fn test_corrupt_storage_falls_back_to_defaults() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(SETTINGS_KEY, "{not json").unwrap();

        assert_eq!(store_with(storage).settings(), Settings::default());
    }

    #[test]
    fn test_partial_storage_is_merged_with_defaults() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(SETTINGS_KEY, r#"{"theme":"dark","display":{"showTips":false}}"#)
            .unwrap();

        let store = store_with(storage);
        assert!(store.is_dark_mode());
        assert!(!store.show_tips());
        assert!(store.default_sidebar_open());
        assert!(store.notification_sound_enabled());
        assert!(store.document().contains(DARK_CLASS));
    }
}
