use serde::{Deserialize, Serialize};

/// "system" 与 "light" 目前表现相同，只有 "dark" 会添加样式标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "system" => Ok(Theme::System),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("Unknown theme: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub email: bool,
    pub push: bool,
    pub sound: bool,
    pub consultas: bool,
    pub respuestas: bool,
    pub sistema: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            sound: true,
            consultas: true,
            respuestas: true,
            sistema: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplaySettings {
    pub sidebar_open: bool,
    pub compact_mode: bool,
    pub show_tips: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            sidebar_open: true,
            compact_mode: false,
            show_tips: true,
        }
    }
}

/// 用户偏好设置；每一层都带 `serde(default)`，存储中缺失的键会用默认值补齐
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub notifications: NotificationSettings,
    pub display: DisplaySettings,
}

impl Settings {
    pub fn is_dark_mode(&self) -> bool {
        self.theme == Theme::Dark
    }

    /// 只有同时开启声音与推送时才播放提示音
    pub fn notification_sound_enabled(&self) -> bool {
        self.notifications.sound && self.notifications.push
    }
}
