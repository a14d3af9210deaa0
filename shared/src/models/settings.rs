use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: Theme,
    pub muted: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PreferencesUpdate {
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub muted: Option<bool>,
}

/// Generation parameters handed to the completion provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionSettings {
    pub api_base: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            api_base: None,
            model: "gemini-2.5-flash".to_string(),
            temperature: 1.0,
            top_p: 0.9,
        }
    }
}
