//! Theme preferences

use serde::{Deserialize, Serialize};

use crate::constants::{storage, theme};
use crate::persistence::{FieldMerge, MergeDefaults};
use crate::session::SessionConfig;

/// Persisted theme record.
///
/// Sessions load through [`MergeDefaults`], which also reads legacy names.
/// The serde field defaults cover direct deserialization by other consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConfig {
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    /// `None` keeps the preset's own surface palette
    #[serde(default)]
    pub surface_color: Option<String>,
    #[serde(default)]
    pub dark_mode: bool,
}

fn default_preset() -> String {
    theme::DEFAULT_PRESET.to_string()
}

fn default_primary_color() -> String {
    theme::DEFAULT_PRIMARY.to_string()
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            primary_color: default_primary_color(),
            surface_color: None,
            dark_mode: false,
        }
    }
}

impl MergeDefaults for ThemeConfig {
    fn merge_stored(defaults: &Self, fields: &mut FieldMerge<'_>) -> Self {
        // Records written by earlier releases used `primary`, `surface` and `darkTheme`
        Self {
            preset: fields.take("preset", &defaults.preset),
            primary_color: fields.take_renamed(&["primaryColor", "primary"], &defaults.primary_color),
            surface_color: fields.take_renamed(&["surfaceColor", "surface"], &defaults.surface_color),
            dark_mode: fields.take_renamed(&["darkMode", "darkTheme"], &defaults.dark_mode),
        }
    }
}

impl SessionConfig for ThemeConfig {
    const STORAGE_KEY: &'static str = storage::THEME_KEY;
    type Runtime = ();

    fn defaults() -> Self {
        Self::default()
    }

    fn initial_runtime(&self) -> Self::Runtime {}
}
