//! Layout preferences and sidebar runtime state

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::storage;
use crate::persistence::{FieldMerge, MergeDefaults};
use crate::session::SessionConfig;

/// Arrangement of the whole shell: sidebar beside the content (`Row`) or
/// top bar above it (`Column`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverallMode {
    #[default]
    #[serde(rename = "row")]
    Row,
    #[serde(rename = "col", alias = "column")]
    Column,
}

/// How the sidebar takes part in the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarMode {
    /// In-flow panel beside the content
    #[default]
    Static,
    /// Panel drawn over the content, hidden by default
    Overlay,
}

/// Visual style of the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarVariant {
    #[default]
    Sidebar,
    Inset,
    Floating,
}

impl OverallMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OverallMode::Row => "row",
            OverallMode::Column => "col",
        }
    }
}

impl SidebarMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SidebarMode::Static => "static",
            SidebarMode::Overlay => "overlay",
        }
    }
}

impl SidebarVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            SidebarVariant::Sidebar => "sidebar",
            SidebarVariant::Inset => "inset",
            SidebarVariant::Floating => "floating",
        }
    }
}

macro_rules! display_from_str {
    ($ty:ty, $what:literal, [$($text:literal => $variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    other => anyhow::bail!("unknown {} '{}'", $what, other),
                }
            }
        }
    };
}

display_from_str!(OverallMode, "overall mode", [
    "row" => OverallMode::Row,
    "col" => OverallMode::Column,
    "column" => OverallMode::Column,
]);
display_from_str!(SidebarMode, "sidebar mode", [
    "static" => SidebarMode::Static,
    "overlay" => SidebarMode::Overlay,
]);
display_from_str!(SidebarVariant, "sidebar variant", [
    "sidebar" => SidebarVariant::Sidebar,
    "inset" => SidebarVariant::Inset,
    "floating" => SidebarVariant::Floating,
]);

/// Persisted sidebar settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarConfig {
    #[serde(default)]
    pub mode: SidebarMode,
    #[serde(default)]
    pub variant: SidebarVariant,
    /// Static sidebar may shrink to an icon rail instead of disappearing
    #[serde(default = "default_can_collapse")]
    pub can_collapse: bool,
    /// Static sidebar starts expanded on desktop
    #[serde(default = "default_initially_open_desktop")]
    pub initially_open_desktop: bool,
}

/// Persisted layout record.
///
/// Sessions load through [`MergeDefaults`]; the serde field defaults keep
/// direct `serde_json::from_str` by other consumers equally forgiving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(default)]
    pub overall_mode: OverallMode,
    #[serde(default)]
    pub sidebar: SidebarConfig,
}

fn default_can_collapse() -> bool {
    true
}

fn default_initially_open_desktop() -> bool {
    true
}

impl Default for SidebarConfig {
    fn default() -> Self {
        Self {
            mode: SidebarMode::default(),
            variant: SidebarVariant::default(),
            can_collapse: default_can_collapse(),
            initially_open_desktop: default_initially_open_desktop(),
        }
    }
}

/// Transient sidebar state, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarRuntime {
    /// Static sidebar currently expanded (as opposed to rail or off-canvas)
    pub is_desktop_static_open: bool,
    /// Overlay panel currently shown
    pub is_overlay_open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LayoutRuntime {
    pub sidebar: SidebarRuntime,
}

impl MergeDefaults for SidebarConfig {
    fn merge_stored(defaults: &Self, fields: &mut FieldMerge<'_>) -> Self {
        Self {
            mode: fields.take("mode", &defaults.mode),
            variant: fields.take("variant", &defaults.variant),
            can_collapse: fields.take("canCollapse", &defaults.can_collapse),
            initially_open_desktop: fields.take("initiallyOpenDesktop", &defaults.initially_open_desktop),
        }
    }
}

impl MergeDefaults for LayoutConfig {
    fn merge_stored(defaults: &Self, fields: &mut FieldMerge<'_>) -> Self {
        let overall_mode = fields.take("overallMode", &defaults.overall_mode);
        let mut sidebar_fields = fields.nested("sidebar");
        let sidebar = SidebarConfig::merge_stored(&defaults.sidebar, &mut sidebar_fields);
        fields.absorb(sidebar_fields);
        Self {
            overall_mode,
            sidebar,
        }
    }
}

impl SessionConfig for LayoutConfig {
    const STORAGE_KEY: &'static str = storage::LAYOUT_KEY;
    type Runtime = LayoutRuntime;

    fn defaults() -> Self {
        Self::default()
    }

    fn initial_runtime(&self) -> LayoutRuntime {
        LayoutRuntime {
            sidebar: SidebarRuntime {
                is_desktop_static_open: self.sidebar.initially_open_desktop,
                is_overlay_open: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value, json};

    fn merge(value: Value) -> LayoutConfig {
        let map: Map<String, Value> = serde_json::from_value(value).unwrap();
        let mut fields = FieldMerge::new(&map);
        LayoutConfig::merge_stored(&LayoutConfig::defaults(), &mut fields)
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = LayoutConfig::defaults();
        assert_eq!(config.overall_mode, OverallMode::Row);
        assert_eq!(config.sidebar.mode, SidebarMode::Static);
        assert_eq!(config.sidebar.variant, SidebarVariant::Sidebar);
        assert!(config.sidebar.can_collapse);
        assert!(config.sidebar.initially_open_desktop);
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(LayoutConfig::defaults()).unwrap();
        assert_eq!(
            value,
            json!({
                "overallMode": "row",
                "sidebar": {
                    "mode": "static",
                    "variant": "sidebar",
                    "canCollapse": true,
                    "initiallyOpenDesktop": true
                }
            })
        );
    }

    #[test]
    fn test_direct_deserialize_fills_defaults() {
        let config: LayoutConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LayoutConfig::defaults());
        let config: LayoutConfig = serde_json::from_str(r#"{"sidebar":{"mode":"overlay"}}"#).unwrap();
        assert_eq!(config.sidebar.mode, SidebarMode::Overlay);
        assert!(config.sidebar.can_collapse);
        assert!(config.sidebar.initially_open_desktop);
    }

    #[test]
    fn test_merge_accepts_column_alias() {
        assert_eq!(merge(json!({"overallMode": "col"})).overall_mode, OverallMode::Column);
        assert_eq!(merge(json!({"overallMode": "column"})).overall_mode, OverallMode::Column);
        assert_eq!(merge(json!({"overallMode": "diagonal"})).overall_mode, OverallMode::Row);
    }

    #[test]
    fn test_merge_partial_sidebar_keeps_other_defaults() {
        let config = merge(json!({"sidebar": {"mode": "overlay", "canCollapse": "nope"}}));
        assert_eq!(config.sidebar.mode, SidebarMode::Overlay);
        assert!(config.sidebar.can_collapse);
        assert_eq!(config.sidebar.variant, SidebarVariant::Sidebar);
        assert_eq!(config.overall_mode, OverallMode::Row);
    }

    #[test]
    fn test_merge_non_object_sidebar_uses_defaults() {
        let config = merge(json!({"overallMode": "col", "sidebar": null}));
        assert_eq!(config.overall_mode, OverallMode::Column);
        assert_eq!(config.sidebar, SidebarConfig::default());
    }

    #[test]
    fn test_initial_runtime_follows_initially_open() {
        let mut config = LayoutConfig::defaults();
        assert!(config.initial_runtime().sidebar.is_desktop_static_open);
        config.sidebar.initially_open_desktop = false;
        let runtime = config.initial_runtime();
        assert!(!runtime.sidebar.is_desktop_static_open);
        assert!(!runtime.sidebar.is_overlay_open);
    }

    #[test]
    fn test_from_str_and_display() {
        assert_eq!("Overlay".parse::<SidebarMode>().unwrap(), SidebarMode::Overlay);
        assert_eq!("column".parse::<OverallMode>().unwrap(), OverallMode::Column);
        assert!("wide".parse::<SidebarVariant>().is_err());
        assert_eq!(OverallMode::Column.to_string(), "col");
        assert_eq!(SidebarVariant::Floating.to_string(), "floating");
    }

    mod merge_props {
        use super::*;
        use proptest::prelude::*;

        fn json_scalar() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i32>().prop_map(|n| json!(n)),
                prop_oneof![
                    Just("row"), Just("col"), Just("static"), Just("overlay"),
                    Just("inset"), Just("floating"), Just("junk"),
                ]
                .prop_map(|s| json!(s)),
            ]
        }

        proptest! {
            #[test]
            fn prop_merged_record_is_complete(
                overall in proptest::option::of(json_scalar()),
                mode in proptest::option::of(json_scalar()),
                variant in proptest::option::of(json_scalar()),
                can_collapse in proptest::option::of(json_scalar()),
                initially_open in proptest::option::of(json_scalar()),
            ) {
                let mut sidebar = Map::new();
                for (key, value) in [
                    ("mode", mode),
                    ("variant", variant),
                    ("canCollapse", can_collapse),
                    ("initiallyOpenDesktop", initially_open),
                ] {
                    if let Some(value) = value {
                        sidebar.insert(key.to_string(), value);
                    }
                }
                let mut record = Map::new();
                record.insert("sidebar".to_string(), Value::Object(sidebar));
                if let Some(overall) = overall {
                    record.insert("overallMode".to_string(), overall);
                }

                let merged = merge(Value::Object(record));

                // Serializing the merge gives a record that needs no defaults
                let map: Map<String, Value> = serde_json::from_value(serde_json::to_value(merged).unwrap()).unwrap();
                let mut fields = FieldMerge::new(&map);
                let again = LayoutConfig::merge_stored(&LayoutConfig::defaults(), &mut fields);
                prop_assert_eq!(again, merged);
                prop_assert!(fields.filled().is_empty());
            }
        }
    }
}
