//! Persisted preference records for the two sessions
//!
//! - **layout**: overall arrangement plus sidebar behavior, and the transient
//!   sidebar runtime state seeded from it
//! - **theme**: preset, palette and dark mode

pub mod layout;
pub mod theme;

pub use layout::{
    LayoutConfig, LayoutRuntime, OverallMode, SidebarConfig, SidebarMode, SidebarRuntime,
    SidebarVariant,
};
pub use theme::ThemeConfig;
