//! Sidebar state machine
//!
//! Pure functions of `(sidebar config, sidebar runtime, is_desktop)`. Nothing
//! here is stored; every read recomputes. The visibility classification is a
//! single enum value, so exactly one state holds within exactly one branch.

use serde::Serialize;

use crate::config::{LayoutConfig, LayoutRuntime, OverallMode, SidebarConfig, SidebarMode, SidebarRuntime, SidebarVariant};

/// Visibility of an effectively static sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StaticState {
    Expanded,
    /// Icon-only rail; requires `can_collapse`
    CollapsedRail,
    /// Hidden without affordance; closed and can't collapse
    OffCanvas,
}

/// Visibility of an effectively overlay sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayState {
    Open,
    OffCanvas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "visibility", rename_all = "lowercase")]
pub enum SidebarState {
    Static(StaticState),
    Overlay(OverlayState),
}

/// `data-state` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataState {
    Expanded,
    Collapsed,
}

/// `data-collapsible` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Collapsible {
    #[serde(rename = "icon")]
    Icon,
    #[serde(rename = "offcanvas")]
    OffCanvas,
    #[serde(rename = "")]
    None,
}

impl Collapsible {
    pub fn as_str(self) -> &'static str {
        match self {
            Collapsible::Icon => "icon",
            Collapsible::OffCanvas => "offcanvas",
            Collapsible::None => "",
        }
    }
}

/// Overlay on non-desktop viewports regardless of the configured mode
pub fn effective_mode(sidebar: &SidebarConfig, is_desktop: bool) -> SidebarMode {
    if is_desktop {
        sidebar.mode
    } else {
        SidebarMode::Overlay
    }
}

pub fn sidebar_state(sidebar: &SidebarConfig, runtime: &SidebarRuntime, is_desktop: bool) -> SidebarState {
    match effective_mode(sidebar, is_desktop) {
        SidebarMode::Static => SidebarState::Static(match (runtime.is_desktop_static_open, sidebar.can_collapse) {
            (true, _) => StaticState::Expanded,
            (false, true) => StaticState::CollapsedRail,
            (false, false) => StaticState::OffCanvas,
        }),
        SidebarMode::Overlay => SidebarState::Overlay(if runtime.is_overlay_open {
            OverlayState::Open
        } else {
            OverlayState::OffCanvas
        }),
    }
}

impl SidebarState {
    pub fn mode(self) -> SidebarMode {
        match self {
            SidebarState::Static(_) => SidebarMode::Static,
            SidebarState::Overlay(_) => SidebarMode::Overlay,
        }
    }

    pub fn is_effectively_static(self) -> bool {
        matches!(self, SidebarState::Static(_))
    }

    pub fn is_effectively_overlay(self) -> bool {
        matches!(self, SidebarState::Overlay(_))
    }

    pub fn is_desktop_static_open(self) -> bool {
        self == SidebarState::Static(StaticState::Expanded)
    }

    pub fn is_desktop_static_collapsed(self) -> bool {
        self == SidebarState::Static(StaticState::CollapsedRail)
    }

    pub fn is_desktop_static_off_canvas(self) -> bool {
        self == SidebarState::Static(StaticState::OffCanvas)
    }

    pub fn is_overlay_open(self) -> bool {
        self == SidebarState::Overlay(OverlayState::Open)
    }

    pub fn is_overlay_off_canvas(self) -> bool {
        self == SidebarState::Overlay(OverlayState::OffCanvas)
    }

    pub fn data_state(self) -> DataState {
        if self.is_desktop_static_open() || self.is_overlay_open() {
            DataState::Expanded
        } else {
            DataState::Collapsed
        }
    }

    pub fn collapsible(self) -> Collapsible {
        match self {
            SidebarState::Static(StaticState::CollapsedRail) => Collapsible::Icon,
            SidebarState::Static(StaticState::OffCanvas) | SidebarState::Overlay(OverlayState::OffCanvas) => {
                Collapsible::OffCanvas
            }
            _ => Collapsible::None,
        }
    }
}

/// Host attributes for the sidebar container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarAttributes {
    pub layout: OverallMode,
    pub variant: SidebarVariant,
    pub mode: SidebarMode,
    pub state: DataState,
    pub collapsible: Collapsible,
    /// Navigation renders icon-only
    pub is_collapsed: bool,
}

/// Snapshot of everything presentation reads from the layout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutView {
    pub config: LayoutConfig,
    pub runtime: LayoutRuntime,
    pub is_desktop: bool,
    pub sidebar: SidebarState,
    pub attributes: SidebarAttributes,
}

impl LayoutView {
    pub fn compute(config: &LayoutConfig, runtime: &LayoutRuntime, is_desktop: bool) -> Self {
        let sidebar = sidebar_state(&config.sidebar, &runtime.sidebar, is_desktop);
        Self {
            config: *config,
            runtime: *runtime,
            is_desktop,
            sidebar,
            attributes: SidebarAttributes {
                layout: config.overall_mode,
                variant: config.sidebar.variant,
                mode: sidebar.mode(),
                state: sidebar.data_state(),
                collapsible: sidebar.collapsible(),
                is_collapsed: sidebar.is_desktop_static_collapsed(),
            },
        }
    }
}
