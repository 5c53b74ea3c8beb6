#![forbid(unsafe_code)]

//! Layout and theme preference sessions for an application shell.
//!
//! Each session owns one persisted record and its transient runtime state.
//! The layout session derives the sidebar's effective visibility from config,
//! runtime state and the desktop breakpoint. The theme session sequences
//! dark-mode changes through an optional animation hook.

pub mod config;
pub mod constants;
pub mod environment;
pub mod layout;
pub mod persistence;
pub mod reactive;
pub mod session;
pub mod theme;

pub use config::{LayoutConfig, OverallMode, SidebarMode, SidebarVariant, ThemeConfig};
pub use environment::{BreakpointSource, Environment};
pub use layout::{LayoutSession, LayoutView, SidebarState};
pub use persistence::{FileStore, KeyValueStore, MemoryStore, PersistenceAdapter};
pub use reactive::{Reactor, Subscription};
pub use session::{ConfigSession, SessionConfig};
pub use theme::{AnimatedTransition, ClassList, ThemeSession, ThemeSurface, TransitionReady};

/// Reset both sessions in one reactor batch, so view subscribers see a
/// single update.
pub fn reset_all(layout: &LayoutSession, theme: &ThemeSession) {
    let _batch = layout.session().reactor().batch();
    layout.reset();
    theme.reset();
}
