//! Layout session: overall arrangement and sidebar behavior
//!
//! Wraps a [`ConfigSession<LayoutConfig>`] together with the breakpoint
//! signal. Reads are derived on demand through [`derived`]; writes are the
//! intents below, each applied as one batched step.

pub mod derived;

use std::rc::Rc;
use tracing::{debug, info};

use crate::config::{LayoutConfig, LayoutRuntime, OverallMode, SidebarMode, SidebarVariant};
use crate::environment::{BreakpointSource, Environment};
use crate::reactive::Subscription;
use crate::session::ConfigSession;

pub use derived::{
    Collapsible, DataState, LayoutView, OverlayState, SidebarAttributes, SidebarState, StaticState,
};

#[derive(Debug)]
pub struct LayoutSession {
    session: ConfigSession<LayoutConfig>,
    breakpoint: BreakpointSource,
}

impl LayoutSession {
    pub fn new(env: &Environment) -> Self {
        Self {
            session: ConfigSession::new(env),
            breakpoint: env.breakpoint().clone(),
        }
    }

    pub fn session(&self) -> &ConfigSession<LayoutConfig> {
        &self.session
    }

    // --- Config selectors ---

    pub fn config(&self) -> LayoutConfig {
        self.session.config()
    }

    pub fn runtime(&self) -> LayoutRuntime {
        self.session.runtime()
    }

    pub fn overall_mode(&self) -> OverallMode {
        self.session.with_config(|c| c.overall_mode)
    }

    pub fn sidebar_mode(&self) -> SidebarMode {
        self.session.with_config(|c| c.sidebar.mode)
    }

    pub fn sidebar_variant(&self) -> SidebarVariant {
        self.session.with_config(|c| c.sidebar.variant)
    }

    pub fn can_sidebar_collapse(&self) -> bool {
        self.session.with_config(|c| c.sidebar.can_collapse)
    }

    pub fn is_sidebar_initially_open_desktop(&self) -> bool {
        self.session.with_config(|c| c.sidebar.initially_open_desktop)
    }

    // --- Derived state ---

    pub fn is_desktop(&self) -> bool {
        self.breakpoint.is_desktop()
    }

    pub fn effective_mode(&self) -> SidebarMode {
        self.session
            .with_config(|c| derived::effective_mode(&c.sidebar, self.is_desktop()))
    }

    pub fn sidebar_state(&self) -> SidebarState {
        let is_desktop = self.is_desktop();
        self.session.with_config(|c| {
            self.session
                .with_runtime(|r| derived::sidebar_state(&c.sidebar, &r.sidebar, is_desktop))
        })
    }

    pub fn is_sidebar_effectively_static(&self) -> bool {
        self.sidebar_state().is_effectively_static()
    }

    pub fn is_sidebar_effectively_overlay(&self) -> bool {
        self.sidebar_state().is_effectively_overlay()
    }

    pub fn is_sidebar_desktop_static_open(&self) -> bool {
        self.sidebar_state().is_desktop_static_open()
    }

    pub fn is_sidebar_desktop_static_collapsed(&self) -> bool {
        self.sidebar_state().is_desktop_static_collapsed()
    }

    pub fn is_sidebar_desktop_static_off_canvas(&self) -> bool {
        self.sidebar_state().is_desktop_static_off_canvas()
    }

    pub fn is_sidebar_overlay_open(&self) -> bool {
        self.sidebar_state().is_overlay_open()
    }

    pub fn is_sidebar_overlay_off_canvas(&self) -> bool {
        self.sidebar_state().is_overlay_off_canvas()
    }

    pub fn view(&self) -> LayoutView {
        LayoutView::compute(&self.config(), &self.runtime(), self.is_desktop())
    }

    pub fn attributes(&self) -> SidebarAttributes {
        self.view().attributes
    }

    /// Deliver a fresh [`LayoutView`] whenever the config, the runtime state
    /// or the breakpoint changes. Changes made by one intent arrive as a
    /// single call.
    pub fn subscribe_view(&self, callback: impl Fn(&LayoutView) + 'static) -> Subscription {
        let callback: Rc<dyn Fn(&LayoutView)> = Rc::new(callback);
        let key = Rc::as_ptr(&callback) as *const () as usize;

        let config = self.session.config_observable().clone();
        let runtime = self.session.runtime_observable().clone();
        let breakpoint = self.breakpoint.clone();
        let deliver = {
            let callback = Rc::clone(&callback);
            Rc::new(move || {
                let view = LayoutView::compute(&config.get(), &runtime.get(), breakpoint.is_desktop());
                callback(&view);
            })
        };

        let on_config = Rc::clone(&deliver);
        let on_runtime = Rc::clone(&deliver);
        let on_breakpoint = deliver;
        Subscription::group(vec![
            self.session
                .config_observable()
                .subscribe_keyed(key, move |_| on_config()),
            self.session
                .runtime_observable()
                .subscribe_keyed(key, move |_| on_runtime()),
            self.breakpoint
                .observable()
                .subscribe_keyed(key, move |_| on_breakpoint()),
        ])
    }

    // --- Intents ---

    pub fn set_overall_mode(&self, mode: OverallMode) {
        debug!(mode = %mode, "Setting overall layout mode");
        self.session.patch(|mut c| {
            c.overall_mode = mode;
            c
        });
    }

    /// Entering overlay mode starts with the panel closed; leaving it closes
    /// any open panel.
    pub fn set_sidebar_mode(&self, mode: SidebarMode) {
        debug!(mode = %mode, "Setting sidebar mode");
        let _batch = self.session.reactor().batch();
        let previous = self.sidebar_mode();
        self.session.patch(|mut c| {
            c.sidebar.mode = mode;
            c
        });
        if mode == SidebarMode::Overlay || previous == SidebarMode::Overlay {
            self.session
                .patch_runtime(|r| r.sidebar.is_overlay_open = false);
        }
    }

    pub fn set_sidebar_variant(&self, variant: SidebarVariant) {
        debug!(variant = %variant, "Setting sidebar variant");
        self.session.patch(|mut c| {
            c.sidebar.variant = variant;
            c
        });
    }

    /// Collapsing only means something for a static sidebar, so this also
    /// switches the configured mode to static. Runtime state is kept.
    pub fn set_sidebar_can_collapse(&self, can_collapse: bool) {
        debug!(can_collapse, "Setting sidebar collapsibility");
        self.session.patch(|mut c| {
            c.sidebar.can_collapse = can_collapse;
            c.sidebar.mode = SidebarMode::Static;
            c
        });
    }

    /// Also applies to the current static sidebar when it is effectively
    /// static; otherwise only future sessions see the change.
    ///
    /// Unlike [`set_sidebar_can_collapse`](Self::set_sidebar_can_collapse),
    /// this never switches the configured mode to static.
    pub fn set_sidebar_initially_open_desktop(&self, is_open: bool) {
        debug!(is_open, "Setting sidebar initial desktop state");
        let _batch = self.session.reactor().batch();
        let effectively_static = self.effective_mode() == SidebarMode::Static;
        self.session.patch(|mut c| {
            c.sidebar.initially_open_desktop = is_open;
            c
        });
        if effectively_static {
            self.session
                .patch_runtime(|r| r.sidebar.is_desktop_static_open = is_open);
        }
    }

    /// Flip whichever panel the effective mode shows.
    pub fn toggle_sidebar(&self) {
        match self.effective_mode() {
            SidebarMode::Overlay => self
                .session
                .patch_runtime(|r| r.sidebar.is_overlay_open = !r.sidebar.is_overlay_open),
            SidebarMode::Static => self
                .session
                .patch_runtime(|r| r.sidebar.is_desktop_static_open = !r.sidebar.is_desktop_static_open),
        }
    }

    /// No-op unless the sidebar is effectively overlay
    pub fn open_sidebar_overlay(&self) {
        self.set_overlay_open(true);
    }

    /// No-op unless the sidebar is effectively overlay
    pub fn close_sidebar_overlay(&self) {
        self.set_overlay_open(false);
    }

    pub fn reset(&self) {
        info!("Resetting layout configuration to defaults");
        self.session.reset();
    }

    fn set_overlay_open(&self, open: bool) {
        if self.effective_mode() != SidebarMode::Overlay {
            debug!(open, "Ignoring overlay request outside overlay mode");
            return;
        }
        self.session
            .patch_runtime(|r| r.sidebar.is_overlay_open = open);
    }
}
