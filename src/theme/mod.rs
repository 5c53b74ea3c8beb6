//! Theme session
//!
//! Preset, palette and dark mode. Dark-mode changes after construction are
//! routed through the [`TransitionEngine`]; everything else is plain config.

pub mod transition;

use tracing::{debug, info};

use crate::config::ThemeConfig;
use crate::environment::Environment;
use crate::reactive::Subscription;
use crate::session::ConfigSession;

pub use transition::{AnimatedTransition, ClassList, ThemeSurface, TransitionEngine, TransitionReady};

#[derive(Debug)]
pub struct ThemeSession {
    session: ConfigSession<ThemeConfig>,
    engine: TransitionEngine,
    _dark_mode_watch: Subscription,
}

impl ThemeSession {
    pub fn new(env: &Environment) -> Self {
        let session: ConfigSession<ThemeConfig> = ConfigSession::new(env);
        let engine = TransitionEngine::new(env);
        engine.bootstrap(session.with_config(|c| c.dark_mode));

        let watcher = engine.clone();
        let watch = session
            .config_observable()
            .subscribe(move |config| watcher.request(config.dark_mode));

        Self {
            session,
            engine,
            _dark_mode_watch: watch,
        }
    }

    pub fn session(&self) -> &ConfigSession<ThemeConfig> {
        &self.session
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    pub fn config(&self) -> ThemeConfig {
        self.session.config()
    }

    pub fn active_preset(&self) -> String {
        self.session.with_config(|c| c.preset.clone())
    }

    pub fn active_primary_color(&self) -> String {
        self.session.with_config(|c| c.primary_color.clone())
    }

    pub fn active_surface_color(&self) -> Option<String> {
        self.session.with_config(|c| c.surface_color.clone())
    }

    pub fn is_dark_mode(&self) -> bool {
        self.session.with_config(|c| c.dark_mode)
    }

    /// `true` for one reactor tick after each dark-mode transition finishes
    pub fn visual_transition_complete(&self) -> bool {
        self.engine.is_complete()
    }

    pub fn transitions_completed(&self) -> u64 {
        self.engine.completions()
    }

    pub fn is_transitioning(&self) -> bool {
        self.engine.is_transitioning()
    }

    pub fn subscribe_transition_complete(&self, callback: impl Fn(&bool) + 'static) -> Subscription {
        self.engine.subscribe_complete(callback)
    }

    /// Wait until no dark-mode transition is in flight
    pub async fn settle(&self) {
        self.engine.settle().await;
    }

    pub fn set_dark_mode(&self, dark: bool) {
        debug!(dark, "Setting dark mode");
        self.session.patch(|mut c| {
            c.dark_mode = dark;
            c
        });
    }

    pub fn toggle_dark_mode(&self) {
        self.session.patch(|mut c| {
            c.dark_mode = !c.dark_mode;
            c
        });
    }

    pub fn set_preset(&self, preset: impl Into<String>) {
        let preset = preset.into();
        debug!(preset = %preset, "Setting theme preset");
        self.session.patch(|mut c| {
            c.preset = preset;
            c
        });
    }

    pub fn set_primary_color(&self, color: impl Into<String>) {
        let color = color.into();
        debug!(color = %color, "Setting primary color");
        self.session.patch(|mut c| {
            c.primary_color = color;
            c
        });
    }

    /// `None` returns to the preset's own surface palette
    pub fn set_surface_color(&self, color: Option<String>) {
        debug!(color = ?color, "Setting surface color");
        self.session.patch(|mut c| {
            c.surface_color = color;
            c
        });
    }

    /// Defaults again, stored record removed. A dark-mode difference animates
    /// like any other change.
    pub fn reset(&self) {
        info!("Resetting theme configuration to defaults");
        self.session.reset();
    }
}
