//! Capabilities injected into the sessions at construction
//!
//! Nothing in the core probes its surroundings. Whether a durable store or an
//! animated-transition hook exists is decided by whoever builds the
//! [`Environment`], and the desktop breakpoint is pushed in from outside.

use std::rc::Rc;

use crate::persistence::{KeyValueStore, PersistenceAdapter};
use crate::reactive::{Observable, Reactor, Subscription};
use crate::theme::{AnimatedTransition, ClassList, ThemeSurface};

/// Desktop/non-desktop viewport signal.
///
/// The core only reads it; the host updates it with [`set_desktop`] whenever
/// its media query changes.
///
/// [`set_desktop`]: BreakpointSource::set_desktop
#[derive(Debug, Clone)]
pub struct BreakpointSource {
    desktop: Observable<bool>,
}

impl BreakpointSource {
    pub fn new(is_desktop: bool, reactor: &Reactor) -> Self {
        Self {
            desktop: Observable::new(is_desktop, reactor),
        }
    }

    pub fn is_desktop(&self) -> bool {
        self.desktop.get()
    }

    pub fn set_desktop(&self, is_desktop: bool) {
        self.desktop.set(is_desktop);
    }

    pub fn subscribe(&self, callback: impl Fn(&bool) + 'static) -> Subscription {
        self.desktop.subscribe(callback)
    }

    pub(crate) fn observable(&self) -> &Observable<bool> {
        &self.desktop
    }
}

/// Everything a session needs from its host
#[derive(Clone)]
pub struct Environment {
    reactor: Reactor,
    breakpoint: BreakpointSource,
    storage: Option<Rc<dyn KeyValueStore>>,
    animator: Option<Rc<dyn AnimatedTransition>>,
    surface: Rc<dyn ThemeSurface>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("is_desktop", &self.breakpoint.is_desktop())
            .field("has_durable_storage", &self.has_durable_storage())
            .field("has_animated_transition", &self.has_animated_transition())
            .finish_non_exhaustive()
    }
}

impl Environment {
    /// No store, no animation hook, desktop viewport, in-process class list
    pub fn headless() -> Self {
        let reactor = Reactor::new();
        let breakpoint = BreakpointSource::new(true, &reactor);
        Self {
            reactor,
            breakpoint,
            storage: None,
            animator: None,
            surface: Rc::new(ClassList::new()),
        }
    }

    pub fn with_storage(mut self, store: Rc<dyn KeyValueStore>) -> Self {
        self.storage = Some(store);
        self
    }

    pub fn with_animator(mut self, animator: Rc<dyn AnimatedTransition>) -> Self {
        self.animator = Some(animator);
        self
    }

    pub fn with_surface(mut self, surface: Rc<dyn ThemeSurface>) -> Self {
        self.surface = surface;
        self
    }

    /// Set the breakpoint's starting value
    pub fn with_desktop(self, is_desktop: bool) -> Self {
        self.breakpoint.set_desktop(is_desktop);
        self
    }

    pub fn has_durable_storage(&self) -> bool {
        self.storage.is_some()
    }

    pub fn has_animated_transition(&self) -> bool {
        self.animator.is_some()
    }

    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    pub fn breakpoint(&self) -> &BreakpointSource {
        &self.breakpoint
    }

    pub fn persistence(&self) -> PersistenceAdapter {
        PersistenceAdapter::new(self.storage.clone())
    }

    pub fn animator(&self) -> Option<Rc<dyn AnimatedTransition>> {
        self.animator.clone()
    }

    pub fn surface(&self) -> Rc<dyn ThemeSurface> {
        Rc::clone(&self.surface)
    }
}
