//! Dark/light visual transition
//!
//! Sequences a dark-mode change through an optional animation hook and
//! reports exactly one completion per started transition.
//!
//! # Invariants
//!
//! 1. The first application (bootstrap) goes straight to the surface with no
//!    completion pulse.
//! 2. At most one transition is in flight. Requests made meanwhile are queued,
//!    the latest replacing any earlier one.
//! 3. When a transition finishes the surface matches its target, whether the
//!    hook succeeded, failed, or dropped its ready signal.

use anyhow::anyhow;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::Poll;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, warn};

use crate::constants::theme::DARK_CLASS;
use crate::environment::Environment;
use crate::reactive::{Observable, Reactor, Subscription};

/// Where the dark/light switch becomes visible
pub trait ThemeSurface {
    fn set_dark(&self, dark: bool);
    fn is_dark(&self) -> bool;
}

/// In-process class set standing in for the document root's class list
#[derive(Debug, Default)]
pub struct ClassList {
    classes: RefCell<BTreeSet<String>>,
}

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.borrow().contains(class)
    }

    pub fn add(&self, class: &str) {
        self.classes.borrow_mut().insert(class.to_string());
    }

    pub fn remove(&self, class: &str) {
        self.classes.borrow_mut().remove(class);
    }

    pub fn classes(&self) -> Vec<String> {
        self.classes.borrow().iter().cloned().collect()
    }
}

impl ThemeSurface for ClassList {
    fn set_dark(&self, dark: bool) {
        if dark {
            self.add(DARK_CLASS);
        } else {
            self.remove(DARK_CLASS);
        }
    }

    fn is_dark(&self) -> bool {
        self.contains(DARK_CLASS)
    }
}

/// Resolves once the animated transition is ready, or with the reason it failed
pub type TransitionReady = oneshot::Receiver<anyhow::Result<()>>;

/// Host-provided animation hook.
///
/// `start` receives the mutation to apply and should run it at the point the
/// animation captures the new visual state. The returned channel reports
/// readiness. If the hook never runs the mutation, it is applied when the
/// transition finishes.
pub trait AnimatedTransition {
    fn start(&self, apply: Box<dyn FnOnce()>) -> TransitionReady;
}

#[derive(Debug)]
enum Phase {
    Idle,
    Transitioning {
        target: bool,
        /// Stays here until the transition finishes, whoever is waiting on it
        ready: TransitionReady,
    },
}

#[derive(Debug)]
struct EngineState {
    phase: Phase,
    queued: Option<bool>,
    /// Last requested value; `None` until bootstrap
    desired: Option<bool>,
    completions: u64,
    poll_scheduled: bool,
}

struct EngineInner {
    state: RefCell<EngineState>,
    surface: Rc<dyn ThemeSurface>,
    animator: Option<Rc<dyn AnimatedTransition>>,
    complete: Observable<bool>,
    reactor: Reactor,
}

/// Cloning produces another handle to the same engine.
#[derive(Clone)]
pub struct TransitionEngine {
    inner: Rc<EngineInner>,
}

impl std::fmt::Debug for TransitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionEngine")
            .field("state", &self.inner.state.borrow())
            .field("animated", &self.inner.animator.is_some())
            .field("complete", &self.inner.complete.get())
            .finish()
    }
}

impl TransitionEngine {
    pub fn new(env: &Environment) -> Self {
        let reactor = env.reactor().clone();
        Self {
            inner: Rc::new(EngineInner {
                state: RefCell::new(EngineState {
                    phase: Phase::Idle,
                    queued: None,
                    desired: None,
                    completions: 0,
                    poll_scheduled: false,
                }),
                surface: env.surface(),
                animator: env.animator(),
                complete: Observable::new(false, &reactor),
                reactor,
            }),
        }
    }

    /// Apply the initial value directly. Later calls behave like [`request`].
    ///
    /// [`request`]: TransitionEngine::request
    pub fn bootstrap(&self, dark: bool) {
        if self.inner.state.borrow().desired.is_some() {
            self.request(dark);
            return;
        }
        self.inner.state.borrow_mut().desired = Some(dark);
        self.inner.surface.set_dark(dark);
        debug!(dark, "Theme surface initialized");
    }

    /// Ask for the surface to show `dark`. Repeating the current request is a no-op.
    pub fn request(&self, dark: bool) {
        let in_flight = {
            let mut state = self.inner.state.borrow_mut();
            let desired = state.desired;
            match desired {
                None => {
                    drop(state);
                    self.bootstrap(dark);
                    return;
                }
                Some(current) if current == dark => return,
                Some(_) => {}
            }
            state.desired = Some(dark);
            if matches!(state.phase, Phase::Transitioning { .. }) {
                state.queued = Some(dark);
                true
            } else {
                false
            }
        };

        if in_flight {
            debug!(dark, "Transition in flight, queued");
        } else {
            self.start(dark);
        }
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.inner.state.borrow().phase, Phase::Transitioning { .. })
    }

    /// Completion pulse: `true` right after a transition finishes, back to
    /// `false` on the next reactor tick
    pub fn is_complete(&self) -> bool {
        self.inner.complete.get()
    }

    pub fn completions(&self) -> u64 {
        self.inner.state.borrow().completions
    }

    pub fn subscribe_complete(&self, callback: impl Fn(&bool) + 'static) -> Subscription {
        self.inner.complete.subscribe(callback)
    }

    /// Wait for the in-flight transition, and any queued after it, to finish.
    pub async fn settle(&self) {
        // The receiver is only borrowed per poll, so dropping this future
        // leaves the tick poll able to finish the transition.
        loop {
            let outcome = std::future::poll_fn(|cx| {
                let mut state = self.inner.state.borrow_mut();
                let Phase::Transitioning { target, ready } = &mut state.phase else {
                    return Poll::Ready(None);
                };
                let target = *target;
                match Pin::new(ready).poll(cx) {
                    Poll::Ready(result) => {
                        let result = result.unwrap_or_else(|_| Err(dropped_signal()));
                        Poll::Ready(Some((target, result)))
                    }
                    Poll::Pending => Poll::Pending,
                }
            })
            .await;

            match outcome {
                Some((target, result)) => self.finish(target, result),
                None => return,
            }
        }
    }

    fn start(&self, target: bool) {
        let Some(animator) = self.inner.animator.clone() else {
            self.inner.surface.set_dark(target);
            self.finish(target, Ok(()));
            return;
        };

        debug!(dark = target, "Starting animated theme transition");
        let surface = Rc::clone(&self.inner.surface);
        let ready = animator.start(Box::new(move || surface.set_dark(target)));
        self.inner.state.borrow_mut().phase = Phase::Transitioning {
            target,
            ready,
        };
        self.schedule_poll();
    }

    fn schedule_poll(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.poll_scheduled {
                return;
            }
            state.poll_scheduled = true;
        }
        let weak: Weak<EngineInner> = Rc::downgrade(&self.inner);
        self.inner.reactor.schedule(move || {
            if let Some(inner) = weak.upgrade() {
                TransitionEngine { inner }.poll();
            }
        });
    }

    fn poll(&self) {
        let outcome = {
            let mut state = self.inner.state.borrow_mut();
            state.poll_scheduled = false;
            let Phase::Transitioning { target, ready } = &mut state.phase else {
                return;
            };
            match ready.try_recv() {
                Ok(result) => Some((*target, result)),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Closed) => Some((*target, Err(dropped_signal()))),
            }
        };

        match outcome {
            Some((target, result)) => self.finish(target, result),
            None => self.schedule_poll(),
        }
    }

    fn finish(&self, target: bool, result: anyhow::Result<()>) {
        if let Err(e) = result {
            warn!(dark = target, error = %e, "Animated theme transition failed, applying directly");
        }
        if self.inner.surface.is_dark() != target {
            self.inner.surface.set_dark(target);
        }

        let queued = {
            let mut state = self.inner.state.borrow_mut();
            state.phase = Phase::Idle;
            state.completions += 1;
            state.queued.take()
        };
        debug!(dark = target, "Theme transition complete");
        self.pulse();

        if let Some(next) = queued
            && next != target
        {
            self.start(next);
        }
    }

    fn pulse(&self) {
        let complete = &self.inner.complete;
        if complete.get() {
            complete.set(false);
        }
        complete.set(true);
        let complete = complete.clone();
        self.inner.reactor.schedule(move || complete.set(false));
    }
}

fn dropped_signal() -> anyhow::Error {
    anyhow!("transition hook dropped its ready signal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::task::{Context, Waker};

    /// Runs `apply` right away and hands out the sender so the test decides
    /// when (and how) the transition resolves
    #[derive(Default)]
    struct ManualAnimator {
        apply_eagerly: bool,
        senders: RefCell<Vec<oneshot::Sender<anyhow::Result<()>>>>,
        started: Cell<usize>,
    }

    impl ManualAnimator {
        fn eager() -> Rc<Self> {
            Rc::new(Self {
                apply_eagerly: true,
                ..Self::default()
            })
        }

        fn lazy() -> Rc<Self> {
            Rc::new(Self::default())
        }

        fn resolve(&self, result: anyhow::Result<()>) {
            let sender = self.senders.borrow_mut().remove(0);
            let _ = sender.send(result);
        }

        fn drop_sender(&self) {
            self.senders.borrow_mut().remove(0);
        }
    }

    impl AnimatedTransition for ManualAnimator {
        fn start(&self, apply: Box<dyn FnOnce()>) -> TransitionReady {
            self.started.set(self.started.get() + 1);
            if self.apply_eagerly {
                apply();
            }
            let (tx, rx) = oneshot::channel();
            self.senders.borrow_mut().push(tx);
            rx
        }
    }

    fn setup(animator: Option<Rc<ManualAnimator>>) -> (Environment, Rc<ClassList>, TransitionEngine) {
        let surface = Rc::new(ClassList::new());
        let mut env = Environment::headless().with_surface(surface.clone());
        if let Some(animator) = animator {
            env = env.with_animator(animator);
        }
        let engine = TransitionEngine::new(&env);
        (env, surface, engine)
    }

    #[test]
    fn test_bootstrap_applies_without_pulse() {
        let (env, surface, engine) = setup(None);
        engine.bootstrap(true);
        assert!(surface.contains(DARK_CLASS));
        assert!(!engine.is_complete());
        assert_eq!(engine.completions(), 0);
        assert_eq!(env.reactor().pending_tasks(), 0);
    }

    #[test]
    fn test_without_animator_applies_and_pulses_once() {
        let (env, surface, engine) = setup(None);
        engine.bootstrap(false);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = engine.subscribe_complete(move |v| s.borrow_mut().push(*v));

        engine.request(true);
        assert!(surface.is_dark());
        assert!(engine.is_complete());
        assert_eq!(engine.completions(), 1);
        assert_eq!(*seen.borrow(), vec![true]);

        env.reactor().tick();
        assert!(!engine.is_complete());
        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn test_repeated_request_is_ignored() {
        let (_env, _surface, engine) = setup(None);
        engine.bootstrap(false);
        engine.request(false);
        assert_eq!(engine.completions(), 0);
    }

    #[test]
    fn test_animator_success_completes_on_tick() {
        let animator = ManualAnimator::eager();
        let (env, surface, engine) = setup(Some(animator.clone()));
        engine.bootstrap(false);

        engine.request(true);
        assert!(engine.is_transitioning());
        assert!(surface.is_dark());
        assert!(!engine.is_complete());

        // Not ready yet: the poll reschedules itself
        env.reactor().tick();
        assert!(engine.is_transitioning());
        assert_eq!(env.reactor().pending_tasks(), 1);

        animator.resolve(Ok(()));
        env.reactor().tick();
        assert!(!engine.is_transitioning());
        assert!(engine.is_complete());
        assert_eq!(engine.completions(), 1);

        env.reactor().tick();
        assert!(!engine.is_complete());
    }

    #[test]
    fn test_animator_failure_still_applies_and_completes() {
        let animator = ManualAnimator::lazy();
        let (env, surface, engine) = setup(Some(animator.clone()));
        engine.bootstrap(false);

        engine.request(true);
        assert!(!surface.is_dark());
        animator.resolve(Err(anyhow!("animation aborted")));
        env.reactor().tick();

        assert!(surface.is_dark());
        assert!(engine.is_complete());
        assert_eq!(engine.completions(), 1);
    }

    #[test]
    fn test_dropped_ready_signal_counts_as_failure() {
        let animator = ManualAnimator::lazy();
        let (env, surface, engine) = setup(Some(animator.clone()));
        engine.bootstrap(true);

        engine.request(false);
        animator.drop_sender();
        env.reactor().tick();
        assert!(!surface.is_dark());
        assert_eq!(engine.completions(), 1);
    }

    #[test]
    fn test_overlapping_requests_latest_wins() {
        let animator = ManualAnimator::eager();
        let (env, surface, engine) = setup(Some(animator.clone()));
        engine.bootstrap(false);

        engine.request(true);
        engine.request(false);
        engine.request(true);
        engine.request(false);
        assert_eq!(animator.started.get(), 1);

        animator.resolve(Ok(()));
        env.reactor().tick();
        assert_eq!(engine.completions(), 1);
        // Queued `false` differs from the displayed `true`, so it runs next
        assert_eq!(animator.started.get(), 2);
        assert!(engine.is_transitioning());

        animator.resolve(Ok(()));
        env.reactor().tick();
        assert_eq!(engine.completions(), 2);
        assert!(!surface.is_dark());
        assert!(!engine.is_transitioning());
    }

    #[test]
    fn test_queued_request_matching_target_is_dropped() {
        let animator = ManualAnimator::eager();
        let (env, _surface, engine) = setup(Some(animator.clone()));
        engine.bootstrap(false);

        engine.request(true);
        engine.request(false);
        engine.request(true);
        animator.resolve(Ok(()));
        env.reactor().tick();

        assert_eq!(animator.started.get(), 1);
        assert_eq!(engine.completions(), 1);
        assert!(!engine.is_transitioning());
    }

    #[test]
    fn test_pulse_while_already_high_gives_fresh_edge() {
        let (_env, _surface, engine) = setup(None);
        engine.bootstrap(false);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = engine.subscribe_complete(move |v| s.borrow_mut().push(*v));

        engine.request(true);
        engine.request(false);
        assert_eq!(*seen.borrow(), vec![true, false, true]);
        assert_eq!(engine.completions(), 2);
    }

    #[tokio::test]
    async fn test_settle_awaits_ready_signal() {
        let animator = ManualAnimator::lazy();
        let (_env, surface, engine) = setup(Some(animator.clone()));
        engine.bootstrap(false);

        engine.request(true);
        animator.resolve(Ok(()));
        engine.settle().await;

        assert!(surface.is_dark());
        assert!(!engine.is_transitioning());
        assert_eq!(engine.completions(), 1);

        // Nothing in flight
        engine.settle().await;
        assert_eq!(engine.completions(), 1);
    }

    #[test]
    fn test_abandoned_settle_leaves_tick_poll_working() {
        let animator = ManualAnimator::lazy();
        let (env, surface, engine) = setup(Some(animator.clone()));
        engine.bootstrap(false);
        engine.request(true);

        {
            let mut settle = Box::pin(engine.settle());
            let mut cx = Context::from_waker(Waker::noop());
            assert!(settle.as_mut().poll(&mut cx).is_pending());
        }

        animator.resolve(Ok(()));
        env.reactor().tick();
        assert!(!engine.is_transitioning());
        assert_eq!(engine.completions(), 1);
        assert!(surface.is_dark());

        engine.request(false);
        assert_eq!(animator.started.get(), 2);
        animator.resolve(Ok(()));
        env.reactor().tick();
        assert_eq!(engine.completions(), 2);
        assert!(!surface.is_dark());
    }
}
