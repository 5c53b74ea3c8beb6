//! Observable value wrapper with change notification and version tracking.
//!
//! [`Observable<T>`] keeps its value in shared `Rc<RefCell<..>>` storage. When
//! the value changes (by `PartialEq`) every live subscriber is notified in
//! registration order, or, while the owning [`Reactor`] is batching, queued
//! until the batch ends.
//!
//! Subscribers registered with the same key through
//! [`Observable::subscribe_keyed`] are coalesced inside a batch, even across
//! different observables. Derived views use this to fire once per logical
//! update no matter how many of their inputs changed.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::Reactor;

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct Subscriber<T> {
    key: Option<usize>,
    callback: CallbackWeak<T>,
}

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Subscriber<T>>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning creates another handle to the same value and subscriber list.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Dead subscribers (dropped [`Subscription`] guards) are pruned lazily.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
    reactor: Reactor,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            reactor: self.reactor.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T, reactor: &Reactor) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
            reactor: reactor.clone(),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Modify the value in place, notifying subscribers if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let old = inner.value.clone();
            f(&mut inner.value);
            if inner.value != old {
                inner.version += 1;
                true
            } else {
                false
            }
        };
        if changed {
            self.notify();
        }
    }

    /// Subscribe to value changes.
    ///
    /// Dropping the returned guard unsubscribes the callback.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.register(None, callback)
    }

    /// Subscribe under a coalescing key. Within one batch, all pending
    /// notifications with the same key collapse into a single call.
    pub fn subscribe_keyed(&self, key: usize, callback: impl Fn(&T) + 'static) -> Subscription {
        self.register(Some(key), callback)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn register(&self, key: Option<usize>, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.inner.borrow_mut().subscribers.push(Subscriber {
            key,
            callback: Rc::downgrade(&strong),
        });
        Subscription {
            _guard: Box::new(strong),
        }
    }

    fn notify(&self) {
        // Collect first so no borrow is held while callbacks run.
        let callbacks: Vec<(usize, CallbackRc<T>)> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|s| s.callback.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(|s| {
                    let cb = s.callback.upgrade()?;
                    let key = s
                        .key
                        .unwrap_or_else(|| Rc::as_ptr(&cb) as *const () as usize);
                    Some((key, cb))
                })
                .collect()
        };

        if callbacks.is_empty() {
            return;
        }

        if self.reactor.is_batching() {
            for (key, cb) in callbacks {
                let source = self.clone();
                self.reactor.defer_or_run_keyed(key, move || {
                    let latest = source.get();
                    cb(&latest);
                });
            }
            return;
        }

        let value = self.get();
        for (_, cb) in &callbacks {
            cb(&value);
        }
    }
}

/// RAII guard for one or more subscriber callbacks.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl Subscription {
    /// Bundle several guards so they are dropped together.
    pub fn group(subscriptions: Vec<Subscription>) -> Self {
        Self {
            _guard: Box::new(subscriptions),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_set_notifies_on_change_only() {
        let reactor = Reactor::new();
        let obs = Observable::new(1, &reactor);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = obs.subscribe(move |_| h.set(h.get() + 1));

        obs.set(1);
        assert_eq!(hits.get(), 0);
        assert_eq!(obs.version(), 0);

        obs.set(2);
        assert_eq!(hits.get(), 1);
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn test_update_without_change_is_silent() {
        let reactor = Reactor::new();
        let obs = Observable::new(vec![1, 2], &reactor);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = obs.subscribe(move |_| h.set(h.get() + 1));

        obs.update(|v| v.sort());
        assert_eq!(hits.get(), 0);
        obs.update(|v| v.push(3));
        assert_eq!(hits.get(), 1);
        assert_eq!(obs.get(), vec![1, 2, 3]);
    }

    #[test]
    fn test_dropped_subscription_is_not_called() {
        let reactor = Reactor::new();
        let obs = Observable::new(0, &reactor);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = obs.subscribe(move |_| h.set(h.get() + 1));
        drop(sub);

        obs.set(5);
        assert_eq!(hits.get(), 0);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn test_batch_delivers_latest_value_once() {
        let reactor = Reactor::new();
        let obs = Observable::new(0, &reactor);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = obs.subscribe(move |v| s.borrow_mut().push(*v));
        {
            let _batch = reactor.batch();
            obs.set(1);
            obs.set(2);
            assert_eq!(obs.get(), 2);
            assert!(seen.borrow().is_empty());
        }
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_shared_key_coalesces_across_observables() {
        let reactor = Reactor::new();
        let a = Observable::new(0, &reactor);
        let b = Observable::new(false, &reactor);
        let hits = Rc::new(Cell::new(0));
        let (h1, h2) = (Rc::clone(&hits), Rc::clone(&hits));
        let _sa = a.subscribe_keyed(42, move |_| h1.set(h1.get() + 1));
        let _sb = b.subscribe_keyed(42, move |_| h2.set(h2.get() + 1));
        {
            let _batch = reactor.batch();
            a.set(1);
            b.set(true);
        }
        assert_eq!(hits.get(), 1);

        // Outside a batch every change is delivered on its own.
        a.set(2);
        b.set(false);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn test_clone_shares_state() {
        let reactor = Reactor::new();
        let a = Observable::new(String::from("x"), &reactor);
        let b = a.clone();
        b.set("y".to_string());
        assert_eq!(a.get(), "y");
        assert_eq!(a.with(|s| s.len()), 1);
    }
}
