//! Generic configuration session
//!
//! A session is the single owner of one persisted config value and one
//! transient runtime value. Reads go through accessors, writes go through
//! [`ConfigSession::patch`], [`ConfigSession::patch_runtime`] and
//! [`ConfigSession::reset`]. Each write runs inside a reactor batch: the value
//! is committed, then mirrored to storage, then subscribers are notified, so
//! anyone who sees the new value knows the write was already issued.

use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

use crate::environment::Environment;
use crate::persistence::{MergeDefaults, PersistenceAdapter};
use crate::reactive::{Observable, Reactor};

/// A persisted preference record owned by a [`ConfigSession`]
pub trait SessionConfig: MergeDefaults + Serialize + PartialEq + Debug + 'static {
    /// Fixed storage key for this record
    const STORAGE_KEY: &'static str;

    /// Transient state seeded from the config, never persisted
    type Runtime: Clone + PartialEq + Debug + 'static;

    /// A fresh default value
    fn defaults() -> Self;

    fn initial_runtime(&self) -> Self::Runtime;
}

pub struct ConfigSession<C: SessionConfig> {
    config: Observable<C>,
    runtime: Observable<C::Runtime>,
    persistence: PersistenceAdapter,
    reactor: Reactor,
}

impl<C: SessionConfig> Debug for ConfigSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSession")
            .field("key", &C::STORAGE_KEY)
            .field("config", &self.config)
            .field("runtime", &self.runtime)
            .field("persistence", &self.persistence)
            .finish()
    }
}

impl<C: SessionConfig> ConfigSession<C> {
    /// Load (or default) the config and seed the runtime state from it.
    ///
    /// Construction never writes to storage.
    pub fn new(env: &Environment) -> Self {
        let persistence = env.persistence();
        let config = persistence.load_merged(C::STORAGE_KEY, &C::defaults());
        let runtime = config.initial_runtime();
        info!(key = C::STORAGE_KEY, durable = persistence.is_durable(), "Configuration session ready");
        let reactor = env.reactor().clone();
        Self {
            config: Observable::new(config, &reactor),
            runtime: Observable::new(runtime, &reactor),
            persistence,
            reactor,
        }
    }

    /// Read the stored record merged over defaults.
    ///
    /// Corrupt records are cleared; this never fails.
    pub fn load(&self) -> C {
        self.persistence.load_merged(C::STORAGE_KEY, &C::defaults())
    }

    pub fn config(&self) -> C {
        self.config.get()
    }

    pub fn with_config<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        self.config.with(f)
    }

    pub fn runtime(&self) -> C::Runtime {
        self.runtime.get()
    }

    pub fn with_runtime<R>(&self, f: impl FnOnce(&C::Runtime) -> R) -> R {
        self.runtime.with(f)
    }

    /// Replace the config with `mutator(current)` and write it through.
    pub fn patch(&self, mutator: impl FnOnce(C) -> C) {
        let _batch = self.reactor.batch();
        let next = mutator(self.config.get());
        self.config.set(next);
        self.config
            .with(|config| self.persistence.save(C::STORAGE_KEY, config));
    }

    /// Update the runtime state in place. Never persisted.
    pub fn patch_runtime(&self, mutator: impl FnOnce(&mut C::Runtime)) {
        let _batch = self.reactor.batch();
        self.runtime.update(mutator);
    }

    /// Restore defaults, reseed the runtime state and clear the stored record.
    pub fn reset(&self) {
        let _batch = self.reactor.batch();
        let defaults = C::defaults();
        let runtime = defaults.initial_runtime();
        self.config.set(defaults);
        self.runtime.set(runtime);
        self.persistence.clear(C::STORAGE_KEY);
        debug!(key = C::STORAGE_KEY, "Configuration reset to defaults");
    }

    pub fn config_observable(&self) -> &Observable<C> {
        &self.config
    }

    pub fn runtime_observable(&self) -> &Observable<C::Runtime> {
        &self.runtime
    }

    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.persistence
    }
}
