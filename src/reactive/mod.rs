//! Dependency-tracked values for the configuration sessions
//!
//! - [`Observable`]: a shared value with change notification.
//! - [`Reactor`]: the explicit scheduling context. It coalesces notifications
//!   raised inside a batch and runs deferred work on the next tick.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). A session and all of
//! its observables share one `Reactor` handle.

mod observable;
mod reactor;

pub use observable::{Observable, Subscription};
pub use reactor::{BatchScope, Reactor};
