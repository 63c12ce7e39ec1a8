//! Per-user session actors and the registry that owns them.
//!
//! - `actor` -- `SessionActor` (one user's state machine and inbox loop) and
//!   its cloneable `SessionHandle`
//! - `registry` -- `SessionRegistry`: lazy creation, hydration, inactivity
//!   reaping and shutdown
//! - `greeting` -- the contextual help reply

pub mod actor;
pub mod greeting;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use crate::repository::{ReviewStore, SessionStore};
use crate::transport::Transport;

pub use actor::{Rejected, SessionActor, SessionHandle};
pub use registry::SessionRegistry;

/// Collaborators shared by every session actor.
pub struct SessionDeps<T, S, R> {
    pub transport: Arc<T>,
    pub sessions: Arc<S>,
    pub reviews: Arc<R>,
}

impl<T, S, R> SessionDeps<T, S, R>
where
    T: Transport,
    S: SessionStore,
    R: ReviewStore,
{
    pub fn new(transport: Arc<T>, sessions: Arc<S>, reviews: Arc<R>) -> Self {
        Self {
            transport,
            sessions,
            reviews,
        }
    }
}

impl<T, S, R> Clone for SessionDeps<T, S, R> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            sessions: Arc::clone(&self.sessions),
            reviews: Arc::clone(&self.reviews),
        }
    }
}
