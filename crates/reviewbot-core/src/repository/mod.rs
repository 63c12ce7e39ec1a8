//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (reviewbot-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod review;
pub mod session;

pub use review::ReviewStore;
pub use session::SessionStore;
