//! Dataflow primitives shared by every domain
//!
//! - **[`Relay`]** - typed event streaming to any number of subscribers
//! - **[`Actor`]** - single-value state owned by a cancellable processing loop
//!
//! Relays follow the `{source}_{event}_relay` naming pattern.

pub mod actor;
pub mod relay;

pub use actor::Actor;
pub use relay::{Relay, relay};
