//! The entity index facade.
//!
//! [`EntityIndex`] is the public entry point of the engine: one ordered,
//! identity-addressed index of a single entity kind, backed by a node file or
//! held in memory.

mod batch;
mod cache;
mod facade;
mod iter;

pub use batch::IndexTransaction;
pub use facade::{CloseAction, EntityIndex};
pub use iter::{IdentityIter, OrderedIter};
