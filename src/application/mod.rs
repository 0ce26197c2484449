//! Application services: runtime context, configuration store, merger and
//! preview orchestration.

pub mod collaborators;
pub mod context;
pub mod error;
pub mod fields;
pub(crate) mod lock;
pub mod merge;
pub mod preview;
pub mod search;
pub mod store;
