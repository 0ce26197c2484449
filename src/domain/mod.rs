//! Domain layer types and invariants.

pub mod card;
pub mod catalog;
pub mod document;
pub mod episodes;
pub mod error;
pub mod finalize;
pub mod series;
pub mod values;
