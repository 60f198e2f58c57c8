//! Input/output helpers.
//!
//! - numeric table ingest (`ingest`)
//! - estimate exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
