//! Training data: the validated store and a synthetic table generator.

pub mod sample;
pub mod store;

pub use sample::*;
pub use store::*;
