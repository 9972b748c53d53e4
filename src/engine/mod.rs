//! The intake pipeline: the diagnosis rule engine and the submission
//! service wrapped around it.

pub mod diagnosis;
pub mod intake;

pub use diagnosis::*;
pub use intake::*;
