//! Hardware interaction modules
//!
//! Contains the motion/sensor interfaces and single-sample acquisition.

mod acquirer;
mod control;

pub use acquirer::SampleAcquirer;
pub use control::{Motion, ProbeSensor};

#[cfg(test)]
pub use control::MockMotion;
