//! Per-address admission control.

mod counter;
mod timer;

pub use counter::{AdmissionCounter, AdmissionStats};
pub use timer::ResetHandle;
