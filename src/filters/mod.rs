//! Interpolation, delay and gain blocks used by the synchronizers

mod agc;
mod farrow;
mod variable_delay;

pub use agc::Agc;
pub use farrow::{farrow_branches, horner, FarrowFilter};
pub use variable_delay::VariableDelay;
