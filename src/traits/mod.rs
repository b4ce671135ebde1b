//! Core DSP traits for the PHY engine
//!
//! These traits describe the seams between pipeline stages, not the
//! DVB-S2 specifics. Each synchronizer family is a closed enum that also
//! implements [`Synchronizer`].

mod carrier;
mod pulse_shape;
mod sample_io;
mod synchronizer;

pub use carrier::Carrier;
pub use pulse_shape::PulseShape;
pub use sample_io::{SampleSink, SampleSource};
pub use synchronizer::Synchronizer;
