//! Sample source / sink traits - the radio or file boundary

use num_complex::Complex64;

use crate::error::PhyResult;
use crate::io::RxStatus;

/// Producer of whole frames of complex samples
pub trait SampleSource: Send {
    /// Fill `frame` completely, or report why it could not be filled
    fn receive(&mut self, frame: &mut [Complex64]) -> PhyResult<RxStatus>;
}

/// Consumer of whole frames of complex samples
pub trait SampleSink: Send {
    fn send(&mut self, frame: &[Complex64]) -> PhyResult<()>;
}
