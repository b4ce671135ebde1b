//! DVB-S2 PHY - Frame-level synchronization engine for DVB-S2(X) links
//!
//! Builds and strips PL frames (PLHEADER, pilots, PL scrambling) and
//! recovers them from an oversampled stream: coarse carrier PLL, matched
//! filter, Gardner timing, frame synchronization and pilot-aided fine
//! correction. FEC, demapping and interleaving live outside this crate;
//! XFEC symbols go in and come out.

use rustler::{Env, Term};

pub mod params;
pub mod error;
pub mod tables;
pub mod traits;
pub mod scrambler;
pub mod framer;
pub mod carriers;
pub mod pulse_shapes;
pub mod filters;
pub mod timing;
pub mod sync;
pub mod estimator;
pub mod io;
pub mod channel;
pub mod pipeline;
pub mod nif;
pub mod utils;

// Re-export core types for convenience
pub use error::{PhyError, PhyResult};
pub use params::{DvbS2Params, FrameGeometry, Modcod, Modulation, SyncConfig};
pub use traits::{Carrier, PulseShape, SampleSink, SampleSource, Synchronizer};
pub use scrambler::{BbScrambler, PlScrambler};
pub use framer::Framer;
pub use carriers::Nco;
pub use pulse_shapes::RootRaisedCosine;
pub use timing::TimingSync;
pub use sync::{CoarseFreqSync, FineSync, FrameSync, StepComposite};
pub use estimator::EsN0Estimator;
pub use io::RxStatus;
pub use pipeline::{Receiver, RxFrame, RxPhase, Transmitter};

fn on_load(env: Env, _info: Term) -> bool {
    let _ = rustler::resource!(nif::TxResource, env);
    let _ = rustler::resource!(nif::RxResource, env);
    true
}

rustler::init!(
    "Elixir.Dvbs2Phy.Native",
    [
        // Scramblers
        nif::bb_scramble,
        nif::pl_scramble,
        nif::pl_descramble,

        // Framer
        nif::framer_generate,
        nif::framer_remove_plh,
        nif::plheader,

        // Transmitter
        nif::tx_new,
        nif::tx_process,

        // Receiver
        nif::rx_new,
        nif::rx_process,
        nif::rx_reset,
    ],
    load = on_load
);
