//! # callcap-core
//!
//! Call-leg correlation and capture lifecycle.
//!
//! A switch reports every call as independent legs. This crate rebuilds the
//! logical call out of those legs and decides when the capture of a leg's
//! media stream starts and stops.
//!
//! ### Key Submodules:
//! - `events`: header-addressed signaling events and the event source seam
//! - `store`: the call record store, sole owner of records and captures
//! - `correlator`: decides which new legs are tracked and links siblings
//! - `lifecycle`: starts captures on answer, stops them on hangup/shutdown

pub mod correlator;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod record;
pub mod store;

pub mod prelude {
    pub use crate::correlator::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::lifecycle::*;
    pub use crate::record::*;
    pub use crate::store::*;
}

pub use error::SourceError;
