//! callcap‑capture
//!
//! Per-call packet capture for callcap. Every capture is an independent
//! `tcpdump` process filtered on one media port; this crate starts, checks
//! and stops those processes and nothing else.
//!
//! The [`CaptureLauncher`] trait is the seam the call lifecycle uses, so the
//! state machine can run against [`DryRunLauncher`] when no capture should
//! actually happen.

pub mod dry_run;
pub mod error;
pub mod handle;
pub mod interface;
pub mod launcher;

pub use dry_run::{DryRunLauncher, DryRunStats};
pub use error::CaptureError;
pub use handle::CaptureHandle;
pub use interface::check_interface;
pub use launcher::{
    CaptureLauncher, CaptureProcess, CaptureRequest, Protocol, TcpdumpLauncher, DEFAULT_START_GRACE,
};
