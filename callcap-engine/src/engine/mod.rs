mod dispatcher;
mod error;
mod runtime;
mod shutdown;

pub use self::{
    dispatcher::{Dispatched, Dispatcher},
    error::EngineError,
    runtime::{spawn_signal_listener, CaptureRuntime, RunSummary},
    shutdown::{RuntimeState, ShutdownCoordinator, StopReason},
};

pub mod prelude {
    pub use super::{CaptureRuntime, Dispatcher, EngineError, ShutdownCoordinator};
}
