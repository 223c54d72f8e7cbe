//! # callcap ESL client
//!
//! Minimal FreeSWITCH event socket (inbound mode) client: authenticate,
//! subscribe to channel events, and hand them over as [`SignalEvent`]s.
//!
//! [`SignalEvent`]: callcap_core::events::SignalEvent

pub mod codec;
pub mod connection;
pub mod error;

pub use codec::{decode_frame, parse_event_plain, Frame};
pub use connection::EslConnection;
pub use error::EslError;
