//! Leg correlation.
//!
//! Decides, at leg creation time, whether a leg belongs to a monitored call:
//! inbound legs by their numbers, outbound legs by the tracked leg they were
//! bridged from. The decision is made once per leg and never revisited, so an
//! outbound leg seen before its inbound sibling stays untracked.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::events::{headers, Direction, SignalEvent};
use crate::record::{call_time, CallRecord, DEFAULT_SESSION_ID};
use crate::store::CallStore;

/// Why a leg-creation event did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    MissingLegId,
    AlreadyTracked,
    NotMonitored,
    /// Outbound leg whose other leg is not tracked.
    Unrelated,
    UnknownDirection(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// An inbound leg on a monitored number; starts a logical call.
    Tracked { leg_id: String, session_id: String },
    /// An outbound leg joined to a tracked leg's call. `linked` is false when
    /// the tracked leg already had a sibling; the new leg then only shares
    /// the session.
    Joined {
        leg_id: String,
        other_leg_id: String,
        session_id: String,
        linked: bool,
    },
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Default)]
pub struct LegCorrelator {
    monitored: HashSet<String>,
}

impl LegCorrelator {
    pub fn new<I, S>(numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            monitored: numbers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_monitored(&self, number: &str) -> bool {
        !number.is_empty() && self.monitored.contains(number)
    }

    /// Handles a leg-creation event.
    pub fn on_leg_created(&self, store: &mut CallStore, event: &SignalEvent) -> Correlation {
        let Some(leg_id) = event.leg_id() else {
            return Correlation::Ignored(IgnoreReason::MissingLegId);
        };

        let raw_direction = event.header(headers::CALLER_DIRECTION);
        match raw_direction.and_then(Direction::parse) {
            Some(Direction::Inbound) => self.track_inbound(store, leg_id, event),
            Some(Direction::Outbound) => self.join_outbound(store, leg_id, event),
            None => {
                debug!("Leg {} has unknown direction {:?}", leg_id, raw_direction);
                Correlation::Ignored(IgnoreReason::UnknownDirection(
                    raw_direction.map(str::to_string),
                ))
            }
        }
    }

    fn track_inbound(&self, store: &mut CallStore, leg_id: &str, event: &SignalEvent) -> Correlation {
        let caller = event.header(headers::CALLER_NUMBER).unwrap_or_default();
        let called = event.header(headers::DESTINATION_NUMBER).unwrap_or_default();

        if !self.is_monitored(caller) && !self.is_monitored(called) {
            return Correlation::Ignored(IgnoreReason::NotMonitored);
        }
        if store.contains(leg_id) {
            return Correlation::Ignored(IgnoreReason::AlreadyTracked);
        }

        let session_id = event
            .header(headers::SESSION_ID)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID);
        let record = CallRecord::new(
            leg_id,
            session_id,
            Direction::Inbound,
            caller,
            called,
            call_time(event.header(headers::EVENT_DATE_LOCAL)),
        );
        if store.insert(record).is_err() {
            return Correlation::Ignored(IgnoreReason::AlreadyTracked);
        }

        info!(
            "{} locked the number. caller:{} callee:{}",
            session_id, caller, called
        );
        Correlation::Tracked {
            leg_id: leg_id.to_string(),
            session_id: session_id.to_string(),
        }
    }

    fn join_outbound(&self, store: &mut CallStore, leg_id: &str, event: &SignalEvent) -> Correlation {
        let Some(other_leg_id) = event
            .header(headers::OTHER_LEG_UNIQUE_ID)
            .filter(|id| !id.is_empty())
        else {
            return Correlation::Ignored(IgnoreReason::Unrelated);
        };
        if store.contains(leg_id) {
            return Correlation::Ignored(IgnoreReason::AlreadyTracked);
        }
        let Some(other) = store.get_mut(other_leg_id) else {
            return Correlation::Ignored(IgnoreReason::Unrelated);
        };

        let session_id = other.session_id.clone();
        // A leg acquires its sibling once; later legs of the same call only
        // share the session.
        let linked = other.sibling_leg_id.is_none();
        if linked {
            other.sibling_leg_id = Some(leg_id.to_string());
        }

        let caller = event.header(headers::CALLER_NUMBER).unwrap_or_default();
        let called = event.header(headers::CALLEE_NUMBER).unwrap_or_default();
        let mut record = CallRecord::new(
            leg_id,
            session_id.as_str(),
            Direction::Outbound,
            caller,
            called,
            call_time(event.header(headers::EVENT_DATE_LOCAL)),
        );
        if linked {
            record.sibling_leg_id = Some(other_leg_id.to_string());
        }
        // leg_id was checked above and the store is exclusively borrowed.
        let _ = store.insert(record);

        debug!(
            "{} associated the number. caller:{} callee:{}",
            session_id, caller, called
        );
        Correlation::Joined {
            leg_id: leg_id.to_string(),
            other_leg_id: other_leg_id.to_string(),
            session_id,
            linked,
        }
    }
}
