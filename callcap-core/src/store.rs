//! The call record store.
//!
//! Keyed by leg id. Owns every record and, through them, every running
//! capture; nothing else keeps a record across events.

use std::collections::HashMap;

use tracing::debug;

use crate::record::CallRecord;

#[derive(Debug, Default)]
pub struct CallStore {
    records: HashMap<String, CallRecord>,
}

impl CallStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record unless its leg is already tracked. An existing record
    /// is never replaced; the rejected one is handed back.
    pub fn insert(&mut self, record: CallRecord) -> Result<(), CallRecord> {
        if self.records.contains_key(&record.leg_id) {
            return Err(record);
        }
        self.records.insert(record.leg_id.clone(), record);
        Ok(())
    }

    pub fn contains(&self, leg_id: &str) -> bool {
        self.records.contains_key(leg_id)
    }

    pub fn get(&self, leg_id: &str) -> Option<&CallRecord> {
        self.records.get(leg_id)
    }

    pub fn get_mut(&mut self, leg_id: &str) -> Option<&mut CallRecord> {
        self.records.get_mut(leg_id)
    }

    pub fn remove(&mut self, leg_id: &str) -> Option<CallRecord> {
        self.records.remove(leg_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn active_captures(&self) -> usize {
        self.records.values().filter(|r| r.has_active_capture()).count()
    }

    /// Stops every running capture and discards all records, in no
    /// particular order. Returns the names of the captures stopped.
    pub fn drain_captures(&mut self) -> Vec<String> {
        let mut stopped = Vec::new();
        for (leg_id, mut record) in self.records.drain() {
            if let Some(name) = record.stop_capture() {
                debug!("Stopped capture {} of leg {}", name, leg_id);
                stopped.push(name);
            }
        }
        stopped
    }
}
