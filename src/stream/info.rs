//! Serializable routing-table snapshots

use serde::Serialize;

use crate::consumer::ConsumerInfo;
use crate::producer::{ProducerInfo, ProducerState};

/// Snapshot of one stream: producers with their state, active consumers
#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub name: String,
    pub producers: Vec<ProducerInfo>,
    pub consumers: Vec<ConsumerInfo>,
}

impl StreamInfo {
    /// Whether any producer currently holds a connection
    pub fn is_live(&self) -> bool {
        self.producers
            .iter()
            .any(|p| matches!(p.state, ProducerState::Connected | ProducerState::Reconnecting))
    }
}
