use std::sync::Arc;

use workproof_ledger::Miner;
use workproof_tracker::Tracker;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
    pub miner: Arc<Miner>,
    /// Agent id stamped on records ingested from session events.
    pub agent_id: Arc<str>,
}

impl AppState {
    pub fn new(tracker: Arc<Tracker>, miner: Arc<Miner>, agent_id: impl Into<Arc<str>>) -> Self {
        Self {
            tracker,
            miner,
            agent_id: agent_id.into(),
        }
    }
}
