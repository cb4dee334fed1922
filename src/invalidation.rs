use crate::host::{DevSession, HotPayload, Update};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifecycle of a stylesheet unit this plugin generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Generated once and known to the live module graph.
    Tracked,
    /// Marked stale after new candidates appeared; waiting on the Host to
    /// request it again.
    Invalidated,
    Regenerated,
}

/// Tracks generated stylesheet units and tells the live session which ones
/// went stale.
#[derive(Debug, Default)]
pub struct InvalidationCoordinator {
    units: Mutex<IndexMap<String, UnitState>>,
}

impl InvalidationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `id`. Returns `false` when it was already tracked.
    pub fn record_tracked(&self, id: &str) -> bool {
        let mut units = self.units.lock();
        if units.contains_key(id) {
            return false;
        }
        units.insert(id.to_string(), UnitState::Tracked);
        true
    }

    pub fn mark_regenerated(&self, id: &str) {
        if let Some(state) = self.units.lock().get_mut(id) {
            *state = UnitState::Regenerated;
        }
    }

    pub fn state(&self, id: &str) -> Option<UnitState> {
        self.units.lock().get(id).copied()
    }

    /// Tracked ids in the order they were first generated.
    pub fn tracked_ids(&self) -> Vec<String> {
        self.units.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.units.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.lock().is_empty()
    }

    /// Invalidates every tracked unit still present in the module graph and
    /// pushes one batched update for all of them. Units the graph no longer
    /// knows are dropped. Returns the number of updates sent.
    pub fn notify_if_changed(&self, session: &dyn DevSession) -> usize {
        let ids = self.tracked_ids();
        let timestamp = now_millis();
        let mut updates = Vec::new();

        for id in ids {
            let Some(module) = session.module_by_id(&id) else {
                tracing::debug!(unit = %id, "generated unit left the module graph, untracking");
                self.units.lock().shift_remove(&id);
                continue;
            };

            session.invalidate_module(&module);
            if let Some(state) = self.units.lock().get_mut(&id) {
                *state = UnitState::Invalidated;
            }
            updates.push(Update {
                kind: format!("{}-update", module.kind.as_str()),
                path: module.url.clone(),
                accepted_path: module.url,
                timestamp,
            });
        }

        let sent = updates.len();
        if sent > 0 {
            tracing::debug!(updates = sent, "sending stylesheet updates");
            session.send(HotPayload::Update { updates });
        }
        sent
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
