use std::sync::Arc;

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use sqlx::types::Uuid;
use tokio::task::JoinHandle;

use types::timer::FocusTimer;

/// In-memory store of each user's active timer and the task driving its
/// once-per-second ticks. Aborting the task stops the tick source, it
/// does not touch the machine.
#[derive(Clone, Default)]
pub struct ActiveTimerRepository {
    timers: Arc<DashMap<Uuid, FocusTimer>>,
    tickers: Arc<DashMap<Uuid, JoinHandle<()>>>,
}

impl ActiveTimerRepository {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&self, user_id: Uuid, timer: FocusTimer) {
        self.timers.insert(user_id, timer);
    }

    pub fn get(&self, user_id: Uuid) -> Option<FocusTimer> {
        self.timers.get(&user_id).map(|timer| timer.clone())
    }

    pub fn get_mut_lock(&self, user_id: Uuid) -> Option<RefMut<Uuid, FocusTimer>> {
        self.timers.get_mut(&user_id)
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.timers.contains_key(&user_id)
    }

    pub fn remove(&self, user_id: Uuid) -> Option<FocusTimer> {
        self.timers.remove(&user_id).map(|(_, timer)| timer)
    }

    pub fn set_ticker(&self, user_id: Uuid, handle: JoinHandle<()>) {
        if let Some(old) = self.tickers.insert(user_id, handle) {
            old.abort();
        }
    }

    pub fn stop_ticker(&self, user_id: Uuid) {
        if let Some((_, handle)) = self.tickers.remove(&user_id) {
            handle.abort();
        }
    }
}
