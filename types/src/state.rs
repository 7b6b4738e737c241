use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{FocusTimer, TimerMode};

/// Snapshot of a user's timer as shown to connected clients. An absent
/// machine is reported as `idle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedTimerState {
    pub status: String,
    pub mode: Option<TimerMode>,
    pub category: Option<String>,
    pub clock_seconds: u32,
    pub current_cycle: u32,
    pub total_cycles: u32,
    pub on_break: bool,
    pub accumulated_seconds: u32,
}

impl SharedTimerState {
    pub fn idle() -> Self {
        SharedTimerState {
            status: "idle".to_string(),
            mode: None,
            category: None,
            clock_seconds: 0,
            current_cycle: 0,
            total_cycles: 0,
            on_break: false,
            accumulated_seconds: 0,
        }
    }

    pub fn from_timer(timer: &FocusTimer) -> Self {
        SharedTimerState {
            status: timer.status.as_ref().to_string(),
            mode: Some(timer.mode),
            category: Some(timer.category.clone()),
            clock_seconds: timer.clock,
            current_cycle: timer.current_cycle,
            total_cycles: timer.total_cycles(),
            on_break: timer.on_break,
            accumulated_seconds: timer.accumulated_work,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickUpdate {
    pub clock_seconds: u32,
    pub current_cycle: u32,
    pub on_break: bool,
}

impl From<&SharedTimerState> for TickUpdate {
    fn from(state: &SharedTimerState) -> Self {
        TickUpdate {
            clock_seconds: state.clock_seconds,
            current_cycle: state.current_cycle,
            on_break: state.on_break,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timestamped<T> {
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

impl<T> Timestamped<T> {
    pub fn new(data: T) -> Self {
        Timestamped {
            timestamp: Utc::now(),
            data,
        }
    }
}
