//! Window state exposed to triggers

use chrono::{DateTime, Duration, Utc};

/// Snapshot of a window operator, taken as each item is admitted
#[derive(Debug, Clone, Copy)]
pub struct WindowContext<'a, T> {
    /// When the operator started
    pub operator_start_time: DateTime<Utc>,
    /// Items admitted since the operator started, this one included
    pub operator_item_count: u64,
    /// When the current window opened: operator start, or the last flush
    pub window_start_time: DateTime<Utc>,
    /// Items in the current window, this one included
    pub window_item_count: u64,
    /// The item being admitted
    pub item: &'a T,
    /// When the item was admitted
    pub item_admit_time: DateTime<Utc>,
}

impl<'a, T> WindowContext<'a, T> {
    /// Time between the window opening and this admission
    pub fn window_age(&self) -> Duration {
        self.item_admit_time - self.window_start_time
    }

    /// Time between the operator starting and this admission
    pub fn operator_age(&self) -> Duration {
        self.item_admit_time - self.operator_start_time
    }
}

/// Result of trigger evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerResult {
    /// Keep accumulating
    Continue,
    /// Emit the buffer, the current item included, and open a new window
    Fire,
}

impl TriggerResult {
    pub fn is_fire(self) -> bool {
        self == TriggerResult::Fire
    }
}

impl From<bool> for TriggerResult {
    fn from(fire: bool) -> Self {
        if fire {
            TriggerResult::Fire
        } else {
            TriggerResult::Continue
        }
    }
}
