//! Window triggers
//!
//! A trigger is evaluated once per admitted item and decides whether the
//! current window closes. Triggers run only at admission time; a window
//! never closes on its own while no item arrives.

use super::types::{TriggerResult, WindowContext};
use crate::context::OperatorContext;
use crate::error::{PipelineError, Result};
use chrono::Duration;
use std::fmt;

/// Decides when a window closes
pub trait WindowTrigger<T>: Send + fmt::Debug {
    /// Evaluate after `window.item` was admitted to the buffer
    fn on_item(&mut self, ctx: &OperatorContext, window: &WindowContext<'_, T>) -> TriggerResult;

    /// Checked once before the operator starts
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Never fires: the whole stream becomes one window, flushed at end of input
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerAll;

impl TriggerAll {
    pub fn new() -> Self {
        Self
    }
}

impl<T> WindowTrigger<T> for TriggerAll {
    fn on_item(&mut self, _ctx: &OperatorContext, _window: &WindowContext<'_, T>) -> TriggerResult {
        TriggerResult::Continue
    }
}

/// Fires once the window holds `size` items
///
/// The item that brings the count to `size` is part of the window that
/// closes.
#[derive(Debug, Clone, Copy)]
pub struct TriggerBySize {
    size: u64,
}

impl TriggerBySize {
    pub fn new(size: u64) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl<T> WindowTrigger<T> for TriggerBySize {
    fn on_item(&mut self, _ctx: &OperatorContext, window: &WindowContext<'_, T>) -> TriggerResult {
        (window.window_item_count >= self.size).into()
    }

    fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(PipelineError::configuration(
                "window size must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Fires on the first admission at least `duration` after the window opened
#[derive(Debug, Clone, Copy)]
pub struct TriggerByDuration {
    duration: Duration,
}

impl TriggerByDuration {
    /// Durations too large for a calendar duration never fire
    pub fn new(duration: std::time::Duration) -> Self {
        Self {
            duration: Duration::from_std(duration).unwrap_or(Duration::MAX),
        }
    }

    pub fn from_chrono(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl<T> WindowTrigger<T> for TriggerByDuration {
    fn on_item(&mut self, _ctx: &OperatorContext, window: &WindowContext<'_, T>) -> TriggerResult {
        (window.window_age() >= self.duration).into()
    }
}

/// User predicate over the window state
pub struct TriggerByFunc<F> {
    func: F,
}

impl<F> TriggerByFunc<F> {
    pub fn new<T>(func: F) -> Self
    where
        F: Fn(&OperatorContext, &WindowContext<'_, T>) -> bool + Send,
    {
        Self { func }
    }
}

impl<T, F> WindowTrigger<T> for TriggerByFunc<F>
where
    F: Fn(&OperatorContext, &WindowContext<'_, T>) -> bool + Send,
{
    fn on_item(&mut self, ctx: &OperatorContext, window: &WindowContext<'_, T>) -> TriggerResult {
        (self.func)(ctx, window).into()
    }
}

impl<F> fmt::Debug for TriggerByFunc<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerByFunc").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn window<'a>(
        start: DateTime<Utc>,
        count: u64,
        item: &'a i32,
        age: Duration,
    ) -> WindowContext<'a, i32> {
        WindowContext {
            operator_start_time: start,
            operator_item_count: count,
            window_start_time: start,
            window_item_count: count,
            item,
            item_admit_time: start + age,
        }
    }

    #[test]
    fn test_trigger_all_never_fires() {
        let ctx = OperatorContext::detached("batch");
        let now = Utc::now();
        let mut trigger = TriggerAll::new();
        for count in 1..100 {
            let w = window(now, count, &0, Duration::hours(count as i64));
            assert!(!trigger.on_item(&ctx, &w).is_fire());
        }
    }

    #[test]
    fn test_trigger_by_size_includes_boundary_item() {
        let ctx = OperatorContext::detached("window");
        let now = Utc::now();
        let mut trigger = TriggerBySize::new(3);

        assert!(!trigger.on_item(&ctx, &window(now, 2, &0, Duration::zero())).is_fire());
        assert!(trigger.on_item(&ctx, &window(now, 3, &0, Duration::zero())).is_fire());
    }

    #[test]
    fn test_trigger_by_size_rejects_zero() {
        let err = WindowTrigger::<i32>::validate(&TriggerBySize::new(0)).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
        assert!(WindowTrigger::<i32>::validate(&TriggerBySize::new(1)).is_ok());
    }

    #[test]
    fn test_trigger_by_duration() {
        let ctx = OperatorContext::detached("window");
        let now = Utc::now();
        let mut trigger = TriggerByDuration::new(std::time::Duration::from_secs(10));

        assert!(!trigger.on_item(&ctx, &window(now, 1, &0, Duration::seconds(9))).is_fire());
        assert!(trigger.on_item(&ctx, &window(now, 2, &0, Duration::seconds(10))).is_fire());
    }

    #[test]
    fn test_oversized_duration_never_fires() {
        let trigger = TriggerByDuration::new(std::time::Duration::MAX);
        assert_eq!(trigger.duration(), Duration::MAX);
    }

    #[test]
    fn test_trigger_by_func_sees_item() {
        let ctx = OperatorContext::detached("window");
        let now = Utc::now();
        let mut trigger = TriggerByFunc::new(|_: &OperatorContext, w: &WindowContext<'_, i32>| *w.item < 0);

        assert!(!trigger.on_item(&ctx, &window(now, 1, &5, Duration::zero())).is_fire());
        assert!(trigger.on_item(&ctx, &window(now, 2, &-1, Duration::zero())).is_fire());
    }
}
