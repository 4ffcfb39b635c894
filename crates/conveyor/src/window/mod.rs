//! Windowing and batching
//!
//! A window operator buffers admitted items and emits the buffer as a single
//! `Vec<T>` whenever its trigger fires. Four triggers ship with the crate:
//!
//! | Trigger             | Closes the window when                           |
//! |---------------------|--------------------------------------------------|
//! | `TriggerAll`        | never; the whole stream is one window (batch)    |
//! | `TriggerBySize(n)`  | the window holds `n` items                       |
//! | `TriggerByDuration` | an item is admitted `d` after the window opened  |
//! | `TriggerByFunc`     | a user predicate returns true                    |
//!
//! ```text
//! input:   A B C D E F G H I J          (window_by_size(4))
//! output:  [A B C D] [E F G H] [I J]    (tail flushed on close)
//! ```
//!
//! Duration windows are evaluated at admission only: a quiet stream keeps
//! its current window open until the next item or the end of input.

pub mod operator;
pub mod trigger;
pub mod types;

pub use operator::{batch, window_by_duration, window_by_func, window_by_size, WindowOperator};
pub use trigger::{TriggerAll, TriggerByDuration, TriggerByFunc, TriggerBySize, WindowTrigger};
pub use types::{TriggerResult, WindowContext};
