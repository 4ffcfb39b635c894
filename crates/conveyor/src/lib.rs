//! In-process streaming data pipelines
//!
//! A pipeline is one [`Source`], an ordered chain of operators and one
//! terminal [`Sink`], connected by bounded channels. Every stage runs as its
//! own tokio task; a shared cancellation token stops them all, and closing a
//! stage's input closes its output once the stage has drained.
//!
//! Operators are built from small kernels (`map`, `filter`, `execute`, ...),
//! from window operators that batch items into `Vec<T>` windows, and from the
//! window kernels in [`aggregation`] that group, sum and sort those windows.
//! Items cross stages type-erased and are checked against each operator's
//! input type; mismatches are logged and dropped.
//!
//! ```rust,no_run
//! use conveyor::aggregation::sum_all_2d;
//! use conveyor::sink::CollectSink;
//! use conveyor::source::IterSource;
//! use conveyor::window::batch;
//! use conveyor::Stream;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> conveyor::Result<()> {
//! let sink = CollectSink::<f64>::new();
//! let totals = sink.collected();
//!
//! Stream::from_source(IterSource::new(vec![vec![10, 70, 20], vec![40, 60, 90]]))
//!     .run(batch::<Vec<i32>>())
//!     .run(sum_all_2d::<i32>())
//!     .into_sink(sink)
//!     .execute(&CancellationToken::new())
//!     .await?;
//!
//! assert_eq!(totals.take(), vec![290.0]);
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod channel;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod item;
pub mod log;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod stats;
pub mod window;

pub use channel::{item_channel, ItemReceiver, ItemSender, DEFAULT_CHANNEL_CAPACITY};
pub use completion::Completion;
pub use config::{OperatorConfig, StreamConfig};
pub use context::OperatorContext;
pub use error::{BoxError, KernelError, PipelineError, Result};
pub use item::{Item, Pair, StreamItem};
pub use log::{LogEmitter, LogEvent, LogLevel};
pub use stats::{OperatorStats, OperatorStatsSnapshot};

pub use pipeline::{
    execute, execute_async, filter, flat_map, map, restream_map, restream_slice, FilterOutcome,
    IntoOutcome, Kernel, KernelOperator, Operator, Outcome, Stream, StreamAction, StreamResult,
};

pub use window::{
    batch, window_by_duration, window_by_func, window_by_size, TriggerAll, TriggerByDuration,
    TriggerByFunc, TriggerBySize, TriggerResult, WindowContext, WindowOperator, WindowTrigger,
};

pub use sink::Sink;
pub use source::Source;
