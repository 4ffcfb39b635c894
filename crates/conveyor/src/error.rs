//! Error types for the stream engine
//!
//! Configuration errors are detected when a stream or stage is opened and
//! surface as the terminal error of the pipeline. Per-item errors never
//! terminate a pipeline: they are reported on the log bus and the operator
//! decides whether the item is forwarded or skipped.

use thiserror::Error;

/// Boxed error produced by user sources, sinks and kernels
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main engine error type
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The stream was opened without a source
    #[error("stream has no source")]
    SourceEmpty,

    /// The stream was opened without a sink
    #[error("stream has no sink")]
    SinkEmpty,

    /// A source has nothing to read from
    #[error("source input is undefined")]
    SourceInputUndefined,

    /// A stage was opened before its input channel was wired
    #[error("input channel is undefined")]
    InputChannelUndefined,

    /// A sink has nowhere to write to
    #[error("sink destination is undefined")]
    SinkDestinationUndefined,

    /// The stream's stages have already been consumed by an earlier open
    #[error("stream is empty")]
    StreamEmpty,

    /// The pipeline context was cancelled
    #[error("stream cancelled")]
    Cancelled,

    /// Invalid stage or stream configuration
    #[error("configuration error: {source}")]
    Configuration { source: BoxError },

    /// A stage failed while running
    #[error("execution error: {source}")]
    Execution { source: BoxError },

    /// A window kernel could not process its input
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// I/O errors from reader/writer adapters
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding/encoding errors
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    /// Build a configuration error from anything printable as an error
    pub fn configuration(source: impl Into<BoxError>) -> Self {
        PipelineError::Configuration {
            source: source.into(),
        }
    }

    /// Build an execution error from a user or runtime failure
    pub fn execution(source: impl Into<BoxError>) -> Self {
        PipelineError::Execution {
            source: source.into(),
        }
    }

    /// Whether this error is the cancellation of the pipeline context
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

/// Failures of window kernels (group/sum/sort) over a buffer
#[derive(Error, Debug)]
pub enum KernelError {
    /// A field-keyed kernel received something that is not a record
    #[error("item of type {type_name} is not a record")]
    NotARecord { type_name: String },

    /// The item could not be inspected through its serialized form
    #[error("cannot inspect item of type {type_name}: {reason}")]
    Inspection { type_name: String, reason: String },
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::execution(err)
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, PipelineError>;
