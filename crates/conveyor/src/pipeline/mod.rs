//! Pipeline assembly and the operator runtime
//!
//! - [`Stream`]: wires a source, operators and a sink, then supervises them
//! - [`Operator`]: a running stage with one input and one output channel
//! - [`Kernel`]: the per-item function a [`KernelOperator`] runs on its workers
//! - [`Outcome`]: what a kernel asks the runtime to do with its result
//!
//! The free functions (`map`, `filter`, `execute`, ...) build kernel
//! operators for the common transformations.

pub mod kernels;
pub mod operator;
pub mod outcome;
pub mod stream;

pub use kernels::{
    execute, execute_async, filter, flat_map, map, restream_map, restream_slice, Execute,
    ExecuteAsync, Filter, FlatMap, Map, RestreamMap, RestreamSlice,
};
pub use operator::{Kernel, KernelOperator, Operator};
pub use outcome::{FilterOutcome, IntoOutcome, Outcome, StreamAction, StreamResult};
pub use stream::Stream;
