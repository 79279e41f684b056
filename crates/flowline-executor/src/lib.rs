//! Flowline Executors
//!
//! Every node type is handled by a [`NodeExecutor`]. An executor receives the
//! node's configuration, the context accumulated by earlier nodes and a
//! durable [`Step`](flowline_step::Step) capability, and returns the context
//! extended with its own output.
//!
//! Configuration problems are reported before any step runs and are never
//! retried. Work with side effects happens inside steps, so transient
//! failures are retried by the step runner rather than by the executor.

mod context;
mod error;
mod executor;
mod http;
mod registry;
pub mod template;
mod trigger;

pub use context::ExecutionContext;
pub use error::NodeError;
pub use executor::{ExecutorParams, NodeExecutor};
pub use http::{HttpMethod, HttpRequestConfig, HttpRequestExecutor, HttpResponse};
pub use registry::ExecutorRegistry;
pub use template::TemplateError;
pub use trigger::TriggerExecutor;
