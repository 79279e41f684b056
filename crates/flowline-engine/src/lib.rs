//! Flowline Workflow Engine
//!
//! This crate runs workflows. It orders the nodes, dispatches each one to the
//! executor registered for its type and reports progress as events.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowRunner                         │
//! │  - owns mpsc channel (sender + receiver)                    │
//! │  - run(payload) queues an execution                         │
//! │  - start(cancel) runs the execution loop                    │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowEngine                         │
//! │  - execute(workflow, payload) → ExecutionResult             │
//! │  - topological order, one node at a time                    │
//! │  - emits ExecutionEvents through the notifier               │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                ExecutorRegistry / NodeExecutor              │
//! │  - one executor per node type                               │
//! │  - side effects inside durable, journaled steps             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use flowline_engine::{EngineConfig, WorkflowEngine};
//!
//! let config = EngineConfig::default().for_workflow(&workflow);
//! let engine = WorkflowEngine::new(config)?;
//!
//! let result = engine.execute(&workflow, payload).await?;
//! println!("{}", result.context.into_value());
//! ```

mod engine;
mod error;
mod events;
mod runner;

pub use engine::{EngineConfig, ExecutionResult, WorkflowEngine};
pub use error::EngineError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use runner::WorkflowRunner;
