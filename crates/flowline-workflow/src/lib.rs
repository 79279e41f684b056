//! Flowline Workflow
//!
//! This crate provides the in-memory workflow graph for Flowline:
//!
//! - [`Workflow`] owns the node and connection lists and enforces the editing
//!   rules (one manual trigger, the initial placeholder is replaced on insert)
//! - [`Graph`] answers adjacency questions for display and analysis
//! - [`topological_sort`] turns nodes and connections into the linear order a
//!   run executes them in, or reports the cycle that prevents one

mod error;
mod graph;
mod sequence;
mod workflow;

pub use error::{SequenceError, WorkflowError};
pub use graph::Graph;
pub use sequence::topological_sort;
pub use workflow::Workflow;

pub use flowline_config::{Connection, NodeDef, NodeType, RetryBackoff, WorkflowDef};
