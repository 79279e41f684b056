//! Flowline Config
//!
//! This crate contains the serializable workflow definition types for Flowline.
//! These types describe a workflow as the editor saves it: a list of nodes, a
//! list of connections between them, and optional run settings.
//!
//! Definitions are loaded from JSON files (via the CLI) and turned into a
//! `flowline_workflow::Workflow` before they are sequenced and executed.

mod connection;
mod enums;
mod node;
mod workflow;

pub use connection::Connection;
pub use enums::RetryBackoff;
pub use node::{NodeDef, NodeType};
pub use workflow::WorkflowDef;
