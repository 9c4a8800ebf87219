//! Input nodes
//!
//! Nodes that bring MT data into a workflow.

mod input_file;

pub use input_file::InputFileNode;
