//! Workflow Nodes
//!
//! Magnetotelluric processing nodes for the `node-engine` workflow graph.
//! Each node wraps one step of the MT pipeline; the numerics live behind
//! [`MtBackend`], supplied by the host.
//!
//! # Categories
//!
//! - **Input**: load a data file into a processor state
//! - **Processing**: phase tensor, apparent resistivity, dataset unpacking
//! - **Output**: terminal nodes that surface results
//!
//! Nodes are built directly or by type name through [`NodeCatalog`].

pub mod backend;
pub mod catalog;
pub mod input;
pub mod output;
pub mod processing;

#[cfg(test)]
mod test_support;

pub use backend::{datasets, stages, FileType, MtBackend, ProcessorState, SharedBackend};
pub use catalog::{NodeCatalog, NodeDescriptor, NodeFactory};
pub use input::*;
pub use output::*;
pub use processing::*;
