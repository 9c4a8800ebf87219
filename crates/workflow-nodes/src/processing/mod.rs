//! Processing nodes
//!
//! Nodes that compute on or unpack a processor state.

mod apparent_resistivity;
mod phase_tensor;
mod unpack;

pub use apparent_resistivity::ApparentResistivityNode;
pub use phase_tensor::PhaseTensorNode;
pub use unpack::UnpackDataNode;
