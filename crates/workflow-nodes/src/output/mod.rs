//! Output nodes
//!
//! Terminal nodes that surface results.

mod format_output;
mod processor_output;
mod resistivity_plot;

pub use format_output::OutputFormatNode;
pub use processor_output::OutputProcessorNode;
pub use resistivity_plot::ResistivityPlotNode;
