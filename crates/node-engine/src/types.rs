//! Core types for workflow graphs
//!
//! These types define the vocabulary shared by nodes, the connection
//! registry and the scheduler: identifiers, port types, connections and the
//! value maps that flow between nodes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Name of a port, unique within one direction of one node
pub type PortId = String;

/// Values keyed by port name, as consumed and produced by a node
pub type PortValues = HashMap<PortId, serde_json::Value>;

/// Open parameter bag attached to every node
pub type Parameters = HashMap<String, serde_json::Value>;

/// Port declarations for one direction (port name -> type)
pub type PortMap = BTreeMap<PortId, PortType>;

/// Kind of data a concrete port carries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// MT processor state handed from one processing stage to the next
    Processor,
    /// Ordered collection (periods, site names, matrices)
    List,
    /// Numeric scalar
    Number,
    /// Text string
    Text,
    /// Arbitrary JSON object
    Json,
    /// Kind defined outside this crate
    Custom(String),
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processor => write!(f, "processor"),
            Self::List => write!(f, "list"),
            Self::Number => write!(f, "number"),
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// The declared type of a port
///
/// `Any` on an input port accepts every source type. Everything else is
/// compared by structural identity, with no subtyping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    /// Accepts any type
    Any,
    /// A specific data kind
    Concrete(DataKind),
}

impl PortType {
    /// Check whether an input port of this type accepts data declared as `source`
    pub fn accepts(&self, source: &PortType) -> bool {
        matches!(self, PortType::Any) || self == source
    }
}

impl From<DataKind> for PortType {
    fn from(kind: DataKind) -> Self {
        PortType::Concrete(kind)
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Concrete(kind) => write!(f, "{}", kind),
        }
    }
}

/// Direction of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Category of a node, used for palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Input nodes (file readers, constants)
    Input,
    /// Processing nodes (tensor and resistivity computations, unpacking)
    Processing,
    /// Output nodes (display, export)
    Output,
}

/// A directed edge from one node's output port to another node's input port
///
/// Identity is the four path fields. `data_type` is the source port's type
/// captured when the connection was made and does not take part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Source node ID
    pub source_node_id: NodeId,
    /// Source (output) port
    pub source_port: PortId,
    /// Target node ID
    pub target_node_id: NodeId,
    /// Target (input) port
    pub target_port: PortId,
    /// Type declared by the source port at creation time
    pub data_type: PortType,
}

impl Connection {
    /// Create a connection
    pub fn new(
        source_node_id: impl Into<String>,
        source_port: impl Into<String>,
        target_node_id: impl Into<String>,
        target_port: impl Into<String>,
        data_type: PortType,
    ) -> Self {
        Self {
            source_node_id: source_node_id.into(),
            source_port: source_port.into(),
            target_node_id: target_node_id.into(),
            target_port: target_port.into(),
            data_type,
        }
    }

    /// Check whether this connection has the given path
    pub fn matches(
        &self,
        source_node_id: &str,
        source_port: &str,
        target_node_id: &str,
        target_port: &str,
    ) -> bool {
        self.source_node_id == source_node_id
            && self.source_port == source_port
            && self.target_node_id == target_node_id
            && self.target_port == target_port
    }

    /// Check whether the node is either endpoint of this connection
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.matches(
            &other.source_node_id,
            &other.source_port,
            &other.target_node_id,
            &other.target_port,
        )
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source_node_id.hash(state);
        self.source_port.hash(state);
        self.target_node_id.hash(state);
        self.target_port.hash(state);
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source_node_id, self.source_port, self.target_node_id, self.target_port
        )
    }
}
