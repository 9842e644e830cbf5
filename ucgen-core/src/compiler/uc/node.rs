//! Universal Circuit Nodes
//!
//! Every atomic unit of the emitted circuit — poles, switches, recursion
//! points — is a [`UcNode`] living in a single [`NodeArena`]. Blocks, chains
//! and child EUGs refer to nodes by arena id, so recursion points shared
//! between adjacent blocks (and reused as the poles of the nested EUG) are a
//! single entry referenced from all sides, and tear-down is the flat drop of
//! one vector.

use smallvec::SmallVec;

/// Arena id of a UC node.
pub type NodeId = usize;

/// Placeholder for unused permutation slots.
pub const DUMMY: u32 = u32::MAX;

/// Switch classification of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Designated node mapping 1-to-1 to an input, gate or output.
    Pole,
    /// 2-in/2-out programmable crossbar.
    XSwitch,
    /// 2-in/1-out selector.
    YSwitch,
    /// 1-in/2-out duplicator.
    ReverseYSwitch,
    /// 1-in/1-out wire, absorbed at emission.
    ISwitch,
    /// Boundary node between two blocks, pole of the nested EUG.
    RecursionPoint,
}

/// Role of a pole within the original circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoleType {
    Input,
    Gate,
    Output,
    NoPole,
}

/// One node of the universal circuit.
#[derive(Debug, Clone)]
pub struct UcNode {
    /// Construction-local id (pole number, or switch index within a block).
    pub id: u32,
    pub node_type: NodeType,
    pub pole_type: PoleType,
    pub parents: SmallVec<[NodeId; 2]>,
    pub children: SmallVec<[NodeId; 2]>,
    /// One bit for switches and recursion points, four for gate poles.
    pub control_bits: SmallVec<[u16; 4]>,
    pub edge_embedded: bool,
    pub topological_number: u32,
    pub topological_visited: bool,
    /// Running wire-number offset accumulated from X and absorbed I nodes.
    pub additional_wires: i64,
}

/// Arena of all UC nodes.
#[derive(Debug, Default)]
pub struct NodeArena {
    pub nodes: Vec<UcNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of nodes in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a node and return its arena id.
    pub fn add(&mut self, id: u32, node_type: NodeType) -> NodeId {
        let mut control_bits = SmallVec::new();
        if matches!(
            node_type,
            NodeType::YSwitch | NodeType::XSwitch | NodeType::RecursionPoint
        ) {
            control_bits.push(0);
        }
        self.nodes.push(UcNode {
            id,
            node_type,
            pole_type: PoleType::NoPole,
            parents: SmallVec::new(),
            children: SmallVec::new(),
            control_bits,
            edge_embedded: false,
            topological_number: 0,
            topological_visited: false,
            additional_wires: 0,
        });
        self.nodes.len() - 1
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &UcNode {
        &self.nodes[id]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut UcNode {
        &mut self.nodes[id]
    }

    /// Create an edge between two nodes.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.push(child);
        self.nodes[child].parents.push(parent);
    }

    /// Set the single control bit of a switch.
    pub fn set_control_bit(&mut self, id: NodeId, bit: u16) {
        let node = &mut self.nodes[id];
        node.control_bits.clear();
        node.control_bits.push(bit);
    }

    /// Remove all incoming edges of `id` (input poles).
    ///
    /// Every parent loses a child and its switch type contracts: an X
    /// becomes a Y, a reverse-Y an I.
    pub fn clear_parents(&mut self, id: NodeId) {
        let parents: Vec<NodeId> = self.nodes[id].parents.iter().copied().collect();
        for parent in parents {
            self.remove_child(parent, id);
        }
        self.nodes[id].parents.clear();
    }

    /// Remove all outgoing edges of `id` (output poles).
    ///
    /// Every child loses a parent: an X becomes a reverse-Y, a Y an I.
    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.nodes[id].children.iter().copied().collect();
        for child in children {
            self.remove_parent(child, id);
        }
        self.nodes[id].children.clear();
    }

    fn remove_child(&mut self, node: NodeId, _child: NodeId) {
        match self.nodes[node].node_type {
            NodeType::XSwitch => self.nodes[node].node_type = NodeType::YSwitch,
            NodeType::ReverseYSwitch => self.nodes[node].node_type = NodeType::ISwitch,
            other => {
                log::warn!("remove_child on a {:?} node", other);
            }
        }

        // The construction relies on the lower output X of the four-pole
        // gadget inverting when it loses its pole-side child.
        if self.nodes[node].id == 10 && !self.nodes[node].control_bits.is_empty() {
            self.nodes[node].control_bits[0] = 1 - self.nodes[node].control_bits[0];
        }

        let is_input_pole = |arena: &Self, id: NodeId| {
            arena.nodes[id].node_type == NodeType::Pole
                && arena.nodes[id].pole_type == PoleType::Input
        };
        if !self.nodes[node].children.is_empty() {
            let first = self.nodes[node].children[0];
            if is_input_pole(self, first) {
                self.nodes[node].children.remove(0);
            }
        }
        if self.nodes[node].children.len() > 1 {
            let second = self.nodes[node].children[1];
            if is_input_pole(self, second) {
                self.nodes[node].children.remove(1);
            }
        }
    }

    fn remove_parent(&mut self, node: NodeId, _parent: NodeId) {
        match self.nodes[node].node_type {
            NodeType::XSwitch => self.nodes[node].node_type = NodeType::ReverseYSwitch,
            NodeType::YSwitch => self.nodes[node].node_type = NodeType::ISwitch,
            other => {
                log::warn!("remove_parent on a {:?} node", other);
            }
        }

        let is_output_pole = |arena: &Self, id: NodeId| {
            arena.nodes[id].node_type == NodeType::Pole
                && arena.nodes[id].pole_type == PoleType::Output
        };
        if !self.nodes[node].parents.is_empty() {
            let first = self.nodes[node].parents[0];
            if is_output_pole(self, first) {
                self.nodes[node].parents.remove(0);
            }
        }
        if self.nodes[node].parents.len() > 1 {
            let second = self.nodes[node].parents[1];
            if is_output_pole(self, second) {
                self.nodes[node].parents.remove(1);
            }
        }
    }

    /// The wire number feeding `child` from this node.
    ///
    /// One-parent nodes are absorbed wires: they delegate to their parent.
    /// An X-switch exposes two consecutive wires, the second one for its
    /// second child.
    pub fn input_wire(&self, node: NodeId, child: NodeId) -> u32 {
        let n = &self.nodes[node];
        let wire = (n.topological_number as i64 + n.additional_wires) as u32;
        if n.parents.is_empty() {
            return wire;
        }
        if n.parents.len() == 1 {
            return self.input_wire(n.parents[0], node);
        }
        if n.children.len() <= 1 || n.node_type == NodeType::Pole {
            return wire;
        }
        if n.children[0] == child {
            return wire;
        }
        wire + 1
    }
}
