//! Γ₁ Graphs
//!
//! A Γ₁ graph has at most one incoming and at most one outgoing edge per
//! node, i.e. it is a disjoint union of simple paths and cycles. The edge
//! two-colouring of a Γ₂ graph produces two of these, and the embedder
//! consumes their edges one by one.
//!
//! Nodes are stored in an arena; parent/child slots hold node indices.

/// Single node of a Γ₁ graph.
///
/// The node number used by the construction is `index + 1`.
#[derive(Debug, Clone, Default)]
pub struct Gamma1Node {
    /// Index of the node with an edge into this one.
    pub parent: Option<usize>,
    /// Index of the node this one has an edge to.
    pub child: Option<usize>,
    /// True if the node corresponds to a circuit output.
    pub is_output: bool,
    /// True once the edge leaving this node has been embedded.
    pub is_embedded: bool,
}

/// Γ₁ graph: an arena of nodes with in-degree and out-degree at most one.
#[derive(Debug, Clone, Default)]
pub struct Gamma1 {
    pub nodes: Vec<Gamma1Node>,
}

impl Gamma1 {
    /// Create a Γ₁ graph with `num` isolated nodes.
    pub fn new(num: usize) -> Self {
        Self {
            nodes: vec![Gamma1Node::default(); num],
        }
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create an edge from node `a` to node `b` if both slots are free.
    ///
    /// A slot conflict means the caller violated the degree-1 invariant;
    /// it is logged and the edge is dropped, matching the tolerant
    /// behaviour the colouring relies on.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if self.nodes[a].child.is_none() && self.nodes[b].parent.is_none() {
            self.nodes[a].child = Some(b);
            self.nodes[b].parent = Some(a);
        } else {
            log::error!("gamma1: failed edge insert {} -> {}", a + 1, b + 1);
        }
    }

    /// Delete the last node of the graph.
    ///
    /// Used by the colouring in the odd-parity case to drop the parent-less
    /// leftover node of the larger Γ₁.
    pub fn delete_last_node(&mut self) {
        self.nodes.pop();
    }
}
