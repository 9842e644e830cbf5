//! Γ₂ Supergraphs and Their Recursive Splitting
//!
//! A Γ₂ graph has at most two incoming and at most two outgoing edges per
//! node. The supergraph of the circuit to compile is a Γ₂ graph whose node
//! order is a topological order of the circuit (inputs first, then gates,
//! then one appended node per output).
//!
//! This module implements:
//! - the Γ₂ arena graph itself, carrying per-gate truth tables,
//! - the edge two-colouring into two Γ₁ graphs via an Eulerian walk on the
//!   bipartite double cover,
//! - the recursive subgraph tree (2-way, and 4-way with its preprocessing
//!   colouring step) that the edge embedder consults,
//! - the parity-consistency sweep over the finished tree,
//! - a random topologically-ordered Γ₂ generator for stress tests.

use rand::Rng;

use crate::compiler::error::UcError;
use crate::compiler::gamma::gamma1::Gamma1;
use crate::compiler::hybrid::HybridChoice;

/// Single node of a Γ₂ graph.
///
/// All slot references are arena indices; the construction-facing node
/// number is `index + 1`.
#[derive(Debug, Clone)]
pub struct Gamma2Node {
    /// First child slot.
    pub left: Option<usize>,
    /// Second child slot.
    pub right: Option<usize>,
    /// First parent slot.
    pub left_parent: Option<usize>,
    /// Second parent slot.
    pub right_parent: Option<usize>,
    /// True if the node corresponds to a circuit output.
    pub output: bool,
    /// Four function bits describing the gate, indexed `f(left, right)`.
    /// The value 2 marks an undefined table.
    pub function_bits: [u16; 4],
    /// Set once the middle bits have been swapped during finalisation.
    pub bits_swapped: bool,
}

impl Gamma2Node {
    fn new() -> Self {
        Self {
            left: None,
            right: None,
            left_parent: None,
            right_parent: None,
            output: false,
            function_bits: [2, 2, 2, 2],
            bits_swapped: false,
        }
    }

    /// Set the four function bits of the node.
    pub fn set_function_bits(&mut self, c0: u16, c1: u16, c2: u16, c3: u16) {
        self.function_bits = [c0, c1, c2, c3];
    }
}

/// Γ₂ graph together with the split-tree data hanging off it.
///
/// `gamma1_left`/`gamma1_right` are the two colourings of this graph's own
/// edges; `sub_left`/`sub_right` are the child Γ₂ graphs obtained from them
/// during recursion. Ownership is tree-shaped: dropping the root drops the
/// entire split tree.
#[derive(Debug, Clone, Default)]
pub struct Gamma2 {
    pub nodes: Vec<Gamma2Node>,
    pub sub_left: Option<Box<Gamma2>>,
    pub sub_right: Option<Box<Gamma2>>,
    pub gamma1_left: Option<Gamma1>,
    pub gamma1_right: Option<Gamma1>,
}

impl Gamma2 {
    /// Create a Γ₂ graph with `num` isolated nodes.
    pub fn new(num: usize) -> Self {
        Self {
            nodes: (0..num).map(|_| Gamma2Node::new()).collect(),
            sub_left: None,
            sub_right: None,
            gamma1_left: None,
            gamma1_right: None,
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

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| usize::from(n.left.is_some()) + usize::from(n.right.is_some()))
            .sum()
    }

    /// Create an edge from node `a` to node `b`, taking the first free
    /// child slot of `a` and the first free parent slot of `b`.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if self.nodes[a].left.is_none() && self.nodes[b].left_parent.is_none() {
            self.nodes[a].left = Some(b);
            self.nodes[b].left_parent = Some(a);
        } else if self.nodes[a].left.is_none() && self.nodes[b].right_parent.is_none() {
            self.nodes[a].left = Some(b);
            self.nodes[b].right_parent = Some(a);
        } else if self.nodes[a].right.is_none() && self.nodes[b].left_parent.is_none() {
            self.nodes[a].right = Some(b);
            self.nodes[b].left_parent = Some(a);
        } else if self.nodes[a].right.is_none() && self.nodes[b].right_parent.is_none() {
            self.nodes[a].right = Some(b);
            self.nodes[b].right_parent = Some(a);
        } else {
            log::error!("gamma2: failed edge insert {} , {}", a + 1, b + 1);
        }
    }

    /// Draw the edges of a child Γ₂ graph from one Γ₁ colouring of the
    /// parent.
    ///
    /// A Γ₁ edge `a -> b` becomes the child edge `⌊a/2⌋ -> ⌊b/2⌋` during the
    /// preprocessing step of a 4-way split and `⌊a/2⌋ -> ⌊b/2⌋ - 1`
    /// otherwise; edges inside one block pair and self-loops contribute
    /// nothing.
    pub fn add_edges(&mut self, gamma1: &Gamma1, preprocessing: bool, four_way: bool) {
        for i in (0..gamma1.len()).step_by(2) {
            let second = if i + 1 < gamma1.len() { Some(i + 1) } else { None };
            if let Some(child) = gamma1.nodes[i].child {
                if child != i && Some(child) != second {
                    if preprocessing && four_way {
                        self.add_edge(i / 2, child / 2);
                    } else {
                        self.add_edge(i / 2, child / 2 - 1);
                    }
                }
            }
            if let Some(sec) = second {
                if let Some(child) = gamma1.nodes[sec].child {
                    if child != sec {
                        if preprocessing && four_way {
                            self.add_edge(i / 2, child / 2);
                        } else {
                            self.add_edge(i / 2, child / 2 - 1);
                        }
                    }
                }
            }
        }
    }

    /// Split this graph into its two Γ₁ colourings and recurse.
    ///
    /// # Arguments
    /// * `previous_node_num` - node count of the parent graph, for the
    ///   parity correction of the colouring (0 at the root)
    /// * `preprocessing` - true inside the extra colouring step of a 4-way
    ///   split
    /// * `four_way` - true if this level belongs to a 4-way split
    /// * `hybrid` - true if the per-size split choice is consulted
    /// * `choice` - the hybrid split table
    pub fn create_subgraphs(
        &mut self,
        previous_node_num: usize,
        preprocessing: bool,
        four_way: bool,
        hybrid: bool,
        choice: &HybridChoice,
    ) -> Result<(), UcError> {
        let (first, second) = color_gamma2(self, previous_node_num)?;
        self.gamma1_right = Some(first);
        self.gamma1_left = Some(second);

        let mut four_way_left = four_way;
        let mut four_way_right = four_way;

        let mut left_node_num = self.len() / 2;
        let mut right_node_num = self.len() / 2;

        if self.len() <= 4 && (preprocessing || !four_way) {
            self.sub_left = None;
            self.sub_right = None;
            return Ok(());
        }

        // The colouring sizes can differ by one depending on parity.
        let left_num = self.gamma1_left.as_ref().unwrap().len();
        let right_num = self.gamma1_right.as_ref().unwrap().len();

        if hybrid && four_way && preprocessing {
            if choice.next_k(left_num) == 2 {
                four_way_left = false;
            }
            if choice.next_k(right_num) == 2 {
                four_way_right = false;
            }
        }

        if left_num % 2 == 0 {
            left_node_num -= 1;
            right_node_num -= 1;
        }
        if left_num % 2 == 1 && right_num % 2 == 0 {
            right_node_num -= 1;
        }
        if preprocessing && four_way_left {
            left_node_num += 1;
        }
        if preprocessing && four_way_right {
            right_node_num += 1;
        }

        let mut next_preprocessing_left = !preprocessing;
        let mut next_preprocessing_right = !preprocessing;
        let mut next_four_way_left = four_way_left;
        let mut next_four_way_right = four_way_right;

        if hybrid {
            if !four_way_left || !preprocessing {
                next_four_way_left = choice.next_k(left_node_num) == 4;
                next_preprocessing_left = true;
            }
            if !four_way_right || !preprocessing {
                next_four_way_right = choice.next_k(right_node_num) == 4;
                next_preprocessing_right = true;
            }
        }

        if (left_num > 4 && (preprocessing || !four_way || !hybrid)) || (!preprocessing && four_way)
        {
            let mut sub = Box::new(Gamma2::new(left_node_num));
            sub.add_edges(
                self.gamma1_left.as_ref().unwrap(),
                preprocessing,
                four_way_left,
            );
            sub.create_subgraphs(
                left_num,
                next_preprocessing_left,
                next_four_way_left,
                hybrid,
                choice,
            )?;
            self.sub_left = Some(sub);
        } else {
            self.sub_left = None;
        }

        if (right_num > 4 && (preprocessing || !four_way || !hybrid))
            || (!preprocessing && four_way)
        {
            let mut sub = Box::new(Gamma2::new(right_node_num));
            sub.add_edges(
                self.gamma1_right.as_ref().unwrap(),
                preprocessing,
                four_way_right,
            );
            sub.create_subgraphs(
                right_num,
                next_preprocessing_right,
                next_four_way_right,
                hybrid,
                choice,
            )?;
            self.sub_right = Some(sub);
        } else {
            self.sub_right = None;
        }

        Ok(())
    }

    /// Parity check of one child against a parent colouring; swaps this
    /// graph's colourings (and sub-graphs) when the edge incident to one of
    /// the last two nodes is realised in the wrong colouring for the block
    /// layout the embedder expects. Local and idempotent.
    fn check_one_subgraph(&mut self, gamma1: &Gamma1) {
        let node_num = gamma1.len();
        if node_num % 2 != 0 {
            return;
        }

        if let Some(parent) = gamma1.nodes[node_num - 1].parent {
            let index2 = node_num - 1;
            let index1 = parent;
            if index2 / 2 >= 1 && index1 / 2 <= index2 / 2 - 1 {
                let target = index2 / 2 - 1;
                let left = self.gamma1_left.as_ref().unwrap();
                let right = self.gamma1_right.as_ref().unwrap();
                if left.nodes[index1 / 2].child == Some(target)
                    && right.nodes[index1 / 2].child != Some(target)
                {
                    std::mem::swap(&mut self.gamma1_left, &mut self.gamma1_right);
                    std::mem::swap(&mut self.sub_left, &mut self.sub_right);
                }
            }
        }
        if let Some(parent) = gamma1.nodes[node_num - 2].parent {
            let index2 = node_num - 2;
            let index1 = parent;
            if index2 / 2 >= 1 && index1 / 2 <= index2 / 2 - 1 {
                let target = index2 / 2 - 1;
                let left = self.gamma1_left.as_ref().unwrap();
                let right = self.gamma1_right.as_ref().unwrap();
                if right.nodes[index1 / 2].child == Some(target)
                    && left.nodes[index1 / 2].child != Some(target)
                {
                    std::mem::swap(&mut self.gamma1_left, &mut self.gamma1_right);
                    std::mem::swap(&mut self.sub_left, &mut self.sub_right);
                }
            }
        }
    }

    /// Sweep the whole split tree and repair the left/right arrangement of
    /// every even-sized colouring. Running the sweep twice changes nothing.
    pub fn check_subgraphs(&mut self) {
        if self.len() <= 4 {
            return;
        }
        if let Some(gamma1) = self.gamma1_left.take() {
            if gamma1.len() % 2 == 0 {
                if let Some(sub) = self.sub_left.as_mut() {
                    sub.check_one_subgraph(&gamma1);
                }
            }
            self.gamma1_left = Some(gamma1);
        }
        if let Some(gamma1) = self.gamma1_right.take() {
            if gamma1.len() % 2 == 0 {
                if let Some(sub) = self.sub_right.as_mut() {
                    sub.check_one_subgraph(&gamma1);
                }
            }
            self.gamma1_right = Some(gamma1);
        }
        if let Some(sub) = self.sub_right.as_mut() {
            sub.check_subgraphs();
        }
        if let Some(sub) = self.sub_left.as_mut() {
            sub.check_subgraphs();
        }
    }
}

/// One side of the bipartite double cover used by the colouring.
///
/// The left copy keeps the out-edges of every vertex, the right copy the
/// in-edges; every original edge `u -> v` becomes `L_u — R_v`. Both copies
/// have degree at most 2, so components are paths or even cycles.
#[derive(Debug, Clone, Copy, Default)]
struct CoverNode {
    first: Option<usize>,
    second: Option<usize>,
    colored: bool,
    output: bool,
}

impl CoverNode {
    fn add_slot(&mut self, other: usize) {
        if self.first.is_none() {
            self.first = Some(other);
        } else if self.second.is_none() {
            self.second = Some(other);
        } else {
            log::error!("bipartite cover: more than two slots on one side");
        }
    }

    /// The slot that is not `other`, if it exists and is still uncoloured
    /// on its own side.
    fn other_slot(&self, other: Option<usize>, colored: &[CoverNode]) -> Option<usize> {
        if let (Some(first), Some(second)) = (self.first, self.second) {
            if Some(first) == other && !colored[second].colored {
                return Some(second);
            }
            if Some(second) == other && !colored[first].colored {
                return Some(first);
            }
        }
        None
    }
}

struct Cover {
    left: Vec<CoverNode>,
    right: Vec<CoverNode>,
}

impl Cover {
    fn build(g: &Gamma2) -> (Self, u32) {
        let mut cover = Cover {
            left: vec![CoverNode::default(); g.len()],
            right: vec![CoverNode::default(); g.len()],
        };
        let mut edge_num = 0u32;
        for (i, node) in g.nodes.iter().enumerate() {
            for child in [node.left, node.right].into_iter().flatten() {
                cover.left[i].add_slot(child);
                cover.right[child].add_slot(i);
                edge_num += 1;
                if g.nodes[child].output {
                    cover.right[child].output = true;
                }
            }
        }
        (cover, edge_num)
    }

    /// Lowest-numbered uncoloured left-copy vertex with an uncoloured child.
    fn smallest_uncolored_with_child(&self) -> Option<usize> {
        self.left
            .iter()
            .position(|n| !n.colored && (n.first.is_some() || n.second.is_some()))
    }
}

/// Record the edge `parent -> child` in the colouring selected by `color`,
/// propagating the output flag of the child. Returns whether an edge was
/// actually placed.
fn place_edge(
    parent: Option<usize>,
    child: Option<usize>,
    color: bool,
    cover: &Cover,
    g1: &mut Gamma1,
    g2: &mut Gamma1,
) -> bool {
    let current = if color { g1 } else { g2 };
    if let (Some(p), Some(c)) = (parent, child) {
        if cover.right[c].output {
            current.nodes[c].is_output = true;
        }
        current.add_edge(p, c);
        true
    } else {
        false
    }
}

/// One step of the alternating Eulerian walk.
///
/// Extends the path in both directions from the previously coloured edge,
/// colouring up to two new edges with the flipped colour. Two parallel
/// edges between the same pair of nodes are the one case where the `other`
/// child comes back as the node just visited; the second edge still has to
/// be coloured exactly once.
#[allow(clippy::too_many_arguments)]
fn color_parent_child(
    parent: &mut Option<usize>,
    child: &mut Option<usize>,
    old_parent: &mut Option<usize>,
    old_child: &mut Option<usize>,
    color: &mut bool,
    b1: &mut bool,
    b2: &mut bool,
    cover: &mut Cover,
    g1: &mut Gamma1,
    g2: &mut Gamma1,
    edge_num: &mut u32,
) {
    let old_child_parent = *old_parent;
    let old_parent_child = *old_child;
    *old_child = *child;
    *old_parent = *parent;

    *parent = if old_child_parent.is_none() && old_parent.is_some() && old_child.is_some() {
        cover.right[old_child.unwrap()].other_slot(*old_parent, &cover.left)
    } else if let Some(oc) = *old_child {
        cover.right[oc].other_slot(old_child_parent, &cover.left)
    } else {
        None
    };

    *child = if old_parent_child.is_none() && old_child.is_some() && old_parent.is_some() {
        let tmp_node = cover.left[old_parent.unwrap()].other_slot(*old_child, &cover.right);
        // Two parallel edges from the same node to the same other node:
        // there is nothing else in that component, but it has to run once.
        if tmp_node != *old_child {
            tmp_node
        } else {
            None
        }
    } else if let Some(op) = *old_parent {
        cover.left[op].other_slot(old_parent_child, &cover.right)
    } else {
        None
    };

    *color = !*color;
    *b1 = place_edge(*parent, *old_child, *color, cover, g1, g2);
    if *b1 {
        cover.right[old_child.unwrap()].colored = true;
        *edge_num -= 1;
    }
    // Do not colour the same edge twice in one round.
    if !(*old_parent == *parent && *old_child == *child) {
        *b2 = place_edge(*old_parent, *child, *color, cover, g1, g2);
        if *b2 {
            cover.left[old_parent.unwrap()].colored = true;
            *edge_num -= 1;
        }
    } else {
        *b2 = false;
    }
    if parent.is_none() {
        if let Some(oc) = *old_child {
            cover.right[oc].colored = true;
        }
    }
    if child.is_none() {
        if let Some(op) = *old_parent {
            cover.left[op].colored = true;
        }
    }
}

/// Separate the edges of a Γ₂ graph into two Γ₁ graphs.
///
/// # Algorithm
/// Builds the bipartite double cover and walks its components, alternately
/// assigning the two colours to consecutive edges; within each component
/// each colour then induces a matching, i.e. a fan-out-1 graph on the
/// original vertices. The first colour is chosen so that the first-walked
/// edges land in the colouring returned *second* (the left Γ₁ of the
/// caller).
///
/// # Parity correction
/// When the parent graph had an odd pole count, the Γ₁ whose last node
/// ended up parent-less loses that node and is returned first; the caller
/// stores the returned pair as `(gamma1_right, gamma1_left)`.
///
/// # Errors
/// `ColoringInvariantViolated` if edges remain but no startable vertex
/// exists, or if the odd-parity correction finds no parent-less last node.
pub fn color_gamma2(g: &Gamma2, previous_node_num: usize) -> Result<(Gamma1, Gamma1), UcError> {
    if g.is_empty() {
        return Ok((Gamma1::new(0), Gamma1::new(0)));
    }
    let (mut cover, mut edge_num) = Cover::build(g);

    let mut g1 = Gamma1::new(g.len());
    let mut g2 = Gamma1::new(g.len());

    let mut color = false;
    while edge_num > 0 {
        let mut old_child: Option<usize> = None;
        let mut old_parent: Option<usize> = None;
        let Some(start) = cover.smallest_uncolored_with_child() else {
            return Err(UcError::ColoringInvariantViolated {
                remaining: edge_num,
            });
        };
        let mut parent = Some(start);
        let mut child = cover.left[start].first.or(cover.left[start].second);

        let mut b1 = place_edge(parent, child, color, &cover, &mut g1, &mut g2);
        edge_num -= 1;

        let mut b2 = false;
        while b1 || b2 {
            color_parent_child(
                &mut parent,
                &mut child,
                &mut old_parent,
                &mut old_child,
                &mut color,
                &mut b1,
                &mut b2,
                &mut cover,
                &mut g1,
                &mut g2,
                &mut edge_num,
            );
        }
    }

    if previous_node_num % 2 == 1 {
        if g1.nodes[g1.len() - 1].parent.is_none() {
            g1.delete_last_node();
            Ok((g1, g2))
        } else if g2.nodes[g2.len() - 1].parent.is_none() {
            g2.delete_last_node();
            Ok((g2, g1))
        } else {
            Err(UcError::ColoringInvariantViolated { remaining: 0 })
        }
    } else {
        Ok((g1, g2))
    }
}

/// Create a random, topologically ordered Γ₂ graph with `n` nodes.
///
/// Every node carries an XOR table; each node gets up to two forward edges
/// to uniformly chosen later nodes, slot permitting.
pub fn random_gamma2<R: Rng>(n: usize, rng: &mut R) -> Gamma2 {
    let mut g = Gamma2::new(n);
    for i in 0..n {
        g.nodes[i].set_function_bits(0, 1, 1, 0);
        for _ in 0..2 {
            let j = rng.gen_range(0..n - i);
            if g.nodes[i].right.is_none() && g.nodes[i + j].right_parent.is_none() && j != 0 {
                g.add_edge(i, i + j);
            }
        }
    }
    g
}
