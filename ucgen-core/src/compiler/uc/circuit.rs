//! Universal Circuit Assembly
//!
//! The universal circuit is a pole per supergraph node plus two
//! edge-universal chains (left and right) sharing that pole set. After the
//! split tree has been embedded into both chains, finalisation stamps the
//! pole roles: input poles lose their incoming edges, output poles their
//! outgoing ones, and gate poles receive their 4-bit tables from the
//! supergraph, middle bits swapped once where the colouring crossed the
//! declared parent slots. A DFS then numbers all surviving nodes
//! topologically and accumulates the extra-wire offsets that X-switches add
//! and absorbed one-parent nodes remove.

use crate::compiler::error::UcError;
use crate::compiler::gamma::gamma2::Gamma2;
use crate::compiler::hybrid::HybridChoice;
use crate::compiler::uc::eug::Eug;
use crate::compiler::uc::node::{NodeArena, NodeId, NodeType, PoleType};
use crate::compiler::uc::zhao::ZhaoTable;

/// The assembled universal circuit.
#[derive(Debug)]
pub struct UniversalCircuit {
    pub arena: NodeArena,
    pub poles: Vec<NodeId>,
    /// Left and right chain.
    pub chains: Vec<Eug>,
    pub inputs: usize,
    pub outputs: usize,
    pub gates: usize,
    /// All nodes in topological order, filled by finalisation.
    pub top_ordered: Vec<NodeId>,
}

impl UniversalCircuit {
    /// Build the empty skeleton for `node_num` poles.
    ///
    /// # Arguments
    /// * `k` - 2 or 4 for a fixed split, 0 for the hybrid construction
    /// * `zhao` - use Zhao's 4-way body blocks
    /// * `choice` - the hybrid split table
    pub fn build(node_num: usize, k: u32, zhao: bool, choice: &HybridChoice) -> Self {
        let mut arena = NodeArena::new();
        let poles: Vec<NodeId> = (0..node_num)
            .map(|i| arena.add(i as u32 + 1, NodeType::Pole))
            .collect();

        let (top_k, hybrid) = if k == 0 {
            (choice.next_k(node_num), true)
        } else {
            (k, false)
        };

        let left = Eug::new(&mut arena, &poles, 0, top_k, hybrid, zhao, choice);
        let right = Eug::new(&mut arena, &poles, 1, top_k, hybrid, zhao, choice);

        log::debug!(
            "universal graph skeleton: {} poles, {} nodes",
            node_num,
            arena.len()
        );

        Self {
            arena,
            poles,
            chains: vec![left, right],
            inputs: 0,
            outputs: 0,
            gates: 0,
            top_ordered: Vec::new(),
        }
    }

    /// Total number of nodes.
    pub fn size(&self) -> usize {
        self.arena.len()
    }

    /// Embed the supergraph's split tree into both chains.
    pub fn embed(&mut self, dag: &mut Gamma2, mapping: &ZhaoTable) -> Result<(), UcError> {
        let Gamma2 {
            gamma1_left,
            gamma1_right,
            sub_left,
            sub_right,
            ..
        } = dag;

        if let Some(left) = gamma1_left.as_ref() {
            self.chains[0].embed(&mut self.arena, left, sub_left.as_deref_mut(), mapping)?;
        }
        if let Some(right) = gamma1_right.as_ref() {
            self.chains[1].embed(&mut self.arena, right, sub_right.as_deref_mut(), mapping)?;
        }
        Ok(())
    }

    /// Stamp pole roles, fix gate tables, prune the input/output fringes
    /// and number the nodes.
    pub fn finalize(
        &mut self,
        dag: &mut Gamma2,
        inputs: usize,
        outputs: usize,
        zhao: bool,
    ) -> Result<(), UcError> {
        self.inputs = inputs;
        self.outputs = outputs;
        self.gates = self.poles.len() - inputs - outputs;

        for i in 0..inputs {
            let pole = self.poles[i];
            self.arena.node_mut(pole).pole_type = PoleType::Input;
            if i > 3 && zhao && self.chains[0].k == 4 && self.arena.node(pole).parents.len() == 2 {
                // Zhao body blocks hand the two chain inputs to non-head
                // poles in swapped order.
                self.arena.node_mut(pole).parents.swap(0, 1);
            }
            self.arena.clear_parents(pole);
        }

        for i in inputs..self.poles.len() - outputs {
            let pole = self.poles[i];
            self.arena.node_mut(pole).pole_type = PoleType::Gate;
            let bits = gate_table(dag, i);
            let node = self.arena.node_mut(pole);
            node.control_bits.clear();
            node.control_bits.extend_from_slice(&bits);
        }

        for i in self.poles.len() - outputs..self.poles.len() {
            let pole = self.poles[i];
            self.arena.node_mut(pole).pole_type = PoleType::Output;
            self.arena.clear_children(pole);
        }

        self.topological_ordering(inputs)?;

        // Wire-number offsets: every surviving X-switch claims one extra
        // wire, every absorbed one-parent node gives one back.
        let mut counter: i64 = 0;
        for &id in &self.top_ordered {
            let node = self.arena.node_mut(id);
            node.additional_wires = counter;
            if node.parents.len() == 2
                && node.children.len() == 2
                && node.pole_type == PoleType::NoPole
            {
                counter += 1;
            } else if node.parents.len() == 1 {
                counter -= 1;
            }
        }
        Ok(())
    }

    /// DFS topological numbering.
    ///
    /// Input poles take the first numbers; every other node is numbered
    /// from the back as the DFS from the first pole's children retreats.
    fn topological_ordering(&mut self, inputs: usize) -> Result<(), UcError> {
        if inputs == 0 {
            return Err(UcError::InputMalformed(
                "cannot emit a circuit without inputs".to_string(),
            ));
        }

        let size = self.arena.len();
        self.top_ordered = vec![0; size];
        let mut top_value = size - 1;
        // The two chains can hand the DFS the same seed node twice; a node
        // must claim its number only once.
        let mut numbered = vec![false; size];

        for i in 0..inputs {
            let pole = self.poles[i];
            self.arena.node_mut(pole).topological_visited = true;
            self.arena.node_mut(pole).topological_number = i as u32;
            self.top_ordered[i] = pole;
            numbered[pole] = true;
        }

        let first_children: Vec<NodeId> =
            self.arena.node(self.poles[0]).children.iter().copied().collect();
        let mut dfs: Vec<NodeId> = Vec::with_capacity(size);
        for child in first_children {
            dfs.push(child);
        }

        while let Some(&current) = dfs.last() {
            if self.arena.node(current).topological_visited {
                if numbered[current] {
                    dfs.pop();
                    continue;
                }
                let next_child = self
                    .arena
                    .node(current)
                    .children
                    .iter()
                    .copied()
                    .find(|&c| !self.arena.node(c).topological_visited);
                if let Some(child) = next_child {
                    dfs.push(child);
                    continue;
                }
                self.arena.node_mut(current).topological_number = top_value as u32;
                self.top_ordered[top_value] = current;
                numbered[current] = true;
                top_value -= 1;
                dfs.pop();
            } else {
                self.arena.node_mut(current).topological_visited = true;
                let next_child = self
                    .arena
                    .node(current)
                    .children
                    .iter()
                    .copied()
                    .find(|&c| !self.arena.node(c).topological_visited);
                if let Some(child) = next_child {
                    dfs.push(child);
                }
            }
        }
        Ok(())
    }
}

/// The emitted 4-bit table of a gate pole.
///
/// The supergraph stores the table canonicalised to the declared parent
/// slots; when the colouring delivered an input through the other chain,
/// the middle bits swap (once), and a single-input gate arriving through
/// the right chain is re-canonicalised around its first bit.
fn gate_table(dag: &mut Gamma2, index: usize) -> [u16; 4] {
    let node_number = index + 1;
    let [tmp0, mut tmp1, mut tmp2, tmp3] = dag.nodes[index].function_bits;

    if tmp1 != tmp2 {
        let left_parent = dag.nodes[index].left_parent;
        let right_parent = dag.nodes[index].right_parent;
        let left_gamma = dag.gamma1_left.as_ref();
        let right_gamma = dag.gamma1_right.as_ref();

        let feeds = |gamma: Option<&crate::compiler::gamma::Gamma1>, parent: usize| -> bool {
            gamma
                .and_then(|g| g.nodes.get(parent))
                .and_then(|n| n.child)
                .map(|c| c + 1)
                == Some(node_number)
        };

        match (left_parent, right_parent) {
            (Some(parent), None) | (None, Some(parent)) => {
                if feeds(left_gamma, parent) {
                    if tmp0 != tmp1 {
                        log::warn!("gate {}: unary table not left-canonical", node_number);
                    }
                } else if feeds(right_gamma, parent) {
                    let reference = tmp0;
                    tmp1 = 1 - reference;
                    tmp2 = reference;
                    dag.nodes[index].bits_swapped = true;
                }
            }
            (Some(lp), Some(rp)) => {
                // The chains deliver (left slot via left colouring, right
                // slot via right colouring); any other arrangement swaps
                // the middle bits.
                let left_ok = feeds(left_gamma, lp);
                let right_ok = feeds(right_gamma, rp);
                if !(left_ok && right_ok) {
                    std::mem::swap(&mut tmp1, &mut tmp2);
                    dag.nodes[index].bits_swapped = true;
                }
            }
            (None, None) => {
                log::warn!("gate {} has no parents", node_number);
            }
        }
    }

    [tmp0, tmp1, tmp2, tmp3]
}
