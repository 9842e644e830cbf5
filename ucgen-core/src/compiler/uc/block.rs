//! Block Wiring and Programming
//!
//! A chain of the edge-universal graph is a sequence of blocks: one HEAD,
//! zero or more NORMAL bodies, one TAIL, or a single RECURSION_BASE when at
//! most four poles remain. Each block owns a fixed inner switching network
//! between its poles and the recursion-point bundles on its boundaries.
//!
//! There are two block families: the 2-way split blocks and the 4-way split
//! blocks, the latter with either Valiant's or Zhao's body layout. Where a
//! recursion channel is missing (because the child chain shrank below k),
//! the output-side X-switches contract to Y and I switches.
//!
//! Programming assigns the control bit of every inner switch in closed form
//! from the block's input and output permutations; Zhao's body is the one
//! exception and is programmed from an external lookup table.

use std::collections::BTreeMap;

use crate::compiler::error::UcError;
use crate::compiler::uc::node::{NodeArena, NodeId, NodeType, DUMMY};
use crate::compiler::uc::zhao::ZhaoTable;

/// Position of a block within its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Normal,
    Head,
    Tail,
    RecursionBase,
}

/// One block of a chain.
#[derive(Debug)]
pub struct Block {
    pub k: u32,
    pub zhao: bool,
    pub block_type: BlockType,
    pub position: u32,
    /// Poles of this block, in chain order.
    pub poles: Vec<NodeId>,
    /// Inner switches, keyed by their layout-local id.
    pub switches: BTreeMap<u32, NodeId>,
    /// Recursion points per channel; `[ch][0]` is the incoming boundary
    /// (the only one for HEAD), `[ch][1]` the outgoing one.
    pub recursion_points: Vec<Vec<NodeId>>,
    /// Where each input channel's signal must surface: channel -> pole
    /// position.
    pub input_permutation: Vec<u32>,
    /// Where each pole's output must flow: pole position -> pole position
    /// (intra-block) or `k + channel` (into a recursion channel).
    pub output_permutation: Vec<u32>,
}

impl Block {
    /// Build a block of the given family.
    ///
    /// `all_poles` is the full pole sequence of the chain; the block takes
    /// up to `k` poles starting at `pole_index`. `rpl` holds the boundary
    /// recursion points visible to this block, per channel.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        arena: &mut NodeArena,
        all_poles: &[NodeId],
        pole_index: usize,
        position: u32,
        block_type: BlockType,
        rpl: &[Vec<NodeId>],
        k: u32,
        zhao: bool,
    ) -> Self {
        let pole_size = all_poles.len();
        let remaining = pole_size - pole_index;
        let number_of_poles = if k == 2 {
            if pole_size > 4 {
                remaining.min(2)
            } else {
                remaining
            }
        } else {
            remaining.min(4)
        };

        let recursion_points: Vec<Vec<NodeId>> = (0..k as usize)
            .map(|ch| rpl.get(ch).cloned().unwrap_or_default())
            .collect();

        let mut block = Block {
            k,
            zhao,
            block_type,
            position,
            poles: all_poles[pole_index..pole_index + number_of_poles].to_vec(),
            switches: BTreeMap::new(),
            recursion_points,
            input_permutation: vec![DUMMY; k as usize],
            output_permutation: vec![DUMMY; number_of_poles],
        };

        if k == 2 {
            block.build2(arena, remaining);
        } else {
            block.build4(arena, remaining);
        }
        block
    }

    fn add_switch(&mut self, arena: &mut NodeArena, local: u32, ty: NodeType) -> NodeId {
        let id = arena.add(local, ty);
        self.switches.insert(local, id);
        id
    }

    fn add_switches(&mut self, arena: &mut NodeArena, from: u32, to: u32, ty: NodeType) {
        for local in from..=to {
            self.add_switch(arena, local, ty);
        }
    }

    #[inline]
    fn sw(&self, local: u32) -> NodeId {
        self.switches[&local]
    }

    fn edge(&self, arena: &mut NodeArena, parent: NodeId, child: NodeId) {
        arena.add_edge(parent, child);
    }

    fn set(&self, arena: &mut NodeArena, local: u32, bit: u16) {
        arena.set_control_bit(self.sw(local), bit);
    }

    fn ctrl(&self, arena: &NodeArena, local: u32) -> u16 {
        arena.node(self.sw(local)).control_bits[0]
    }

    /// Record where the embedder wants an input channel's signal to surface.
    pub fn set_input_permutation(&mut self, input: usize, position: u32) {
        self.input_permutation[input] = position;
    }

    /// Record where the embedder wants a pole's output to flow.
    pub fn set_output_permutation(&mut self, output: usize, position: u32) {
        self.output_permutation[output] = position;
    }

    /// Nodes owned by this block, poles included.
    pub fn size(&self) -> usize {
        self.switches.len() + self.poles.len()
    }

    // ----- layouts ---------------------------------------------------------

    /// The minimal permutation gadget on up to four poles that forms every
    /// recursion base.
    fn build_base(&mut self, arena: &mut NodeArena, remaining: usize) {
        if remaining == 2 || remaining == 3 {
            self.edge(arena, self.poles[0], self.poles[1]);
        }
        if remaining == 3 {
            self.edge(arena, self.poles[1], self.poles[2]);
        }
        if remaining == 4 {
            self.add_switch(arena, 18, NodeType::ReverseYSwitch);
            self.add_switch(arena, 19, NodeType::XSwitch);
            self.add_switch(arena, 20, NodeType::YSwitch);
            self.edge(arena, self.poles[0], self.sw(18));
            self.edge(arena, self.sw(18), self.sw(19));
            self.edge(arena, self.sw(18), self.poles[1]);
            self.edge(arena, self.poles[1], self.sw(19));
            self.edge(arena, self.sw(19), self.sw(20));
            self.edge(arena, self.sw(19), self.poles[2]);
            self.edge(arena, self.poles[2], self.sw(20));
            self.edge(arena, self.sw(20), self.poles[3]);
        }
    }

    fn build2(&mut self, arena: &mut NodeArena, remaining: usize) {
        let index = if self.block_type == BlockType::Head {
            0
        } else {
            1
        };
        let recursion_point_number = if self.recursion_points[1].len() == index {
            1
        } else {
            2
        };

        match self.block_type {
            BlockType::Normal => {
                self.add_switches(arena, 1, 2, NodeType::XSwitch);
                let ty = if recursion_point_number == 2 {
                    NodeType::XSwitch
                } else {
                    NodeType::YSwitch
                };
                self.add_switch(arena, 3, ty);
                self.edge(arena, self.recursion_points[0][0], self.sw(1));
                self.edge(arena, self.recursion_points[1][0], self.sw(1));
                self.edge(arena, self.sw(1), self.sw(2));
                self.edge(arena, self.sw(1), self.poles[0]);
                self.edge(arena, self.poles[0], self.sw(2));
                self.edge(arena, self.sw(2), self.sw(3));
                self.edge(arena, self.sw(2), self.poles[1]);
                self.edge(arena, self.poles[1], self.sw(3));
                self.edge(arena, self.sw(3), self.recursion_points[0][1]);
                if recursion_point_number == 2 {
                    self.edge(arena, self.sw(3), self.recursion_points[1][1]);
                }
            }
            BlockType::Head => {
                self.add_switch(arena, 2, NodeType::ReverseYSwitch);
                let ty = if recursion_point_number == 2 {
                    NodeType::XSwitch
                } else {
                    NodeType::YSwitch
                };
                self.add_switch(arena, 3, ty);
                self.edge(arena, self.poles[0], self.sw(2));
                self.edge(arena, self.sw(2), self.sw(3));
                self.edge(arena, self.sw(2), self.poles[1]);
                self.edge(arena, self.poles[1], self.sw(3));
                self.edge(arena, self.sw(3), self.recursion_points[0][0]);
                if recursion_point_number == 2 {
                    self.edge(arena, self.sw(3), self.recursion_points[1][0]);
                }
            }
            BlockType::Tail => {
                if remaining == 1 {
                    self.edge(arena, self.recursion_points[0][0], self.poles[0]);
                } else {
                    self.add_switch(arena, 1, NodeType::XSwitch);
                    self.add_switch(arena, 2, NodeType::YSwitch);
                    self.edge(arena, self.recursion_points[0][0], self.sw(1));
                    self.edge(arena, self.recursion_points[1][0], self.sw(1));
                    self.edge(arena, self.sw(1), self.sw(2));
                    self.edge(arena, self.sw(1), self.poles[0]);
                    self.edge(arena, self.poles[0], self.sw(2));
                    self.edge(arena, self.sw(2), self.poles[1]);
                }
            }
            BlockType::RecursionBase => {
                self.build_base(arena, remaining);
            }
        }
    }

    fn build4(&mut self, arena: &mut NodeArena, remaining: usize) {
        match self.block_type {
            BlockType::Normal => {
                if self.zhao {
                    self.build4_normal_zhao(arena);
                } else {
                    self.build4_normal_valiant(arena);
                    self.build4_lower_network(arena);
                }
            }
            BlockType::Head => {
                self.build4_head(arena);
                self.build4_lower_network(arena);
            }
            BlockType::Tail => self.build4_tail(arena, remaining),
            BlockType::RecursionBase => self.build_base(arena, remaining),
        }
    }

    fn build4_head(&mut self, arena: &mut NodeArena) {
        self.add_switch(arena, 5, NodeType::ReverseYSwitch);
        self.add_switch(arena, 6, NodeType::XSwitch);
        self.add_switches(arena, 7, 8, NodeType::ReverseYSwitch);
        self.add_switches(arena, 9, 12, NodeType::XSwitch);
        self.add_switch(arena, 14, NodeType::XSwitch);

        self.edge(arena, self.poles[0], self.sw(5));
        self.edge(arena, self.sw(5), self.sw(6));
        self.edge(arena, self.sw(5), self.poles[1]);
        self.edge(arena, self.poles[1], self.sw(6));
        self.edge(arena, self.sw(6), self.sw(7));
        self.edge(arena, self.sw(6), self.sw(8));
        self.edge(arena, self.sw(7), self.sw(11));
        self.edge(arena, self.sw(7), self.sw(9));
        self.edge(arena, self.sw(8), self.sw(9));
        self.edge(arena, self.sw(9), self.sw(10));
        self.edge(arena, self.sw(9), self.poles[2]);
        self.edge(arena, self.poles[2], self.sw(10));
        self.edge(arena, self.sw(10), self.poles[3]);
        self.edge(arena, self.sw(10), self.sw(12));
        self.edge(arena, self.sw(8), self.sw(12));
        self.edge(arena, self.poles[3], self.sw(11));
    }

    fn build4_normal_valiant(&mut self, arena: &mut NodeArena) {
        self.add_switches(arena, 1, 12, NodeType::XSwitch);
        self.add_switch(arena, 14, NodeType::XSwitch);

        self.edge(arena, self.recursion_points[0][0], self.sw(1));
        self.edge(arena, self.recursion_points[1][0], self.sw(1));
        self.edge(arena, self.recursion_points[2][0], self.sw(2));
        self.edge(arena, self.recursion_points[3][0], self.sw(2));

        self.edge(arena, self.sw(1), self.sw(3));
        self.edge(arena, self.sw(1), self.sw(4));
        self.edge(arena, self.sw(2), self.sw(3));
        self.edge(arena, self.sw(2), self.sw(4));
        self.edge(arena, self.sw(3), self.sw(7));
        self.edge(arena, self.sw(3), self.poles[0]);
        self.edge(arena, self.poles[0], self.sw(5));
        self.edge(arena, self.sw(4), self.sw(5));
        self.edge(arena, self.sw(5), self.sw(6));
        self.edge(arena, self.sw(5), self.poles[1]);
        self.edge(arena, self.poles[1], self.sw(6));
        self.edge(arena, self.sw(6), self.sw(7));
        self.edge(arena, self.sw(6), self.sw(8));
        self.edge(arena, self.sw(4), self.sw(8));
        self.edge(arena, self.sw(7), self.sw(11));
        self.edge(arena, self.sw(7), self.sw(9));
        self.edge(arena, self.sw(8), self.sw(9));
        self.edge(arena, self.sw(9), self.sw(10));
        self.edge(arena, self.sw(9), self.poles[2]);
        self.edge(arena, self.poles[2], self.sw(10));
        self.edge(arena, self.sw(10), self.poles[3]);
    }

    fn build4_normal_zhao(&mut self, arena: &mut NodeArena) {
        self.add_switches(arena, 1, 13, NodeType::XSwitch);

        self.edge(arena, self.recursion_points[0][0], self.sw(1));
        self.edge(arena, self.recursion_points[1][0], self.sw(1));
        self.edge(arena, self.recursion_points[2][0], self.sw(2));
        self.edge(arena, self.recursion_points[3][0], self.sw(2));

        self.edge(arena, self.sw(1), self.sw(3));
        self.edge(arena, self.sw(1), self.sw(4));
        self.edge(arena, self.sw(2), self.sw(3));
        self.edge(arena, self.sw(2), self.sw(4));

        self.edge(arena, self.sw(3), self.sw(6));
        self.edge(arena, self.sw(3), self.sw(7));
        self.edge(arena, self.sw(4), self.poles[0]);
        self.edge(arena, self.poles[0], self.sw(5));
        self.edge(arena, self.sw(4), self.sw(5));

        self.edge(arena, self.sw(5), self.sw(6));
        self.edge(arena, self.sw(5), self.sw(7));

        self.edge(arena, self.sw(6), self.sw(10));
        self.edge(arena, self.sw(6), self.sw(11));
        self.edge(arena, self.sw(7), self.poles[1]);
        self.edge(arena, self.poles[1], self.sw(8));
        self.edge(arena, self.sw(7), self.sw(8));

        self.edge(arena, self.sw(8), self.poles[2]);
        self.edge(arena, self.poles[2], self.sw(9));
        self.edge(arena, self.sw(8), self.sw(9));

        self.edge(arena, self.sw(9), self.sw(10));
        self.edge(arena, self.sw(9), self.sw(11));

        self.edge(arena, self.sw(10), self.sw(13));
        self.edge(arena, self.sw(11), self.poles[3]);
        self.edge(arena, self.poles[3], self.sw(12));
        self.edge(arena, self.sw(11), self.sw(12));

        self.edge(arena, self.sw(12), self.sw(13));

        let recursion_point_number = if self.recursion_points[2].len() == 1 {
            1
        } else if self.recursion_points[1].len() == 1 {
            2
        } else if self.recursion_points[3].len() == 1 {
            3
        } else {
            4
        };

        if recursion_point_number == 1 {
            arena.node_mut(self.sw(13)).node_type = NodeType::YSwitch;
            arena.node_mut(self.sw(10)).node_type = NodeType::YSwitch;
            arena.node_mut(self.sw(12)).node_type = NodeType::YSwitch;
            self.edge(arena, self.sw(13), self.recursion_points[0][1]); // q
            return;
        }

        self.add_switch(arena, 14, NodeType::XSwitch);
        self.edge(arena, self.sw(10), self.sw(14));
        self.edge(arena, self.sw(12), self.sw(14));

        if recursion_point_number == 2 {
            arena.node_mut(self.sw(13)).node_type = NodeType::YSwitch;
            arena.node_mut(self.sw(14)).node_type = NodeType::YSwitch;
            self.edge(arena, self.sw(13), self.recursion_points[0][1]); // q
            self.edge(arena, self.sw(14), self.recursion_points[2][1]); // s
            return;
        }

        self.edge(arena, self.sw(13), self.recursion_points[0][1]); // q
        self.edge(arena, self.sw(13), self.recursion_points[1][1]); // r

        if recursion_point_number == 3 {
            arena.node_mut(self.sw(14)).node_type = NodeType::YSwitch;
            self.edge(arena, self.sw(14), self.recursion_points[2][1]); // s
            return;
        }
        self.edge(arena, self.sw(14), self.recursion_points[2][1]); // s
        self.edge(arena, self.sw(14), self.recursion_points[3][1]); // t
    }

    /// Output permutation network below the poles, shared by the 4-way head
    /// and Valiant body; contracts when outgoing channels are missing.
    fn build4_lower_network(&mut self, arena: &mut NodeArena) {
        let index = if self.block_type == BlockType::Head {
            0
        } else {
            1
        };
        let recursion_point_number = if self.recursion_points[2].len() == index {
            1
        } else if self.recursion_points[1].len() == index {
            2
        } else if self.recursion_points[3].len() == index {
            3
        } else {
            4
        };

        if recursion_point_number == 1 {
            if self.block_type == BlockType::Normal {
                self.edge(arena, self.poles[3], self.sw(11));
                self.edge(arena, self.sw(10), self.sw(12));
                self.edge(arena, self.sw(8), self.sw(12));
            }
            arena.node_mut(self.sw(11)).node_type = NodeType::YSwitch;
            arena.node_mut(self.sw(12)).node_type = NodeType::YSwitch;
            arena.node_mut(self.sw(14)).node_type = NodeType::YSwitch;
            self.edge(arena, self.sw(11), self.sw(14));
            self.edge(arena, self.sw(12), self.sw(14));
            self.edge(arena, self.sw(14), self.recursion_points[0][index]); // q
            return;
        }

        if self.block_type == BlockType::Normal {
            self.add_switch(arena, 15, NodeType::XSwitch);
            self.edge(arena, self.poles[3], self.sw(15));
            self.edge(arena, self.sw(10), self.sw(15));
            self.edge(arena, self.sw(15), self.sw(11));
            self.edge(arena, self.sw(15), self.sw(12));
            self.edge(arena, self.sw(8), self.sw(12));
        }
        self.add_switch(arena, 13, NodeType::XSwitch);
        self.edge(arena, self.sw(11), self.sw(13));
        self.edge(arena, self.sw(12), self.sw(13));
        self.edge(arena, self.sw(11), self.sw(14));
        self.edge(arena, self.sw(12), self.sw(14));

        if recursion_point_number == 2 {
            arena.node_mut(self.sw(13)).node_type = NodeType::YSwitch;
            arena.node_mut(self.sw(14)).node_type = NodeType::YSwitch;
            self.edge(arena, self.sw(13), self.recursion_points[0][index]); // q
            self.edge(arena, self.sw(14), self.recursion_points[2][index]); // s
            return;
        }

        self.edge(arena, self.sw(13), self.recursion_points[0][index]); // q
        self.edge(arena, self.sw(13), self.recursion_points[1][index]); // r

        if recursion_point_number == 3 {
            self.edge(arena, self.sw(14), self.recursion_points[2][index]); // s
            arena.node_mut(self.sw(14)).node_type = NodeType::YSwitch;
            return;
        }
        self.edge(arena, self.sw(14), self.recursion_points[2][index]); // s
        self.edge(arena, self.sw(14), self.recursion_points[3][index]); // t
    }

    fn build4_tail(&mut self, arena: &mut NodeArena, remaining: usize) {
        match remaining {
            1 => {
                self.edge(arena, self.recursion_points[0][0], self.poles[0]); // q
            }
            2 => {
                self.add_switch(arena, 35, NodeType::XSwitch);
                self.add_switch(arena, 36, NodeType::YSwitch);
                self.edge(arena, self.recursion_points[0][0], self.sw(35)); // q
                self.edge(arena, self.recursion_points[2][0], self.sw(35)); // s

                self.edge(arena, self.sw(35), self.poles[0]);
                self.edge(arena, self.poles[0], self.sw(36));
                self.edge(arena, self.sw(35), self.sw(36));
                self.edge(arena, self.sw(36), self.poles[1]);
            }
            3 => self.build4_tail3(arena),
            4 => self.build4_tail4(arena),
            _ => {}
        }
    }

    fn build4_tail4(&mut self, arena: &mut NodeArena) {
        self.add_switches(arena, 1, 6, NodeType::XSwitch);
        self.add_switches(arena, 7, 8, NodeType::YSwitch);
        self.add_switch(arena, 9, NodeType::XSwitch);
        self.add_switch(arena, 10, NodeType::YSwitch);

        self.edge(arena, self.recursion_points[0][0], self.sw(1));
        self.edge(arena, self.recursion_points[1][0], self.sw(1));
        self.edge(arena, self.recursion_points[2][0], self.sw(2));
        self.edge(arena, self.recursion_points[3][0], self.sw(2));

        self.edge(arena, self.sw(1), self.sw(3));
        self.edge(arena, self.sw(1), self.sw(4));
        self.edge(arena, self.sw(2), self.sw(3));
        self.edge(arena, self.sw(2), self.sw(4));
        self.edge(arena, self.sw(3), self.sw(7));
        self.edge(arena, self.sw(3), self.poles[0]);
        self.edge(arena, self.poles[0], self.sw(5));
        self.edge(arena, self.sw(4), self.sw(5));
        self.edge(arena, self.sw(5), self.sw(6));
        self.edge(arena, self.sw(5), self.poles[1]);
        self.edge(arena, self.poles[1], self.sw(6));
        self.edge(arena, self.sw(6), self.sw(7));
        self.edge(arena, self.sw(6), self.sw(8));
        self.edge(arena, self.sw(4), self.sw(8));
        self.edge(arena, self.sw(7), self.sw(9));
        self.edge(arena, self.sw(8), self.sw(9));
        self.edge(arena, self.sw(9), self.sw(10));
        self.edge(arena, self.sw(9), self.poles[2]);
        self.edge(arena, self.poles[2], self.sw(10));
        self.edge(arena, self.sw(10), self.poles[3]);
    }

    fn build4_tail3(&mut self, arena: &mut NodeArena) {
        self.add_switch(arena, 5, NodeType::XSwitch);
        self.add_switches(arena, 30, 32, NodeType::XSwitch);
        self.add_switches(arena, 33, 34, NodeType::YSwitch);

        self.edge(arena, self.recursion_points[0][0], self.sw(30));
        self.edge(arena, self.recursion_points[1][0], self.sw(30));

        self.edge(arena, self.sw(30), self.sw(32));
        self.edge(arena, self.sw(30), self.sw(31));
        self.edge(arena, self.recursion_points[2][0], self.sw(31));
        self.edge(arena, self.sw(31), self.sw(32));
        self.edge(arena, self.sw(32), self.sw(34));
        self.edge(arena, self.sw(32), self.poles[0]);
        self.edge(arena, self.poles[0], self.sw(5));
        self.edge(arena, self.sw(31), self.sw(5));
        self.edge(arena, self.sw(5), self.sw(33));
        self.edge(arena, self.sw(5), self.poles[1]);
        self.edge(arena, self.poles[1], self.sw(33));
        self.edge(arena, self.sw(33), self.sw(34));
        self.edge(arena, self.sw(34), self.poles[2]);
    }

    // ----- programming -----------------------------------------------------

    /// Compute the control bit of every inner switch from the completed
    /// input and output permutations.
    pub fn program(&self, arena: &mut NodeArena, mapping: &ZhaoTable) -> Result<(), UcError> {
        if self.k == 2 {
            self.program2(arena);
            Ok(())
        } else {
            self.program4(arena, mapping)
        }
    }

    fn program2(&self, arena: &mut NodeArena) {
        if self.poles.len() == 1 {
            return;
        }

        let inp = &self.input_permutation;
        let out = &self.output_permutation;

        if self.block_type != BlockType::RecursionBase {
            let mut left3: u32 = 0;
            if self.block_type != BlockType::Head {
                // node 1
                if inp[0] == 0 || inp[1] == 1 {
                    self.set(arena, 1, 1);
                } else {
                    self.set(arena, 1, 0);
                }

                // node 2
                if self.block_type == BlockType::Tail {
                    if out[0] == 1 {
                        self.set(arena, 2, 1);
                    } else {
                        self.set(arena, 2, 0);
                    }
                } else if out[0] == 1 {
                    self.set(arena, 2, 0);
                    left3 = DUMMY;
                } else {
                    self.set(arena, 2, 1);
                    left3 = out[0];
                }
            }
            if self.block_type == BlockType::Tail {
                return;
            }
            if self.block_type == BlockType::Head {
                left3 = out[0];
            }

            // node 3
            if out[1] == 2 || left3 == 3 {
                self.set(arena, 3, 1);
            } else {
                self.set(arena, 3, 0);
            }
        } else if self.poles.len() == 4 {
            // node 19
            if out[0] == 3 || out[1] == 2 {
                self.set(arena, 19, 0);
            } else {
                self.set(arena, 19, 1);
            }
            // node 20
            if out[2] == 3 {
                self.set(arena, 20, 1);
            } else {
                self.set(arena, 20, 0);
            }
        }
    }

    fn program4(&self, arena: &mut NodeArena, mapping: &ZhaoTable) -> Result<(), UcError> {
        // Number of recursion points on the outgoing (body) or incoming
        // (head) boundary of the block.
        let mut nr_recursion_points = 0usize;
        if self.block_type != BlockType::Tail {
            for ch in 0..4 {
                if (self.block_type == BlockType::Normal && self.recursion_points[ch].len() == 2)
                    || (self.block_type == BlockType::Head
                        && self.recursion_points[ch].len() == 1)
                {
                    nr_recursion_points += 1;
                }
            }
        }

        if self.poles.len() == 1 {
            return Ok(());
        }

        let inp = &self.input_permutation;
        let out = &self.output_permutation;

        if self.block_type == BlockType::Normal && self.zhao {
            let element = inp[0]
                .wrapping_mul(10_000_000)
                .wrapping_add(inp[1].wrapping_mul(1_000_000))
                .wrapping_add(inp[2].wrapping_mul(100_000))
                .wrapping_add(inp[3].wrapping_mul(10_000))
                .wrapping_add(out[0].wrapping_mul(1000))
                .wrapping_add(out[1].wrapping_mul(100))
                .wrapping_add(out[2].wrapping_mul(10))
                .wrapping_add(out[3]);
            let Some(value) = mapping.get(element) else {
                return Err(UcError::ProgrammingTableMiss(format!(
                    "no entry for permutations {:?} / {:?}",
                    inp, out
                )));
            };
            let mut binary: u32 = 8192;
            for local in 1..15u32 {
                // Switch 14 does not exist with a single outgoing channel.
                if !(self.recursion_points[2].len() == 1 && local == 14) {
                    self.set(arena, local, ((value / binary) % 2) as u16);
                    binary /= 2;
                }
            }
            return Ok(());
        }

        let mut help = inp.clone();
        self.fill_dummy_permutations(&mut help);

        if self.block_type != BlockType::RecursionBase
            && (self.block_type != BlockType::Tail || self.poles.len() == 4)
        {
            if self.block_type != BlockType::Head {
                // node 1
                if help[0] == 0 || help[1] == 1 {
                    self.set(arena, 1, 0);
                } else {
                    self.set(arena, 1, 1);
                }

                // node 2
                if help[2] == 0 || help[3] == 1 {
                    self.set(arena, 2, 0);
                } else {
                    self.set(arena, 2, 1);
                }

                // node 3
                if help[0] == 0 || help[1] == 0 {
                    let bit = if arena.node(self.sw(3)).node_type == NodeType::YSwitch {
                        0
                    } else {
                        1
                    };
                    self.set(arena, 3, bit);
                } else {
                    let bit = if arena.node(self.sw(3)).node_type == NodeType::YSwitch {
                        1
                    } else {
                        0
                    };
                    self.set(arena, 3, bit);
                }

                // node 4
                if help[0] == 1 || help[1] == 1 {
                    self.set(arena, 4, 0);
                } else {
                    self.set(arena, 4, 1);
                }

                // node 5
                if out[0] == 1 {
                    self.set(arena, 5, 1);
                } else {
                    self.set(arena, 5, 0);
                }
                if self.poles.len() == 2 {
                    return Ok(());
                }
            }

            // First input of switch 7 and right input of switch 8.
            let mut left7 = DUMMY;
            let mut right8 = DUMMY;
            if self.block_type != BlockType::Head {
                left7 = if self.ctrl(arena, 3) == 0 {
                    if self.ctrl(arena, 1) == 0 {
                        inp[0]
                    } else {
                        inp[1]
                    }
                } else if self.ctrl(arena, 2) == 0 {
                    inp[2]
                } else {
                    inp[3]
                };

                right8 = if self.ctrl(arena, 4) == 0 {
                    if self.ctrl(arena, 2) == 0 {
                        inp[3]
                    } else {
                        inp[2]
                    }
                } else if self.ctrl(arena, 1) == 0 {
                    inp[1]
                } else {
                    inp[0]
                };
            }

            // Whether an upper pole routes down through switch 8 / switch 7.
            let mut right_upper_to_lower = false;
            let mut left_upper_to_lower = false;

            // node 6
            if self.block_type == BlockType::Head {
                if out[0] > 3 && out[0] != DUMMY {
                    if out[1] > 3 && out[1] != DUMMY {
                        if sums_to_9_or_13(out[0], out[3])
                            || (out[1].wrapping_add(out[2]) == 9
                                && out[2] > 3
                                && out[1] != DUMMY
                                && out[2] != DUMMY)
                            || (out[1].wrapping_add(out[2]) == 13
                                && out[1] != DUMMY
                                && out[2] != DUMMY)
                        {
                            self.set(arena, 6, 1);
                        } else {
                            self.set(arena, 6, 0);
                        }
                    } else if sums_to_9_or_13(out[0], out[3]) {
                        self.set(arena, 6, 1);
                    } else {
                        self.set(arena, 6, 0);
                    }
                } else if out[1] > 3 && out[1] != DUMMY {
                    if sums_to_9_or_13(out[1], out[3]) {
                        self.set(arena, 6, 0);
                    } else {
                        self.set(arena, 6, 1);
                    }
                } else {
                    self.set(arena, 6, 0);
                }
            } else {
                if out[0] == 2 || out[0] == 3 {
                    if self.poles.len() == 3 {
                        right_upper_to_lower = true;
                        self.set(arena, 6, 0);
                    } else if left7 == DUMMY {
                        left_upper_to_lower = true;
                        self.set(arena, 6, 0);
                    } else {
                        // right8 must be a DUMMY
                        right_upper_to_lower = true;
                        self.set(arena, 6, 1);
                    }
                }
                if out[1] == 2 || out[1] == 3 {
                    if self.poles.len() == 3 {
                        right_upper_to_lower = true;
                        self.set(arena, 6, 1);
                    } else if left7 == DUMMY && !left_upper_to_lower {
                        left_upper_to_lower = true;
                        self.set(arena, 6, 1);
                    } else {
                        right_upper_to_lower = true;
                        self.set(arena, 6, 0);
                    }
                }
            }

            if self.block_type != BlockType::Head {
                // node 8
                if right_upper_to_lower {
                    self.set(arena, 8, 0);
                } else {
                    self.set(arena, 8, 1);
                }

                // node 7
                if left_upper_to_lower {
                    if self.block_type != BlockType::Tail {
                        self.set(arena, 7, 0);
                    } else {
                        self.set(arena, 7, 1);
                    }
                } else if self.block_type != BlockType::Tail {
                    self.set(arena, 7, 1);
                } else {
                    self.set(arena, 7, 0);
                }
            }

            // Left input of switch 6.
            let left6 = if self.block_type == BlockType::Head {
                out[0]
            } else if self.ctrl(arena, 5) == 0 {
                out[0]
            } else {
                DUMMY
            };

            // Right input of switch 7 and left input of switch 8.
            let (right7, left8) = if self.ctrl(arena, 6) == 0 {
                (left6, out[1])
            } else {
                (out[1], left6)
            };

            let (left9, right9) = if self.block_type == BlockType::Head {
                (right7, left8)
            } else {
                let left9 = if self.block_type == BlockType::Tail {
                    if self.ctrl(arena, 7) == 0 {
                        left7
                    } else {
                        right7
                    }
                } else if self.ctrl(arena, 7) == 0 {
                    right7
                } else {
                    left7
                };
                let right9 = if self.ctrl(arena, 8) == 0 { left8 } else { right8 };
                (left9, right9)
            };

            // node 9
            if left9 == 2 {
                self.set(arena, 9, 1);
            } else if left9 == 3 {
                self.set(arena, 9, 0);
            } else if right9 == 2 {
                self.set(arena, 9, 0);
            } else {
                self.set(arena, 9, 1);
            }

            // node 10
            if out[2] == 3 {
                self.set(arena, 10, 1);
            } else {
                self.set(arena, 10, 0);
            }

            if self.block_type == BlockType::Tail {
                return Ok(());
            }

            // The right output of switch 10 can only come from the third
            // pole; if that pole goes to the fourth, the output is free.
            let right_output10 = if self.ctrl(arena, 10) == 1 {
                DUMMY
            } else {
                out[2]
            };
            let right11;
            let left11;
            let right12;
            let left12;

            if self.block_type == BlockType::Head || nr_recursion_points < 3 {
                right11 = out[3];
                left11 = right7;
                right12 = left8;
                left12 = right_output10;
            } else {
                // Body block with at least 3 outgoing channels.
                left11 = if self.ctrl(arena, 7) == 1 { right7 } else { left7 };
                right12 = if self.ctrl(arena, 8) == 1 { left8 } else { right8 };

                // Outputs (4, 5) and (6, 7) must not end on the same side.
                if sums_to_9_or_13(right_output10, left11) || sums_to_9_or_13(out[3], right12) {
                    self.set(arena, 15, 0);
                    right11 = out[3];
                    left12 = right_output10;
                } else {
                    self.set(arena, 15, 1);
                    right11 = right_output10;
                    left12 = out[3];
                }
            }

            let left13;
            let right13;
            let left14;
            let right14;

            // nodes 11 and 12
            if nr_recursion_points != 1 {
                // node 11
                if left11 == 4 || left11 == 5 {
                    self.set(arena, 11, 0);
                } else if right11 == 4 || right11 == 5 || left11 == 6 || left11 == 7 {
                    self.set(arena, 11, 1);
                } else {
                    self.set(arena, 11, 0);
                }

                // node 12
                if right12 == 6 || right12 == 7 {
                    self.set(arena, 12, 0);
                } else if left12 == 6 || left12 == 7 || right12 == 4 || right12 == 5 {
                    self.set(arena, 12, 1);
                } else {
                    self.set(arena, 12, 0);
                }

                left13 = if self.ctrl(arena, 11) == 1 { right11 } else { left11 };
                right13 = if self.ctrl(arena, 12) == 1 { right12 } else { left12 };
                left14 = if self.ctrl(arena, 11) == 1 { left11 } else { right11 };
                right14 = if self.ctrl(arena, 12) == 1 { left12 } else { right12 };
            } else {
                // node 11
                if left11 == 4 {
                    self.set(arena, 11, 0);
                    left14 = left11;
                } else {
                    self.set(arena, 11, 1);
                    left14 = right11;
                }
                // node 12
                if left12 == 4 {
                    self.set(arena, 12, 0);
                    right14 = left12;
                } else {
                    self.set(arena, 12, 1);
                    right14 = right12;
                }
                left13 = DUMMY;
                right13 = DUMMY;
            }

            // node 13
            if nr_recursion_points != 1 {
                if left13 == 4 || right13 == 5 {
                    self.set(arena, 13, 0);
                } else {
                    self.set(arena, 13, 1);
                }
            }

            // node 14
            if nr_recursion_points != 1 {
                if (nr_recursion_points == 4 && (left14 == 6 || right14 == 7))
                    || (nr_recursion_points < 4 && left14 == 6)
                {
                    self.set(arena, 14, 0);
                } else {
                    self.set(arena, 14, 1);
                }
            } else if left14 == 4 {
                self.set(arena, 14, 0);
            } else {
                self.set(arena, 14, 1);
            }
        } else if self.block_type == BlockType::RecursionBase {
            if self.poles.len() == 4 {
                // node 19
                if out[0] == 3 || out[1] == 2 {
                    self.set(arena, 19, 0);
                } else {
                    self.set(arena, 19, 1);
                }
                // node 20
                if out[2] == 3 {
                    self.set(arena, 20, 1);
                } else {
                    self.set(arena, 20, 0);
                }
            }
            // Three-pole bases need no programming.
        } else if self.poles.len() == 3 {
            // Tail with three poles.
            let left31;
            let left32;
            let right32;
            let left34;
            // node 30
            if inp[0] == 0 || inp[0] == 2 || inp[1] == 1 {
                self.set(arena, 30, 0);
                left31 = inp[1];
                left32 = inp[0];
            } else {
                self.set(arena, 30, 1);
                left31 = inp[0];
                left32 = inp[1];
            }

            // node 31
            if left31 == 0 || left31 == 2 || inp[2] == 1 {
                self.set(arena, 31, 0);
                right32 = left31;
            } else {
                self.set(arena, 31, 1);
                right32 = inp[2];
            }

            // node 32
            if left32 == 2 || right32 == 0 {
                self.set(arena, 32, 0);
                left34 = left32;
            } else {
                self.set(arena, 32, 1);
                left34 = right32;
            }

            // node 5
            if out[0] == 1 {
                self.set(arena, 5, 1);
            } else {
                self.set(arena, 5, 0);
            }

            // node 33
            if out[1] == 2 {
                self.set(arena, 33, 1);
            } else {
                self.set(arena, 33, 0);
            }

            // node 34
            if left34 == 2 {
                self.set(arena, 34, 0);
            } else {
                self.set(arena, 34, 1);
            }
        } else {
            // Tail with two poles.
            // node 35
            if inp[0] == 0 || inp[2] == 1 {
                self.set(arena, 35, 0);
            } else {
                self.set(arena, 35, 1);
            }
            // node 36
            if out[0] == 1 {
                self.set(arena, 36, 0);
            } else {
                self.set(arena, 36, 1);
            }
        }
        Ok(())
    }

    /// Replace unused input-permutation slots with the unclaimed positions,
    /// which makes the closed-form programming uniform.
    fn fill_dummy_permutations(&self, help: &mut [u32]) {
        if self.block_type == BlockType::Head || self.block_type == BlockType::RecursionBase {
            return;
        }
        for j in 0..help.len() {
            if help[j] == DUMMY {
                for i in 0..help.len() as u32 {
                    if !help.contains(&i) {
                        help[j] = i;
                        break;
                    }
                }
            }
        }
    }

    // ----- validation ------------------------------------------------------

    /// Walk one step backwards through a programmed switch.
    fn step_back(arena: &NodeArena, last: NodeId, next: NodeId) -> Option<NodeId> {
        let node = arena.node(next);
        match node.node_type {
            NodeType::XSwitch => {
                let bit = node.control_bits.first().copied().unwrap_or(0);
                let from_first = node.children.first() == Some(&last);
                let idx = if bit == 0 {
                    usize::from(!from_first)
                } else {
                    usize::from(from_first)
                };
                node.parents.get(idx).copied()
            }
            NodeType::YSwitch => {
                let bit = node.control_bits.first().copied().unwrap_or(0);
                node.parents.get(bit as usize).copied()
            }
            NodeType::ISwitch | NodeType::ReverseYSwitch => node.parents.first().copied(),
            _ => None,
        }
    }

    /// Check the programmed block against its own permutations.
    ///
    /// For every pole with a declared input channel, walk backwards from the
    /// pole through the switch controls and confirm the walk reaches that
    /// channel's incoming recursion point within the depth bound; for every
    /// declared output, walk backwards from the target and confirm the
    /// source pole is reached.
    pub fn validate(&self, arena: &NodeArena, eug_number: usize) -> Result<(), String> {
        if self.k == 2 {
            if self.block_type == BlockType::RecursionBase {
                return Ok(());
            }
        } else if self.block_type == BlockType::RecursionBase && self.poles.len() == 3 {
            return Ok(());
        }
        let max_depth = if self.k == 4 { 8 } else { 3 };
        let k = self.k as usize;

        if self.block_type != BlockType::Head && self.block_type != BlockType::RecursionBase {
            for i in 0..self.poles.len() {
                let Some(target_input) = self
                    .input_permutation
                    .iter()
                    .position(|&p| p == i as u32)
                else {
                    continue;
                };
                let mut last = self.poles[i];
                let Some(mut next) = arena.node(last).parents.get(eug_number).copied() else {
                    return Err(self.dump(arena, "pole missing chain parent"));
                };

                let mut counter = 0;
                while arena.node(next).node_type != NodeType::RecursionPoint
                    && counter <= max_depth
                {
                    let tmp = next;
                    match Self::step_back(arena, last, next) {
                        Some(n) => next = n,
                        None => return Err(self.dump(arena, "input walk left the block")),
                    }
                    last = tmp;
                    counter += 1;
                }
                if self
                    .recursion_points
                    .get(target_input)
                    .and_then(|ps| ps.first())
                    != Some(&next)
                    || counter > max_depth
                {
                    return Err(self.dump(
                        arena,
                        &format!("input channel {} does not reach pole {}", target_input, i),
                    ));
                }
            }
        }

        if self.block_type != BlockType::Tail {
            for i in 1..2 * k {
                let index = if self.block_type == BlockType::Head { 0 } else { 1 };
                let Some(target_pole) = self
                    .output_permutation
                    .iter()
                    .position(|&p| p == i as u32)
                else {
                    continue;
                };
                let last_node = if i < k {
                    match self.poles.get(i) {
                        Some(&p) => p,
                        None => continue,
                    }
                } else {
                    match self
                        .recursion_points
                        .get(i - k)
                        .and_then(|ps| ps.get(index))
                    {
                        Some(&p) => p,
                        None => continue,
                    }
                };
                let mut index2 = eug_number;
                if arena.node(last_node).node_type == NodeType::RecursionPoint && i >= k {
                    index2 = 0;
                }
                let mut last = last_node;
                let Some(mut next) = arena.node(last).parents.get(index2).copied() else {
                    return Err(self.dump(arena, "output start missing parent"));
                };
                let mut guard = 0usize;
                while arena.node(next).node_type != NodeType::Pole
                    && arena.node(next).node_type != NodeType::RecursionPoint
                {
                    let tmp = next;
                    match Self::step_back(arena, last, next) {
                        Some(n) => next = n,
                        None => return Err(self.dump(arena, "output walk left the block")),
                    }
                    last = tmp;
                    guard += 1;
                    if guard > arena.len() {
                        return Err(self.dump(arena, "output walk does not terminate"));
                    }
                }
                if self.poles.get(target_pole) != Some(&next) {
                    return Err(self.dump(
                        arena,
                        &format!("output {} does not come from pole {}", i, target_pole),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Render the block's permutations and switch programming for
    /// diagnostics.
    pub fn dump(&self, arena: &NodeArena, reason: &str) -> String {
        let mut out = format!(
            "{}\nblock {:?} k={} position {}\ninput permutation: {:?}\noutput permutation: {:?}\n",
            reason, self.block_type, self.k, self.position, self.input_permutation,
            self.output_permutation
        );
        for (&local, &id) in &self.switches {
            let node = arena.node(id);
            let bit = match node.node_type {
                NodeType::ISwitch | NodeType::ReverseYSwitch => "-".to_string(),
                _ => node
                    .control_bits
                    .first()
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            };
            out.push_str(&format!("node {}: {}\n", local, bit));
        }
        out
    }
}

/// True when the two values are both assigned and collide on an output
/// side (their positions sum to 9 or 13).
fn sums_to_9_or_13(a: u32, b: u32) -> bool {
    let sum = a.wrapping_add(b);
    (sum == 9 || sum == 13) && a != DUMMY && b != DUMMY
}
