//! Edge-Universal Graph Chains
//!
//! A chain is built from a pole sequence and a split arity k: one HEAD
//! block, a run of NORMAL blocks, one TAIL block, with k recursion points
//! inserted between adjacent blocks, one per channel. The recursion points
//! of one channel, across the whole chain, are the poles of a child chain
//! built by the same algorithm; the recursion bottoms out in a single
//! RECURSION_BASE block once at most four poles remain. The hybrid
//! construction re-consults the split oracle for every child size.
//!
//! Embedding walks the split tree alongside the chain: every Γ₁ edge either
//! stays inside a block (an output-permutation entry) or picks a recursion
//! channel according to which colouring of the split tree owns it, setting
//! the recursion-point control bits along the way.

use crate::compiler::error::UcError;
use crate::compiler::gamma::gamma1::Gamma1;
use crate::compiler::gamma::gamma2::Gamma2;
use crate::compiler::hybrid::HybridChoice;
use crate::compiler::uc::block::{Block, BlockType};
use crate::compiler::uc::node::{NodeArena, NodeId, NodeType};
use crate::compiler::uc::zhao::ZhaoTable;

/// One chain of the universal graph, with its child chains.
#[derive(Debug)]
pub struct Eug {
    pub k: u32,
    pub eug_num: usize,
    pub hybrid: bool,
    pub blocks: Vec<Block>,
    pub children: Vec<Eug>,
}

/// Priority order of the four channels: with a shrinking tail, q survives
/// first, then s, then r, then t.
fn channel_id(k: u32, i: usize) -> u32 {
    if k == 4 {
        match i {
            1 => 2,
            2 => 1,
            _ => i as u32,
        }
    } else {
        i as u32
    }
}

impl Eug {
    /// Build a chain over `poles` with the given split arity.
    pub fn new(
        arena: &mut NodeArena,
        poles: &[NodeId],
        eug_num: usize,
        k: u32,
        hybrid: bool,
        zhao: bool,
        choice: &HybridChoice,
    ) -> Self {
        let mut eug = Eug {
            k,
            eug_num,
            hybrid,
            blocks: Vec::new(),
            children: Vec::new(),
        };
        if !poles.is_empty() {
            eug.construct(arena, poles, zhao, choice);
        }
        eug
    }

    fn construct(&mut self, arena: &mut NodeArena, poles: &[NodeId], zhao: bool, choice: &HybridChoice) {
        let n = poles.len();
        let k = self.k as usize;
        if n <= 4 {
            let empty: Vec<Vec<NodeId>> = vec![Vec::new(); k];
            self.blocks.push(Block::build(
                arena,
                poles,
                0,
                0,
                BlockType::RecursionBase,
                &empty,
                self.k,
                zhao,
            ));
            return;
        }

        let block_count = n.div_ceil(k);
        let rest_poles = ((n - 1) % k) + 1;

        // rp accumulates the whole channel, rpl only the boundary points
        // visible to the block under construction.
        let mut rp: Vec<Vec<NodeId>> = vec![Vec::new(); k];
        let mut rpl: Vec<Vec<NodeId>> = vec![Vec::new(); k];

        for (i, channel) in rp.iter_mut().enumerate() {
            let tmp = channel_id(self.k, i);
            if block_count != 2 || rest_poles >= tmp as usize + 1 {
                let point = arena.add(tmp, NodeType::RecursionPoint);
                channel.push(point);
                rpl[i].push(point);
            }
        }

        self.blocks.push(Block::build(
            arena,
            poles,
            0,
            0,
            BlockType::Head,
            &rpl,
            self.k,
            zhao,
        ));

        let mut i = 1usize;
        while i < block_count - 1 {
            for (j, channel) in rp.iter_mut().enumerate() {
                let tmp = channel_id(self.k, j);
                if i != block_count - 2 || rest_poles >= tmp as usize + 1 {
                    let point = arena.add(tmp, NodeType::RecursionPoint);
                    channel.push(point);
                    rpl[j].push(point);
                }
            }

            if i != 1 {
                for channel in rpl.iter_mut() {
                    channel.remove(0);
                }
            }

            self.blocks.push(Block::build(
                arena,
                poles,
                i * k,
                i as u32,
                BlockType::Normal,
                &rpl,
                self.k,
                zhao,
            ));
            i += 1;
        }

        if i != 1 {
            for channel in rpl.iter_mut() {
                channel.remove(0);
            }
        }

        self.blocks.push(Block::build(
            arena,
            poles,
            i * k,
            i as u32,
            BlockType::Tail,
            &rpl,
            self.k,
            zhao,
        ));

        for channel in rp.iter() {
            let next_k = if self.hybrid {
                choice.next_k(channel.len())
            } else {
                self.k
            };
            let child = Eug::new(
                arena,
                channel,
                self.eug_num,
                next_k,
                self.hybrid,
                zhao,
                choice,
            );
            self.children.push(child);
        }
    }

    /// Total node count of the chain, poles included, children recursive.
    pub fn size(&self) -> usize {
        self.blocks.iter().map(|b| b.size()).sum::<usize>()
            + self.children.iter().map(|c| c.size()).sum::<usize>()
    }

    /// Embed a Γ₁ graph into this chain, guided by the split tree.
    pub fn embed(
        &mut self,
        arena: &mut NodeArena,
        graph: &Gamma1,
        graph_g2: Option<&mut Gamma2>,
        mapping: &ZhaoTable,
    ) -> Result<(), UcError> {
        let Some(g2) = graph_g2 else {
            return self.embed_base(arena, graph, mapping);
        };
        if self.k == 2 {
            self.embed2(arena, graph, g2, mapping)
        } else {
            self.embed4(arena, graph, g2, mapping)
        }
    }

    /// Set the recursion-point controls and block permutations for one
    /// inter-block edge on the chosen channel.
    #[allow(clippy::too_many_arguments)]
    fn route_edge(
        blocks: &mut [Block],
        arena: &mut NodeArena,
        current_block: usize,
        current_pos: usize,
        dest_block: usize,
        dest_pos: usize,
        recursion_point: usize,
        k: usize,
    ) {
        let boundary = usize::from(current_block != 0);
        let rp_out = blocks[current_block].recursion_points[recursion_point][boundary];
        arena.node_mut(rp_out).edge_embedded = true;
        if dest_block == current_block + 1 {
            arena.set_control_bit(rp_out, 0);
        } else {
            // A pass-through chain longer than one hop: divert into the
            // child chain here, and back out at the destination boundary.
            arena.set_control_bit(rp_out, 1);
            let rp_in = blocks[dest_block].recursion_points[recursion_point][0];
            arena.set_control_bit(rp_in, 1);
            arena.node_mut(rp_in).edge_embedded = true;
        }
        blocks[current_block]
            .set_output_permutation(current_pos, (recursion_point + k) as u32);
        blocks[dest_block].set_input_permutation(recursion_point, dest_pos as u32);
    }

    fn embed2(
        &mut self,
        arena: &mut NodeArena,
        graph: &Gamma1,
        g2: &mut Gamma2,
        mapping: &ZhaoTable,
    ) -> Result<(), UcError> {
        let Gamma2 {
            gamma1_left,
            gamma1_right,
            sub_left,
            sub_right,
            ..
        } = g2;
        let k = 2usize;

        for i in 0..graph.len() {
            let id = i + 1;
            let current_block = (id - 1) / k;
            let current_pos = (id - 1) % k;
            let current_pre = (id - 1) / 2;

            let Some(dest) = graph.nodes[i].child else {
                continue;
            };
            let dest_id = dest + 1;
            let dest_block = (dest_id - 1) / k;
            let dest_pos = (dest_id - 1) % k;
            let dest_pre_number = (dest_id - 1) / 2;

            if current_block == dest_block {
                if current_pos != dest_pos {
                    self.blocks[current_block]
                        .set_output_permutation(current_pos, dest_pos as u32);
                }
                continue;
            }

            let recursion_point;
            if owns_edge(gamma1_left.as_ref(), current_pre, dest_pre_number) {
                recursion_point = 0;
                gamma1_left.as_mut().unwrap().nodes[current_pre].is_embedded = true;
            } else if owns_edge(gamma1_right.as_ref(), current_pre, dest_pre_number) {
                recursion_point = 1;
                gamma1_right.as_mut().unwrap().nodes[current_pre].is_embedded = true;
            } else {
                return Err(UcError::EmbeddingImpossible {
                    node: id as u32,
                    context: "two-way channel selection",
                });
            }

            let chosen = if recursion_point == 0 {
                gamma1_left.as_mut().unwrap()
            } else {
                gamma1_right.as_mut().unwrap()
            };
            chosen.nodes[current_block].is_embedded = true;

            Self::route_edge(
                &mut self.blocks,
                arena,
                current_block,
                current_pos,
                dest_block,
                dest_pos,
                recursion_point,
                k,
            );
        }

        for block in &self.blocks {
            block.program(arena, mapping)?;
        }

        let g1s = [gamma1_left.as_ref(), gamma1_right.as_ref()];
        let g2s = [sub_left.as_deref_mut(), sub_right.as_deref_mut()];
        for ((child, g1), sub) in self.children.iter_mut().zip(g1s).zip(g2s) {
            if let Some(g1) = g1 {
                if !g1.is_empty() {
                    child.embed(arena, g1, sub, mapping)?;
                }
            }
        }
        Ok(())
    }

    fn embed4(
        &mut self,
        arena: &mut NodeArena,
        graph: &Gamma1,
        g2: &mut Gamma2,
        mapping: &ZhaoTable,
    ) -> Result<(), UcError> {
        let Gamma2 {
            gamma1_left: left,
            gamma1_right: right,
            sub_left,
            sub_right,
            ..
        } = g2;
        if sub_left.is_none() && sub_right.is_none() {
            return Ok(());
        }
        let k = 4usize;

        // The four quarter colourings and quarter sub-graphs.
        let (mut q0, mut q1, s0, s1) = split_sub(sub_left.as_deref_mut());
        let (mut q2, mut q3, s2, s3) = split_sub(sub_right.as_deref_mut());

        for i in 0..graph.len() {
            let id = i + 1;
            let current_block = (id - 1) / k;
            let current_pos = (id - 1) % k;
            let current_pre = (id - 1) / 2;

            let Some(dest) = graph.nodes[i].child else {
                continue;
            };
            let dest_id = dest + 1;
            let dest_block = (dest_id - 1) / k;
            let dest_pos = (dest_id - 1) % k;
            let dest_pre_number = (dest_id - 1) / 2 + 1;

            if current_block == dest_block {
                if current_pos != dest_pos {
                    self.blocks[current_block]
                        .set_output_permutation(current_pos, dest_pos as u32);
                }
                continue;
            }

            // First the preprocessing colouring decides the half...
            let mut recursion_point;
            let halves: [&mut Option<&mut Gamma1>; 2];
            if owns_edge(left.as_ref(), current_pre, dest_pre_number) {
                recursion_point = 0;
                left.as_mut().unwrap().nodes[current_pre].is_embedded = true;
                halves = [&mut q0, &mut q1];
            } else if owns_edge(right.as_ref(), current_pre, dest_pre_number) {
                recursion_point = 2;
                right.as_mut().unwrap().nodes[current_pre].is_embedded = true;
                halves = [&mut q2, &mut q3];
            } else {
                return Err(UcError::EmbeddingImpossible {
                    node: id as u32,
                    context: "four-way preprocessing selection",
                });
            }

            // ... then the secondary colouring decides the quarter.
            let [half_left, half_right] = halves;
            let chosen: &mut Gamma1;
            if owns_edge(half_left.as_deref(), current_block, dest_block) {
                chosen = half_left.as_deref_mut().unwrap();
            } else if owns_edge(half_right.as_deref(), current_block, dest_block) {
                chosen = half_right.as_deref_mut().unwrap();
                recursion_point += 1;
            } else {
                return Err(UcError::EmbeddingImpossible {
                    node: id as u32,
                    context: "four-way channel selection",
                });
            }
            chosen.nodes[current_block].is_embedded = true;

            Self::route_edge(
                &mut self.blocks,
                arena,
                current_block,
                current_pos,
                dest_block,
                dest_pos,
                recursion_point,
                k,
            );
        }

        for block in &self.blocks {
            block.program(arena, mapping)?;
        }

        let g1s = [q0.as_deref(), q1.as_deref(), q2.as_deref(), q3.as_deref()];
        let g2s = [s0, s1, s2, s3];
        for ((child, g1), sub) in self.children.iter_mut().zip(g1s).zip(g2s) {
            if let Some(g1) = g1 {
                if !g1.is_empty() {
                    child.embed(arena, g1, sub, mapping)?;
                }
            }
        }
        Ok(())
    }

    /// Embedding for a recursion base: every edge is intra-block.
    fn embed_base(
        &mut self,
        arena: &mut NodeArena,
        graph: &Gamma1,
        mapping: &ZhaoTable,
    ) -> Result<(), UcError> {
        for i in 0..graph.len() {
            let id = i + 1;
            let current_block = (id - 1) / 4;
            let current_pos = (id - 1) % 4;
            let Some(dest) = graph.nodes[i].child else {
                continue;
            };
            let dest_id = dest + 1;
            let dest_block = (dest_id - 1) / 4;
            let dest_pos = (dest_id - 1) % 4;
            if current_block == dest_block {
                if current_pos != dest_pos {
                    self.blocks[current_block]
                        .set_output_permutation(current_pos, dest_pos as u32);
                }
            } else {
                return Err(UcError::EmbeddingImpossible {
                    node: id as u32,
                    context: "recursion base",
                });
            }
        }
        for block in &self.blocks {
            block.program(arena, mapping)?;
        }
        Ok(())
    }
}

/// Whether the colouring has the unembedded edge `index -> number`.
fn owns_edge(g: Option<&Gamma1>, index: usize, number: usize) -> bool {
    g.and_then(|g| g.nodes.get(index)).is_some_and(|node| {
        node.child.map(|c| c + 1) == Some(number) && !node.is_embedded
    })
}

/// Borrow the two colourings and two sub-graphs of a split-tree node.
#[allow(clippy::type_complexity)]
fn split_sub(
    sub: Option<&mut Gamma2>,
) -> (
    Option<&mut Gamma1>,
    Option<&mut Gamma1>,
    Option<&mut Gamma2>,
    Option<&mut Gamma2>,
) {
    match sub {
        Some(Gamma2 {
            gamma1_left,
            gamma1_right,
            sub_left,
            sub_right,
            ..
        }) => (
            gamma1_left.as_mut(),
            gamma1_right.as_mut(),
            sub_left.as_deref_mut(),
            sub_right.as_deref_mut(),
        ),
        None => (None, None, None, None),
    }
}
