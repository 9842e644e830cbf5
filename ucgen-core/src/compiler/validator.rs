//! Embedding Validators
//!
//! Two independent checks that run after embedding and before the pole
//! fringes are pruned:
//!
//! - the per-block check walks every block's switch programming against its
//!   own input/output permutations;
//! - the end-to-end check walks backwards from the destination pole of
//!   every top-level Γ₁ edge, honouring switch and recursion-point
//!   controls, and confirms it reaches the source pole.
//!
//! Both failures are programmer-contract violations, never input errors.

use crate::compiler::error::UcError;
use crate::compiler::gamma::gamma1::Gamma1;
use crate::compiler::gamma::gamma2::Gamma2;
use crate::compiler::uc::circuit::UniversalCircuit;
use crate::compiler::uc::eug::Eug;
use crate::compiler::uc::node::{NodeArena, NodeId, NodeType};

/// Validate the block edge-embedding of the whole UC.
pub fn validate_block_embedding(uc: &UniversalCircuit) -> Result<(), UcError> {
    for (eug_number, chain) in uc.chains.iter().enumerate() {
        validate_chain(&uc.arena, chain, eug_number)?;
    }
    Ok(())
}

fn validate_chain(arena: &NodeArena, eug: &Eug, eug_number: usize) -> Result<(), UcError> {
    for block in &eug.blocks {
        block
            .validate(arena, eug_number)
            .map_err(UcError::BlockValidationFailed)?;
    }
    for child in &eug.children {
        // Inside a child chain the pole's chain parent is always the
        // second one; the block-side parent comes first.
        validate_chain(arena, child, 1)?;
    }
    Ok(())
}

/// Validate the recursion-point edge-embedding end to end: every edge of
/// the top-level colourings must be realised by the programmed switches.
pub fn validate_recursion_point_embedding(
    uc: &UniversalCircuit,
    dag: &Gamma2,
) -> Result<(), UcError> {
    let k = uc.chains[0].k as usize;
    let graphs = [dag.gamma1_left.as_ref(), dag.gamma1_right.as_ref()];
    for (eug_number, graph) in graphs.into_iter().enumerate() {
        let Some(graph) = graph else { continue };
        validate_one_side(&uc.arena, &uc.chains[eug_number], graph, eug_number, k)?;
    }
    Ok(())
}

fn validate_one_side(
    arena: &NodeArena,
    eug: &Eug,
    graph: &Gamma1,
    eug_number: usize,
    k: usize,
) -> Result<(), UcError> {
    for i in 0..graph.len() {
        let id = i + 1;
        let Some(dest) = graph.nodes[i].child else {
            continue;
        };
        let dest_id = dest + 1;
        // A single recursion-base block holds all poles itself.
        let (dest_block, dest_position) = if eug.blocks.len() == 1 {
            (0, dest_id - 1)
        } else {
            ((dest_id - 1) / k, (dest_id - 1) % k)
        };

        let dest_pole = eug.blocks[dest_block].poles[dest_position];
        let start = arena.node(dest_pole).parents[eug_number];
        let found = find_next_pole(arena, dest_pole, start)?;
        let found_id = arena.node(found).id;
        if found_id != id as u32 {
            return Err(UcError::EdgeEmbeddingFailed {
                expected: id as u32,
                dest: dest_id as u32,
                found: found_id,
            });
        }
    }
    Ok(())
}

/// Walk backwards from a pole through the programmed switches until the
/// next pole is reached.
pub fn find_next_pole(
    arena: &NodeArena,
    pole: NodeId,
    mut next: NodeId,
) -> Result<NodeId, UcError> {
    let mut last = pole;
    let mut steps = 0usize;
    while arena.node(next).node_type != NodeType::Pole {
        let node = arena.node(next);
        let tmp = next;
        let ty = node.node_type;
        let bit = node.control_bits.first().copied().unwrap_or(0) as usize;

        if ty == NodeType::XSwitch
            || (ty == NodeType::RecursionPoint
                && node.parents.len() == 2
                && node.children.len() == 2)
        {
            let from_first = node.children.first() == Some(&last);
            let idx = if bit == 0 {
                usize::from(!from_first)
            } else {
                usize::from(from_first)
            };
            next = node.parents[idx];
        } else if ty == NodeType::YSwitch
            || (ty == NodeType::RecursionPoint && node.children.len() == 1)
        {
            next = *node.parents.get(bit).ok_or_else(|| {
                UcError::BlockValidationFailed("walk selected a missing parent".to_string())
            })?;
        } else if ty == NodeType::ISwitch
            || ty == NodeType::ReverseYSwitch
            || (ty == NodeType::RecursionPoint && node.parents.len() == 1)
        {
            next = node.parents[0];
        } else {
            return Err(UcError::BlockValidationFailed(format!(
                "walk stuck on a {:?} node",
                ty
            )));
        }
        last = tmp;
        steps += 1;
        if steps > arena.len() {
            return Err(UcError::BlockValidationFailed(
                "backward walk does not terminate".to_string(),
            ));
        }
    }
    Ok(next)
}
