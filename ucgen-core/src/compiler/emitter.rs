//! Circuit and Programming Emission
//!
//! Walks the finalised universal circuit in topological order and renders
//! the two output files:
//!
//! - the circuit file: a `C` line with the client-input wires, one
//!   `X`/`Y`/`U` line per surviving switch or gate, and an `O` line with
//!   the output wires;
//! - the programming file: one integer per emitted line, in the same
//!   order — 0/1 for X and Y switches, the packed table
//!   `f0 + 2*f1 + 4*f2 + 8*f3` for universal gates, and the colouring side
//!   (0 left, 1 right) for the terminal Y of every output pole.
//!
//! Wire numbers are the topological numbers plus the running offset: each
//! X-switch claims two consecutive wires, absorbed one-parent nodes claim
//! none. A `Y a b c` line outputs `a` on control 0 and `b` on control 1.

use crate::compiler::gamma::gamma2::Gamma2;
use crate::compiler::uc::circuit::UniversalCircuit;
use crate::compiler::uc::node::{NodeType, PoleType};

/// Counts of the emitted lines, for statistics and tests.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct EmitCounts {
    pub x_switches: usize,
    pub y_switches: usize,
    pub universal_gates: usize,
}

/// Render the circuit and programming files of a finalised UC.
///
/// # Returns
/// `(circuit, programming, counts)` — the two file bodies plus the line
/// counts.
pub fn emit(uc: &UniversalCircuit, dag: &Gamma2) -> (String, String, EmitCounts) {
    let arena = &uc.arena;
    let mut circuit = String::new();
    let mut programming = String::new();
    let mut counts = EmitCounts::default();

    circuit.push('C');
    for i in 0..uc.inputs {
        circuit.push_str(&format!(" {}", i));
    }
    circuit.push('\n');

    for &id in &uc.top_ordered {
        let node = arena.node(id);
        if node.parents.len() != 2 || node.pole_type == PoleType::Input {
            continue;
        }
        let wire = (node.topological_number as i64 + node.additional_wires) as u32;
        let left_wire = arena.input_wire(node.parents[0], id);
        let right_wire = arena.input_wire(node.parents[1], id);

        if node.children.len() <= 1 {
            circuit.push_str(&format!("Y {} {} {}\n", left_wire, right_wire, wire));
            counts.y_switches += 1;
            if node.pole_type == PoleType::Output {
                programming.push_str(&format!("{}\n", output_side(dag, node.id)));
            } else {
                programming.push_str(&format!("{}\n", node.control_bits[0]));
            }
        } else if node.node_type == NodeType::Pole {
            circuit.push_str(&format!("U {} {} {}\n", left_wire, right_wire, wire));
            counts.universal_gates += 1;
            let bits = &node.control_bits;
            let value = bits[0] + 2 * bits[1] + 4 * bits[2] + 8 * bits[3];
            programming.push_str(&format!("{}\n", value));
        } else {
            circuit.push_str(&format!(
                "X {} {} {} {}\n",
                left_wire,
                right_wire,
                wire,
                wire + 1
            ));
            counts.x_switches += 1;
            programming.push_str(&format!("{}\n", node.control_bits[0]));
        }
    }

    circuit.push('O');
    for i in uc.inputs + uc.gates..uc.poles.len() {
        let pole = uc.poles[i];
        circuit.push_str(&format!(" {}", arena.input_wire(pole, pole)));
    }
    circuit.push('\n');

    (circuit, programming, counts)
}

/// Programming bit of an output pole: 0 when the surviving upstream edge
/// lives in the left colouring, 1 when in the right.
fn output_side(dag: &Gamma2, pole_number: u32) -> u16 {
    let index = pole_number as usize - 1;
    if let Some(left) = dag.gamma1_left.as_ref() {
        if left.nodes.get(index).is_some_and(|n| n.parent.is_some()) {
            return 0;
        }
    }
    if let Some(right) = dag.gamma1_right.as_ref() {
        if right.nodes.get(index).is_some_and(|n| n.parent.is_some()) {
            return 1;
        }
    }
    log::warn!("output pole {} has no coloured upstream edge", pole_number);
    0
}
