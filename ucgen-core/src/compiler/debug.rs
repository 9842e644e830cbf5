//! Debugging Support
//!
//! Graphviz renderings of the intermediate structures, strictly for
//! debugging: the Γ₂ split tree (edges that the left colouring owns are
//! drawn blue) and the assembled universal circuit. The CLI writes these
//! next to the emitted files on request; piping one into `dot -Tsvg` gives
//! a picture of what the construction built.

use crate::compiler::gamma::gamma2::Gamma2;
use crate::compiler::uc::circuit::UniversalCircuit;
use crate::compiler::uc::node::{NodeType, PoleType};

/// Render the whole split tree as a graphviz digraph.
///
/// Every recursion level prefixes its node names with `sl`/`sr` for the
/// left/right sub-graph, so the tree stays readable in one picture.
pub fn gamma2_dot(g: &Gamma2) -> String {
    let mut out = String::from("digraph {\n");
    gamma2_dot_level(g, "", &mut out);
    out.push_str("}\n");
    out
}

fn gamma2_dot_level(g: &Gamma2, prefix: &str, out: &mut String) {
    let left_owns = |index: usize, child: usize| -> bool {
        g.gamma1_left
            .as_ref()
            .and_then(|gamma1| gamma1.nodes.get(index))
            .and_then(|node| node.child)
            == Some(child)
    };

    for (i, node) in g.nodes.iter().enumerate() {
        if let Some(child) = node.left {
            out.push_str(&format!("{}m{} -> {}m{}", prefix, i + 1, prefix, child + 1));
            if left_owns(i, child) {
                out.push_str(" [color = blue]");
            }
            out.push_str(";\n");
        }
        if let Some(child) = node.right {
            out.push_str(&format!("{}m{} -> {}m{}", prefix, i + 1, prefix, child + 1));
            if left_owns(i, child) && node.left != Some(child) {
                out.push_str(" [color = blue]");
            }
            out.push_str(";\n");
        }
    }

    if let Some(sub) = g.sub_left.as_deref() {
        gamma2_dot_level(sub, &format!("{}sl", prefix), out);
    }
    if let Some(sub) = g.sub_right.as_deref() {
        gamma2_dot_level(sub, &format!("{}sr", prefix), out);
    }
}

fn node_name(uc: &UniversalCircuit, id: usize) -> String {
    let node = uc.arena.node(id);
    match node.node_type {
        NodeType::Pole => format!("p{}", node.id),
        NodeType::RecursionPoint => format!("r{}", id),
        _ => format!("n{}", id),
    }
}

/// Render the assembled universal circuit as a graphviz digraph.
///
/// Poles are boxes labelled with their role, switches are circles labelled
/// with their kind and control bit.
pub fn uc_dot(uc: &UniversalCircuit) -> String {
    let mut out = String::from("digraph {\nnode [shape = circle, width = 0.2];\n");

    for (id, node) in uc.arena.nodes.iter().enumerate() {
        let name = node_name(uc, id);
        let label = match node.node_type {
            NodeType::Pole => {
                let role = match node.pole_type {
                    PoleType::Input => "in",
                    PoleType::Gate => "gate",
                    PoleType::Output => "out",
                    PoleType::NoPole => "pole",
                };
                out.push_str(&format!("{} [shape = box];\n", name));
                format!("{} {}", role, node.id)
            }
            NodeType::XSwitch => format!("X/{}", node.control_bits.first().copied().unwrap_or(0)),
            NodeType::YSwitch => format!("Y/{}", node.control_bits.first().copied().unwrap_or(0)),
            NodeType::ReverseYSwitch => "Y'".to_string(),
            NodeType::ISwitch => "I".to_string(),
            NodeType::RecursionPoint => {
                format!("R/{}", node.control_bits.first().copied().unwrap_or(0))
            }
        };
        out.push_str(&format!("{} [label = \"{}\"];\n", name, label));
    }

    for (id, node) in uc.arena.nodes.iter().enumerate() {
        for &child in &node.children {
            out.push_str(&format!(
                "{} -> {};\n",
                node_name(uc, id),
                node_name(uc, child)
            ));
        }
    }

    out.push_str("}\n");
    out
}
