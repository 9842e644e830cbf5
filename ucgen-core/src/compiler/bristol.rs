//! Bristol Circuit Adapter
//!
//! Converts circuits in the Bristol format (header lines with gate/wire and
//! input/output counts, then one `XOR`/`AND`/`INV` gate per line) into the
//! gate-list format of [`crate::compiler::parser`].
//!
//! Non-output inverters are not emitted: their inversion is folded into the
//! truth table of every consumer (XOR with exactly one inverted input flips
//! to `1 0 0 1`; AND selects among `0 0 0 1`, `0 1 0 0`, `0 0 1 0`,
//! `1 0 0 0` by which side is inverted), and the wire renumbering skips
//! them. Output inverters survive as arity-1 `1 0` gates.

use crate::compiler::error::UcError;
use crate::compiler::parser::{Entry, Gate, GateList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BristolType {
    Xor,
    And,
    Inv,
    Input,
    Unset,
}

#[derive(Debug, Clone)]
struct BristolNode {
    number: u32,
    number2: u32,
    left_parent: Option<usize>,
    right_parent: Option<usize>,
    ty: BristolType,
    output: bool,
}

/// Convert a Bristol circuit into a gate list.
///
/// # Arguments
/// * `text` - the Bristol circuit file contents
///
/// # Returns
/// The converted gate list, with inputs `0..n1+n2` and the declared output
/// wires in Bristol order.
///
/// # Errors
/// `InputMalformed` on truncated headers, unknown gate types or dangling
/// wire references.
pub fn bristol_to_gate_list(text: &str) -> Result<GateList, UcError> {
    let mut numbers = text.split_whitespace();
    let mut next_num = |what: &str| -> Result<u32, UcError> {
        numbers
            .next()
            .ok_or_else(|| UcError::InputMalformed(format!("bristol: missing {}", what)))?
            .parse::<u32>()
            .map_err(|_| UcError::InputMalformed(format!("bristol: bad {}", what)))
    };

    let gate_num = next_num("gate count")? as usize;
    let _wires_num = next_num("wire count")?;
    let input_num1 = next_num("input count 1")?;
    let input_num2 = next_num("input count 2")?;
    let output_num = next_num("output count")? as usize;
    let input_total = (input_num1 + input_num2) as usize;

    let mut nodes: Vec<BristolNode> = (0..input_total + gate_num)
        .map(|i| BristolNode {
            number: i as u32,
            number2: i as u32,
            left_parent: None,
            right_parent: None,
            ty: if i < input_total {
                BristolType::Input
            } else {
                BristolType::Unset
            },
            output: false,
        })
        .collect();

    let mut output_order: Vec<u32> = vec![0; output_num];
    let first_output_wire = input_total + gate_num - output_num;

    // Gate lines: <n_in> <n_out> <in1> [<in2>] <out> TYPE. Gates are
    // renumbered sequentially after the inputs in reading order.
    let mut rest = text.split_whitespace().skip(5).peekable();
    let mut num = input_total as u32;
    while rest.peek().is_some() {
        let gate_inputs: u32 = rest
            .next()
            .unwrap()
            .parse()
            .map_err(|_| UcError::InputMalformed("bristol: bad gate input count".into()))?;
        let _gate_outputs: u32 = rest
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| UcError::InputMalformed("bristol: truncated gate line".into()))?;
        let input1: usize = rest
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| UcError::InputMalformed("bristol: truncated gate line".into()))?;
        let input2: Option<usize> = if gate_inputs == 2 {
            Some(
                rest.next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| UcError::InputMalformed("bristol: truncated gate line".into()))?,
            )
        } else {
            None
        };
        let output: usize = rest
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| UcError::InputMalformed("bristol: truncated gate line".into()))?;
        let ty = rest
            .next()
            .ok_or_else(|| UcError::InputMalformed("bristol: missing gate type".into()))?;

        if output >= nodes.len() || input1 >= nodes.len() {
            return Err(UcError::InputMalformed(format!(
                "bristol: wire {} out of range",
                output.max(input1)
            )));
        }

        nodes[output].number = num;
        nodes[output].number2 = num;
        num += 1;
        nodes[output].left_parent = Some(input1);
        nodes[output].right_parent = input2;
        nodes[output].ty = match ty {
            "INV" => BristolType::Inv,
            "AND" => BristolType::And,
            "XOR" => BristolType::Xor,
            other => {
                return Err(UcError::InputMalformed(format!(
                    "bristol: unknown gate type {}",
                    other
                )))
            }
        };
        if output >= first_output_wire {
            nodes[output].output = true;
            output_order[output - first_output_wire] = nodes[output].number;
        }
    }

    let mut list = GateList::default();
    for i in 0..input_total {
        list.entries.push(Entry::Input { id: i as u32 });
    }

    let find = |nodes: &[BristolNode], number: u32| -> Result<usize, UcError> {
        nodes
            .iter()
            .position(|n| n.number == number)
            .ok_or_else(|| UcError::InputMalformed(format!("bristol: node {} not found", number)))
    };

    let mut current_inv_gatenum: u32 = 0;
    for i in input_total as u32..(gate_num + input_total) as u32 {
        let idx = find(&nodes, i)?;
        let node = nodes[idx].clone();
        let left = node.left_parent.map(|p| nodes[p].clone());
        let right = node.right_parent.map(|p| nodes[p].clone());

        let keep = matches!(node.ty, BristolType::Xor | BristolType::And)
            || (node.ty == BristolType::Inv && node.output);

        if keep {
            let new_number = node.number2 - current_inv_gatenum;
            nodes[idx].number2 = new_number;
            let left = left.ok_or_else(|| {
                UcError::InputMalformed(format!("bristol: gate {} has no input", i))
            })?;
            match node.ty {
                BristolType::Inv => {
                    list.entries.push(Entry::Gate(Gate {
                        id: new_number,
                        is_output: true,
                        arity: 1,
                        table: [1, 0, 0, 0],
                        inputs: [left.number2, 0],
                    }));
                }
                BristolType::Xor => {
                    let right = right.ok_or_else(|| {
                        UcError::InputMalformed(format!("bristol: XOR {} missing input", i))
                    })?;
                    let left_inv = left.ty == BristolType::Inv;
                    let right_inv = right.ty == BristolType::Inv;
                    let table: [u16; 4] = if left_inv == right_inv {
                        // a XOR b, or NOT a XOR NOT b
                        [0, 1, 1, 0]
                    } else {
                        // NOT a XOR b, or a XOR NOT b
                        [1, 0, 0, 1]
                    };
                    list.entries.push(Entry::Gate(Gate {
                        id: new_number,
                        is_output: node.output,
                        arity: 2,
                        table,
                        inputs: [left.number2, right.number2],
                    }));
                }
                BristolType::And => {
                    let right = right.ok_or_else(|| {
                        UcError::InputMalformed(format!("bristol: AND {} missing input", i))
                    })?;
                    let left_inv = left.ty == BristolType::Inv;
                    let right_inv = right.ty == BristolType::Inv;
                    let table: [u16; 4] = match (left_inv, right_inv) {
                        (false, false) => [0, 0, 0, 1],
                        (true, false) => [0, 1, 0, 0],
                        (false, true) => [0, 0, 1, 0],
                        (true, true) => [1, 0, 0, 0],
                    };
                    list.entries.push(Entry::Gate(Gate {
                        id: new_number,
                        is_output: node.output,
                        arity: 2,
                        table,
                        inputs: [left.number2, right.number2],
                    }));
                }
                _ => unreachable!(),
            }
        } else if node.ty == BristolType::Inv {
            // Elided inverter: consumers read through to its input.
            let left = left.ok_or_else(|| {
                UcError::InputMalformed(format!("bristol: INV {} has no input", i))
            })?;
            nodes[idx].number2 = left.number2;
            current_inv_gatenum += 1;
        }
    }

    for &number in &output_order {
        let idx = find(&nodes, number)?;
        list.outputs.push(nodes[idx].number2);
    }

    Ok(list)
}
