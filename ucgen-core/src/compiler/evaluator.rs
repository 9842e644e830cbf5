//! Plain Evaluation
//!
//! Reference evaluation of both circuit representations, used by the
//! correctness checks and the integration tests: the parsed gate list on
//! one side, the emitted circuit + programming files on the other. Wire
//! values are carried in a bit vector indexed by wire number.

use bitvec::vec::BitVec;

use crate::compiler::error::UcError;
use crate::compiler::parser::{Entry, GateList};

/// Apply a packed truth table to up to two inputs.
///
/// The table value encodes `f0 + 2*f1 + 4*f2 + 8*f3` with
/// `f(a, b) = f[2a + b]`; arity-1 tables use `f(a) = f[a]`.
pub fn apply_table(arity: u8, a: bool, b: bool, table: u32) -> bool {
    let index = if arity == 1 {
        usize::from(a)
    } else {
        2 * usize::from(a) + usize::from(b)
    };
    (table >> index) & 1 == 1
}

/// Evaluate a gate list on the given input bits.
///
/// # Errors
/// `InputMalformed` if the input vector does not match the declared input
/// count.
pub fn eval_gate_list(list: &GateList, inputs: &[bool]) -> Result<Vec<bool>, UcError> {
    if inputs.len() != list.num_inputs() {
        return Err(UcError::InputMalformed(format!(
            "expected {} input bits, got {}",
            list.num_inputs(),
            inputs.len()
        )));
    }

    let mut wires: BitVec = BitVec::with_capacity(list.num_wires());
    let mut next_input = 0usize;
    for entry in &list.entries {
        match entry {
            Entry::Input { .. } => {
                wires.push(inputs[next_input]);
                next_input += 1;
            }
            Entry::Gate(gate) => {
                let a = wires[gate.inputs[0] as usize];
                let b = if gate.arity == 2 {
                    wires[gate.inputs[1] as usize]
                } else {
                    false
                };
                let table = (0..gate.arity as usize * 2)
                    .fold(0u32, |acc, i| acc | (u32::from(gate.table[i] != 0) << i));
                wires.push(apply_table(gate.arity, a, b, table));
            }
        }
    }

    Ok(list
        .outputs
        .iter()
        .map(|&w| wires[w as usize])
        .collect())
}

/// Evaluate an emitted universal circuit under its programming.
///
/// # Semantics
/// - `X a b c d`: control 0 keeps the pair, control 1 swaps it.
/// - `Y a b c`: control 0 outputs `a`, control 1 outputs `b`.
/// - `U a b c`: the programming value is the packed table applied to
///   `(a, b)`.
///
/// # Errors
/// `InputMalformed` on malformed lines or a programming file shorter than
/// the circuit.
pub fn eval_uc(circuit: &str, programming: &str, inputs: &[bool]) -> Result<Vec<bool>, UcError> {
    let mut wires: BitVec = BitVec::new();
    let mut outputs: Vec<bool> = Vec::new();
    let mut program_lines = programming.lines();

    let mut next_program = |line_no: usize| -> Result<u32, UcError> {
        program_lines
            .next()
            .and_then(|l| l.split_whitespace().next())
            .and_then(|t| t.parse::<u32>().ok())
            .ok_or_else(|| {
                UcError::InputMalformed(format!(
                    "programming file exhausted at circuit line {}",
                    line_no
                ))
            })
    };

    let parse_wire = |token: Option<&&str>, line_no: usize| -> Result<usize, UcError> {
        token
            .and_then(|t| t.parse::<usize>().ok())
            .ok_or_else(|| UcError::InputMalformed(format!("circuit line {}: bad wire", line_no)))
    };

    for (idx, line) in circuit.lines().enumerate() {
        let line_no = idx + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.first() {
            Some(&"C") => {
                if tokens.len() - 1 != inputs.len() {
                    return Err(UcError::InputMalformed(format!(
                        "expected {} input bits, got {}",
                        tokens.len() - 1,
                        inputs.len()
                    )));
                }
                for &bit in inputs {
                    wires.push(bit);
                }
            }
            Some(&"X") => {
                let a = wires[parse_wire(tokens.get(1), line_no)?];
                let b = wires[parse_wire(tokens.get(2), line_no)?];
                if next_program(line_no)? == 0 {
                    wires.push(a);
                    wires.push(b);
                } else {
                    wires.push(b);
                    wires.push(a);
                }
            }
            Some(&"Y") => {
                let a = wires[parse_wire(tokens.get(1), line_no)?];
                let b = wires[parse_wire(tokens.get(2), line_no)?];
                if next_program(line_no)? == 0 {
                    wires.push(a);
                } else {
                    wires.push(b);
                }
            }
            Some(&"U") => {
                let a = wires[parse_wire(tokens.get(1), line_no)?];
                let b = wires[parse_wire(tokens.get(2), line_no)?];
                let table = next_program(line_no)?;
                wires.push(apply_table(2, a, b, table));
            }
            Some(&"O") => {
                for token in &tokens[1..] {
                    let w: usize = token.parse().map_err(|_| {
                        UcError::InputMalformed(format!("circuit line {}: bad wire", line_no))
                    })?;
                    outputs.push(wires[w]);
                }
            }
            _ => {}
        }
    }

    Ok(outputs)
}
