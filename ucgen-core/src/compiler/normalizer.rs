//! Fanout-2 Normaliser
//!
//! Rewrites a gate list so that every input and gate drives at most two
//! consumers. A wire with fanout `d > 2` grows a linear chain of `d - 2`
//! arity-1 identity gates (`table [ 0 1 ]`); consumers are redistributed
//! over the chain and every downstream reference is renumbered with a
//! monotonic shift vector. Inputs are handled separately from gates: their
//! copy gates are emitted as a contiguous run directly after the inputs, so
//! input wire ids never move.
//!
//! An output declaration consumes one fanout slot of its gate, reserved
//! from the head of the chain so the output edge stays on the original
//! wire. Applying the normaliser to an already-normalised list returns it
//! unchanged.

use crate::compiler::error::UcError;
use crate::compiler::parser::{Entry, Gate, GateList};

/// A copy chain for one over-fanout wire.
///
/// `numbers[0]` is the original wire (head); the rest are the identity
/// gates, linearly chained. `remaining` tracks the free output slots per
/// element: one on the head and every middle element, two on the last.
struct CopyChain {
    numbers: Vec<u32>,
    remaining: Vec<u32>,
}

impl CopyChain {
    fn new(head: u32, fanout: u32, copy_numbers: Vec<u32>) -> Self {
        let mut numbers = vec![head];
        numbers.extend(copy_numbers);
        let mut remaining = vec![1u32; numbers.len()];
        *remaining.last_mut().unwrap() = 2;
        debug_assert_eq!(numbers.len() as u32, fanout - 1);
        Self { numbers, remaining }
    }

    /// Take the next free output slot, walking the chain head first.
    fn consume(&mut self) -> u32 {
        for (i, slot) in self.remaining.iter_mut().enumerate() {
            if *slot > 0 {
                *slot -= 1;
                return self.numbers[i];
            }
        }
        log::error!("normalizer: copy chain of wire {} exhausted", self.numbers[0]);
        self.numbers[0]
    }

    /// Reserve the head slot for the wire's output declaration.
    fn reserve_head(&mut self) {
        if self.remaining[0] > 0 {
            self.remaining[0] -= 1;
        } else {
            log::error!(
                "normalizer: head slot of wire {} already taken",
                self.numbers[0]
            );
        }
    }
}

/// Count the consumers of every wire.
///
/// Each gate input counts once; a gate flagged `output` additionally counts
/// its own wire once, for the output node the reader will append.
fn set_fanout(list: &GateList) -> Vec<u32> {
    let mut fanout: Vec<u32> = vec![0; list.num_wires()];
    for entry in &list.entries {
        if let Entry::Gate(gate) = entry {
            if gate.is_output {
                fanout[gate.id as usize] += 1;
            }
            for i in 0..gate.arity as usize {
                fanout[gate.inputs[i] as usize] += 1;
            }
        }
    }
    fanout
}

/// Build the monotonic shift vector: each wire moves up by the total
/// fanout excess of all wires before it; inputs never move.
fn set_shift(fanout: &[u32], inputs: usize) -> Vec<u32> {
    let mut shift: Vec<u32> = vec![0; fanout.len()];
    let mut shift_global: u32 = 0;
    for i in 0..fanout.len() {
        if fanout[i] > 2 {
            shift_global += fanout[i] - 2;
        }
        if i + 1 < fanout.len() {
            shift[i + 1] += shift_global;
        }
    }
    for slot in shift.iter_mut().take(inputs) {
        *slot = 0;
    }
    shift
}

fn identity_gate(id: u32, input: u32) -> Entry {
    Entry::Gate(Gate {
        id,
        is_output: false,
        arity: 1,
        table: [0, 1, 0, 0],
        inputs: [input, 0],
    })
}

/// Normalise a gate list to fanout two.
///
/// # Returns
/// A new gate list with identical semantic function, the same number of
/// outputs, and every fanout at most 2.
///
/// # Errors
/// `InputMalformed` if a gate references an undeclared wire.
pub fn normalize(list: &GateList) -> Result<GateList, UcError> {
    let inputs = list.num_inputs();
    let fanout = set_fanout(list);
    let shift = set_shift(&fanout, inputs);

    let mut chains: Vec<CopyChain> = Vec::new();
    let mut result = GateList::default();

    // Input wires keep their ids; copy gates for over-fanout inputs form a
    // contiguous run right after them.
    for entry in &list.entries {
        if let Entry::Input { id } = entry {
            result.entries.push(Entry::Input { id: *id });
        }
    }
    let mut counting: u32 = 0;
    for entry in &list.entries {
        if let Entry::Input { id } = entry {
            let fo = fanout[*id as usize];
            if fo > 2 {
                let copy_numbers: Vec<u32> = (0..fo - 2)
                    .map(|i| inputs as u32 + counting + i)
                    .collect();
                for (i, &copy) in copy_numbers.iter().enumerate() {
                    let prev = if i == 0 { *id } else { copy_numbers[i - 1] };
                    result.entries.push(identity_gate(copy, prev));
                }
                counting += fo - 2;
                chains.push(CopyChain::new(*id, fo, copy_numbers));
            }
        }
    }

    // Gates in declaration order, each followed by its own copy chain.
    for entry in &list.entries {
        let Entry::Gate(gate) = entry else { continue };
        let num = gate.id as usize;
        let new_id = gate.id + shift[num];
        let fo = fanout[num];

        if fo > 2 {
            let copy_numbers: Vec<u32> = (1..fo - 1).map(|i| new_id + i).collect();
            chains.push(CopyChain::new(new_id, fo, copy_numbers));
        }
        if gate.is_output {
            if let Some(chain) = chains.iter_mut().find(|c| c.numbers[0] == new_id) {
                chain.reserve_head();
            }
        }

        let mut inputs_ref = [0u32; 2];
        for i in 0..gate.arity as usize {
            let w = gate.inputs[i] as usize;
            if w >= fanout.len() {
                return Err(UcError::InputMalformed(format!(
                    "gate {} references undeclared wire {}",
                    gate.id, w
                )));
            }
            inputs_ref[i] = if fanout[w] > 2 {
                let head = if w < inputs {
                    w as u32
                } else {
                    gate.inputs[i] + shift[w]
                };
                match chains.iter_mut().find(|c| c.numbers[0] == head) {
                    Some(chain) => chain.consume(),
                    None => {
                        return Err(UcError::InputMalformed(format!(
                            "gate {}: no copy chain for wire {}",
                            gate.id, w
                        )))
                    }
                }
            } else {
                gate.inputs[i] + shift[w]
            };
        }

        result.entries.push(Entry::Gate(Gate {
            id: new_id,
            is_output: gate.is_output,
            arity: gate.arity,
            table: gate.table,
            inputs: inputs_ref,
        }));

        if fo > 2 {
            for i in 0..fo - 2 {
                result.entries.push(identity_gate(new_id + i + 1, new_id + i));
            }
        }
    }

    for &w in &list.outputs {
        result.outputs.push(w + shift[w as usize]);
    }

    Ok(result)
}
