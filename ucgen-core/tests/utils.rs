//! Test Utilities
//!
//! Circuit builders and round-trip helpers shared by the integration
//! tests: tiny fixed circuits, a ripple-carry adder generator and a random
//! circuit generator, plus the compile-and-evaluate assertion that backs
//! the end-to-end tests.

use rand::Rng;

use ucgen_core::compiler::evaluator;
use ucgen_core::compiler::parser::{Entry, Gate, GateList};
use ucgen_core::compiler::pipeline::{self, Config};

/// The one-wire identity circuit: one input, no gates, one output.
pub fn identity_circuit() -> GateList {
    GateList {
        entries: vec![Entry::Input { id: 0 }],
        outputs: vec![0],
    }
}

/// A single AND gate: two inputs, one gate, one output.
pub fn and_circuit() -> GateList {
    GateList {
        entries: vec![
            Entry::Input { id: 0 },
            Entry::Input { id: 1 },
            Entry::Gate(Gate {
                id: 2,
                is_output: true,
                arity: 2,
                table: [0, 0, 0, 1],
                inputs: [0, 1],
            }),
        ],
        outputs: vec![2],
    }
}

fn gate(id: u32, is_output: bool, table: [u16; 4], a: u32, b: u32) -> Entry {
    Entry::Gate(Gate {
        id,
        is_output,
        arity: 2,
        table,
        inputs: [a, b],
    })
}

const XOR: [u16; 4] = [0, 1, 1, 0];
const AND: [u16; 4] = [0, 0, 0, 1];
const OR: [u16; 4] = [0, 1, 1, 1];

/// Ripple-carry adder over two `bits`-wide operands.
///
/// Inputs are `a0..a(bits-1)` then `b0..b(bits-1)`, outputs the sum bits
/// LSB first followed by the final carry. Every wire has fanout at most 2.
pub fn ripple_adder(bits: u32) -> GateList {
    let mut entries: Vec<Entry> = Vec::new();
    let mut outputs: Vec<u32> = Vec::new();
    for i in 0..2 * bits {
        entries.push(Entry::Input { id: i });
    }
    let mut next = 2 * bits;
    let a = |i: u32| i;
    let b = |i: u32| bits + i;

    // Half adder for the first bit.
    let s0 = next;
    entries.push(gate(s0, true, XOR, a(0), b(0)));
    next += 1;
    let mut carry = next;
    entries.push(gate(carry, false, AND, a(0), b(0)));
    next += 1;
    outputs.push(s0);

    for i in 1..bits {
        let t1 = next;
        entries.push(gate(t1, false, XOR, a(i), b(i)));
        next += 1;
        let s = next;
        entries.push(gate(s, true, XOR, t1, carry));
        next += 1;
        let t2 = next;
        entries.push(gate(t2, false, AND, a(i), b(i)));
        next += 1;
        let t3 = next;
        entries.push(gate(t3, false, AND, t1, carry));
        next += 1;
        let c = next;
        entries.push(gate(c, i == bits - 1, OR, t2, t3));
        next += 1;
        outputs.push(s);
        carry = c;
    }
    if bits == 1 {
        // Degenerate adder: the half-adder carry is the final carry.
        let last = entries.len() - 1;
        if let Entry::Gate(g) = &mut entries[last] {
            g.is_output = true;
        }
    }
    outputs.push(carry);

    GateList { entries, outputs }
}

/// Random circuit with arbitrary fanout: `gates` two-input gates over
/// random earlier wires (occasionally the same wire twice), random truth
/// tables, and `outputs` randomly selected gates.
pub fn random_circuit<R: Rng>(inputs: u32, gates: u32, outputs: usize, rng: &mut R) -> GateList {
    assert!(inputs >= 2 && gates >= 1);
    let mut entries: Vec<Entry> = Vec::new();
    for i in 0..inputs {
        entries.push(Entry::Input { id: i });
    }
    for g in 0..gates {
        let id = inputs + g;
        let a = rng.gen_range(0..id);
        let b = if rng.gen_ratio(1, 16) {
            a // parallel pair of edges into one gate
        } else {
            rng.gen_range(0..id)
        };
        let table = [
            u16::from(rng.gen::<bool>()),
            u16::from(rng.gen::<bool>()),
            u16::from(rng.gen::<bool>()),
            u16::from(rng.gen::<bool>()),
        ];
        entries.push(gate(id, false, table, a, b));
    }

    let mut output_wires: Vec<u32> = Vec::new();
    while output_wires.len() < outputs {
        let w = rng.gen_range(inputs..inputs + gates);
        if !output_wires.contains(&w) {
            output_wires.push(w);
        }
    }
    for entry in entries.iter_mut() {
        if let Entry::Gate(g) = entry {
            if output_wires.contains(&g.id) {
                g.is_output = true;
            }
        }
    }

    GateList {
        entries,
        outputs: output_wires,
    }
}

/// Compile `list` with the given construction and check that the emitted
/// universal circuit evaluates identically to the gate list on `runs`
/// random input vectors.
pub fn assert_round_trip<R: Rng>(list: &GateList, version: i32, runs: usize, rng: &mut R) {
    let config = Config {
        version,
        valiant: true,
        ..Config::default()
    };
    let result = pipeline::compile_list(list, &config)
        .unwrap_or_else(|e| panic!("compilation failed for version {}: {}", version, e));

    let num_inputs = list.num_inputs();
    for _ in 0..runs {
        let inputs: Vec<bool> = (0..num_inputs).map(|_| rng.gen()).collect();
        let expected = evaluator::eval_gate_list(list, &inputs).expect("gate list evaluation");
        let actual = evaluator::eval_uc(&result.circuit, &result.programming, &inputs)
            .expect("universal circuit evaluation");
        assert_eq!(
            expected, actual,
            "outputs differ for version {} on inputs {:?}",
            version, inputs
        );
    }
}

/// Exhaustive variant of [`assert_round_trip`] for small input counts.
pub fn assert_round_trip_exhaustive(list: &GateList, version: i32) {
    let config = Config {
        version,
        valiant: true,
        ..Config::default()
    };
    let result = pipeline::compile_list(list, &config)
        .unwrap_or_else(|e| panic!("compilation failed for version {}: {}", version, e));

    let num_inputs = list.num_inputs();
    assert!(num_inputs <= 16);
    for pattern in 0u32..(1 << num_inputs) {
        let inputs: Vec<bool> = (0..num_inputs).map(|i| (pattern >> i) & 1 == 1).collect();
        let expected = evaluator::eval_gate_list(list, &inputs).expect("gate list evaluation");
        let actual = evaluator::eval_uc(&result.circuit, &result.programming, &inputs)
            .expect("universal circuit evaluation");
        assert_eq!(
            expected, actual,
            "outputs differ for version {} on inputs {:?}",
            version, inputs
        );
    }
}
