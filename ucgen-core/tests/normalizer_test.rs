//! Unit tests for the fanout-2 normaliser

mod utils;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ucgen_core::compiler::evaluator::eval_gate_list;
use ucgen_core::compiler::normalizer::normalize;
use ucgen_core::compiler::parser::{Entry, GateList};

/// Count the consumers of every wire, outputs included.
fn fanouts(list: &GateList) -> Vec<u32> {
    let mut fanout = vec![0u32; list.num_wires()];
    for entry in &list.entries {
        if let Entry::Gate(gate) = entry {
            for i in 0..gate.arity as usize {
                fanout[gate.inputs[i] as usize] += 1;
            }
        }
    }
    for &w in &list.outputs {
        fanout[w as usize] += 1;
    }
    fanout
}

#[test]
fn test_already_normalised_is_unchanged() {
    let adder = utils::ripple_adder(8);
    let normalized = normalize(&adder).expect("normalize");
    assert_eq!(adder, normalized);
}

#[test]
fn test_idempotence() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..8 {
        let circuit = utils::random_circuit(4, 40, 3, &mut rng);
        let once = normalize(&circuit).expect("first pass");
        let twice = normalize(&once).expect("second pass");
        assert_eq!(once, twice);
    }
}

#[test]
fn test_fanout_bounded_after_normalisation() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..8 {
        let circuit = utils::random_circuit(5, 60, 4, &mut rng);
        let normalized = normalize(&circuit).expect("normalize");
        for (wire, &fo) in fanouts(&normalized).iter().enumerate() {
            assert!(fo <= 2, "wire {} has fanout {}", wire, fo);
        }
        assert_eq!(circuit.outputs.len(), normalized.outputs.len());
        assert_eq!(circuit.num_inputs(), normalized.num_inputs());
    }
}

#[test]
fn test_wire_ids_stay_dense() {
    let mut rng = StdRng::seed_from_u64(13);
    let circuit = utils::random_circuit(6, 50, 3, &mut rng);
    let normalized = normalize(&circuit).expect("normalize");
    for (position, entry) in normalized.entries.iter().enumerate() {
        assert_eq!(entry.id() as usize, position);
    }
}

#[test]
fn test_semantics_preserved() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..8 {
        let circuit = utils::random_circuit(6, 60, 4, &mut rng);
        let normalized = normalize(&circuit).expect("normalize");
        for _ in 0..32 {
            let inputs: Vec<bool> = (0..6).map(|_| rng.gen()).collect();
            let expected = eval_gate_list(&circuit, &inputs).expect("original");
            let actual = eval_gate_list(&normalized, &inputs).expect("normalized");
            assert_eq!(expected, actual, "inputs {:?}", inputs);
        }
    }
}

#[test]
fn test_input_copy_gates_follow_inputs() {
    // One input feeding four gates grows two copy gates placed directly
    // after the inputs.
    let mut entries = vec![Entry::Input { id: 0 }, Entry::Input { id: 1 }];
    for i in 0..4u32 {
        entries.push(Entry::Gate(ucgen_core::compiler::parser::Gate {
            id: 2 + i,
            is_output: i == 3,
            arity: 2,
            table: [0, 1, 1, 0],
            inputs: [0, 1],
        }));
    }
    let circuit = GateList {
        entries,
        outputs: vec![5],
    };
    let normalized = normalize(&circuit).expect("normalize");

    // Wires 2 and 3 must now be arity-1 identity gates.
    for id in [2usize, 3] {
        let Entry::Gate(gate) = &normalized.entries[id] else {
            panic!("expected a copy gate at wire {}", id);
        };
        assert_eq!(gate.arity, 1);
        assert_eq!(&gate.table[..2], &[0, 1]);
    }
    for (position, entry) in normalized.entries.iter().enumerate() {
        assert_eq!(entry.id() as usize, position);
    }

    let mut rng = StdRng::seed_from_u64(19);
    for _ in 0..16 {
        let inputs: Vec<bool> = (0..2).map(|_| rng.gen()).collect();
        let expected = eval_gate_list(&circuit, &inputs).expect("original");
        let actual = eval_gate_list(&normalized, &inputs).expect("normalized");
        assert_eq!(expected, actual);
    }
}
