//! End-to-end pipeline tests: compilation, validation and evaluation
//! round trips across the three construction variants.

mod utils;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ucgen_core::compiler::bristol::bristol_to_gate_list;
use ucgen_core::compiler::error::UcError;
use ucgen_core::compiler::evaluator::{eval_gate_list, eval_uc};
use ucgen_core::compiler::pipeline::{self, Config};
use ucgen_core::compiler::uc::zhao::ZhaoTable;

const ALL_VERSIONS: [i32; 4] = [0, 2, 4, -2];

fn valiant_config(version: i32) -> Config {
    Config {
        version,
        valiant: true,
        ..Config::default()
    }
}

#[test]
fn test_identity_circuit_shape() {
    // One input wired to one output: a single terminal Y selecting the
    // left chain.
    let list = utils::identity_circuit();
    for version in ALL_VERSIONS {
        let result = pipeline::compile_list(&list, &valiant_config(version)).expect("compile");
        assert_eq!(result.circuit, "C 0\nY 0 0 1\nO 1\n", "version {}", version);
        assert_eq!(result.programming, "0\n", "version {}", version);

        for bit in [false, true] {
            let out = eval_uc(&result.circuit, &result.programming, &[bit]).expect("eval");
            assert_eq!(out, vec![bit]);
        }
    }
}

#[test]
fn test_and_circuit_programming() {
    let list = utils::and_circuit();
    for version in ALL_VERSIONS {
        let result = pipeline::compile_list(&list, &valiant_config(version)).expect("compile");

        // Exactly one universal gate, programmed as AND (table 0 0 0 1).
        let circuit_lines: Vec<&str> = result.circuit.lines().collect();
        let programming_lines: Vec<&str> = result.programming.lines().collect();
        let mut programmed = 0usize;
        let mut u_lines = 0usize;
        for line in &circuit_lines {
            match line.split_whitespace().next() {
                Some("U") => {
                    assert_eq!(programming_lines[programmed], "8");
                    u_lines += 1;
                    programmed += 1;
                }
                Some("X") | Some("Y") => programmed += 1,
                _ => {}
            }
        }
        assert_eq!(u_lines, 1, "version {}", version);

        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let out = eval_uc(&result.circuit, &result.programming, &[a, b]).expect("eval");
            assert_eq!(out, vec![a && b], "inputs ({}, {})", a, b);
        }
    }
}

#[test]
fn test_asymmetric_gate_round_trip() {
    // f(a, b) = !a AND b exercises the truth-table swap on both chains.
    let text = "\
0 input
1 input
2 gate arity 2 table [ 0 1 0 0 ] inputs [ 0 1 ]
3 output gate arity 2 table [ 0 1 1 1 ] inputs [ 2 1 ]
outputs 3
";
    let list = ucgen_core::compiler::parser::parse_gate_list(text).expect("parse");
    for version in ALL_VERSIONS {
        utils::assert_round_trip_exhaustive(&list, version);
    }
}

#[test]
fn test_unary_gate_round_trip() {
    let text = "\
0 input
1 input
2 gate arity 1 table [ 1 0 ] inputs [ 0 ]
3 gate arity 2 table [ 0 1 1 0 ] inputs [ 2 1 ]
4 output gate arity 1 table [ 0 1 ] inputs [ 3 ]
outputs 4
";
    let list = ucgen_core::compiler::parser::parse_gate_list(text).expect("parse");
    for version in ALL_VERSIONS {
        utils::assert_round_trip_exhaustive(&list, version);
    }
}

#[test]
fn test_output_feeding_gate_round_trip() {
    // An output gate that also feeds two other gates: the output edge
    // reserves the head of its copy chain.
    let text = "\
0 input
1 input
2 output gate arity 2 table [ 0 1 1 0 ] inputs [ 0 1 ]
3 gate arity 2 table [ 0 0 0 1 ] inputs [ 2 1 ]
4 output gate arity 2 table [ 0 1 1 1 ] inputs [ 2 3 ]
outputs 2 4
";
    let list = ucgen_core::compiler::parser::parse_gate_list(text).expect("parse");
    for version in ALL_VERSIONS {
        utils::assert_round_trip_exhaustive(&list, version);
    }
}

#[test]
fn test_adder_round_trip_small() {
    let adder = utils::ripple_adder(4);
    for version in ALL_VERSIONS {
        utils::assert_round_trip_exhaustive(&adder, version);
    }
}

#[test]
fn test_adder_computes_sums() {
    // The 8-bit adder against integer arithmetic, through the 4-way UC.
    let bits = 8u32;
    let adder = utils::ripple_adder(bits);
    let result = pipeline::compile_list(&adder, &valiant_config(4)).expect("compile");

    let mut rng = StdRng::seed_from_u64(43);
    for _ in 0..64 {
        let a: u32 = rng.gen_range(0..1 << bits);
        let b: u32 = rng.gen_range(0..1 << bits);
        let mut inputs = Vec::new();
        for i in 0..bits {
            inputs.push((a >> i) & 1 == 1);
        }
        for i in 0..bits {
            inputs.push((b >> i) & 1 == 1);
        }
        let out = eval_uc(&result.circuit, &result.programming, &inputs).expect("eval");
        let mut sum = 0u32;
        for (i, &bit) in out.iter().enumerate() {
            sum |= u32::from(bit) << i;
        }
        assert_eq!(sum, a + b, "{} + {}", a, b);
    }
}

#[test]
fn test_adder_round_trip_wide() {
    let adder = utils::ripple_adder(32);
    let mut rng = StdRng::seed_from_u64(47);
    for version in [0, 2, 4] {
        utils::assert_round_trip(&adder, version, 64, &mut rng);
    }
}

#[test]
fn test_random_circuits_round_trip() {
    let mut rng = StdRng::seed_from_u64(53);
    for seed in 0..6u64 {
        let mut gen = StdRng::seed_from_u64(seed);
        let inputs = gen.gen_range(2..8);
        let gates = gen.gen_range(4..90);
        let outputs = gen.gen_range(1..4.min(gates as usize + 1));
        let circuit = utils::random_circuit(inputs, gates, outputs, &mut gen);
        for version in [0, 2, 4] {
            utils::assert_round_trip(&circuit, version, 24, &mut rng);
        }
    }
}

#[test]
fn test_random_construction_validates() {
    for version in [0, 2, 4] {
        for n in [8usize, 17, 33, 64] {
            let mut rng = StdRng::seed_from_u64(59 + n as u64);
            pipeline::random_construction(n, &valiant_config(version), &mut rng)
                .unwrap_or_else(|e| panic!("n = {}, version {}: {}", n, version, e));
        }
    }
}

#[test]
fn test_bristol_conversion() {
    // One AND gate.
    let bristol = "1 3 1 1 1\n2 1 0 1 2 AND\n";
    let list = bristol_to_gate_list(bristol).expect("convert");
    assert_eq!(list.num_inputs(), 2);
    assert_eq!(list.num_gates(), 1);
    assert_eq!(list.outputs, vec![2]);
    for (a, b) in [(false, false), (true, false), (true, true)] {
        let out = eval_gate_list(&list, &[a, b]).expect("eval");
        assert_eq!(out, vec![a && b]);
    }

    // An inverter folded into its consumer: w3 = AND(INV(w0), w1).
    let bristol = "2 4 1 1 1\n1 1 0 2 INV\n2 1 2 1 3 AND\n";
    let list = bristol_to_gate_list(bristol).expect("convert");
    assert_eq!(list.num_inputs(), 2);
    // The inverter disappears; one gate remains.
    assert_eq!(list.num_gates(), 1);
    for (a, b) in [(false, true), (true, true), (false, false)] {
        let out = eval_gate_list(&list, &[a, b]).expect("eval");
        assert_eq!(out, vec![!a && b]);
    }
}

#[test]
fn test_bristol_adder_compiles() {
    // A Bristol-made circuit through the whole pipeline.
    let bristol = "\
3 7 1 1 1
2 1 0 1 2 XOR
1 1 2 3 INV
2 1 3 0 4 AND
";
    let list = bristol_to_gate_list(bristol).expect("convert");
    for version in [0, 2, 4] {
        utils::assert_round_trip_exhaustive(&list, version);
    }
}

#[test]
fn test_zhao_table_parse_and_miss() {
    let table = ZhaoTable::parse("1230123\n42\n20310123\n7\n").expect("parse");
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(1230123), Some(42));
    assert_eq!(table.get(20310123), Some(7));
    assert_eq!(table.get(5), None);

    // A configured but unreadable table aborts the pipeline.
    let config = Config {
        version: 4,
        valiant: false,
        zhao_table: Some(std::path::PathBuf::from("/nonexistent/zhao.txt")),
        ..Config::default()
    };
    let err = pipeline::compile_list(&utils::and_circuit(), &config).unwrap_err();
    assert!(matches!(err, UcError::ProgrammingTableMiss(_)));
}

#[test]
fn test_rejects_unknown_version() {
    let err = pipeline::compile_list(&utils::and_circuit(), &valiant_config(3)).unwrap_err();
    assert!(matches!(err, UcError::InputMalformed(_)));
}
