//! Unit tests for the gate-list parser and the Γ₂ reader

mod utils;

use ucgen_core::compiler::error::UcError;
use ucgen_core::compiler::parser::{build_gamma2, parse_gate_list, Entry};

const AND_TEXT: &str = "\
0 input
1 input
2 output gate arity 2 table [ 0 0 0 1 ] inputs [ 0 1 ]
outputs 2
";

#[test]
fn test_parse_and_circuit() {
    let list = parse_gate_list(AND_TEXT).expect("parse");
    assert_eq!(list.num_inputs(), 2);
    assert_eq!(list.num_gates(), 1);
    assert_eq!(list.outputs, vec![2]);
    let Entry::Gate(gate) = &list.entries[2] else {
        panic!("expected a gate");
    };
    assert!(gate.is_output);
    assert_eq!(gate.arity, 2);
    assert_eq!(&gate.table[..], &[0, 0, 0, 1]);
    assert_eq!(gate.inputs, [0, 1]);
}

#[test]
fn test_text_round_trip() {
    let list = parse_gate_list(AND_TEXT).expect("parse");
    let reparsed = parse_gate_list(&list.to_text()).expect("reparse");
    assert_eq!(list, reparsed);

    let adder = utils::ripple_adder(8);
    let reparsed = parse_gate_list(&adder.to_text()).expect("reparse adder");
    assert_eq!(adder, reparsed);
}

#[test]
fn test_reject_malformed_lines() {
    assert!(matches!(
        parse_gate_list("0 input\n1 frobnicate\noutputs 0\n"),
        Err(UcError::InputMalformed(_))
    ));
    assert!(matches!(
        parse_gate_list("0 input\n1 gate arity 2 table [ 0 1 ] inputs [ 0 0 ]\noutputs 1\n"),
        Err(UcError::InputMalformed(_))
    ));
    // Output naming an undeclared wire.
    assert!(matches!(
        parse_gate_list("0 input\noutputs 7\n"),
        Err(UcError::InputMalformed(_))
    ));
    // Wire ids out of order.
    assert!(matches!(
        parse_gate_list("1 input\noutputs 1\n"),
        Err(UcError::InputMalformed(_))
    ));
}

#[test]
fn test_gamma2_shape() {
    let list = parse_gate_list(AND_TEXT).expect("parse");
    let (g, inputs, outputs) = build_gamma2(&list).expect("gamma2");
    assert_eq!(inputs, 2);
    assert_eq!(outputs, 1);
    // Two inputs, one gate, one appended output node.
    assert_eq!(g.len(), 4);
    assert_eq!(g.edge_count(), 3);
    assert!(g.nodes[3].output);
    // The gate's two parents are the two inputs.
    let gate = &g.nodes[2];
    let mut parents = [gate.left_parent, gate.right_parent];
    parents.sort();
    assert_eq!(parents, [Some(0), Some(1)]);
}

#[test]
fn test_table_canonicalisation_reorders_bits() {
    // The reader attaches the second declared input first, so it lands in
    // the left parent slot and the stored table swaps its middle bits.
    let list = parse_gate_list(AND_TEXT).expect("parse");
    let (g, _, _) = build_gamma2(&list).expect("gamma2");
    // AND is symmetric: the canonical table is unchanged either way.
    assert_eq!(g.nodes[2].function_bits, [0, 0, 0, 1]);

    // An asymmetric table: f(a, b) = !a AND b, declared [ 0 1 0 0 ].
    let text = "\
0 input
1 input
2 output gate arity 2 table [ 0 1 0 0 ] inputs [ 0 1 ]
outputs 2
";
    let list = parse_gate_list(text).expect("parse");
    let (g, _, _) = build_gamma2(&list).expect("gamma2");
    // Wire 1 sits in the left slot, wire 0 in the right: stored as
    // (f0, f2, f1, f3).
    assert_eq!(g.nodes[2].left_parent, Some(1));
    assert_eq!(g.nodes[2].right_parent, Some(0));
    assert_eq!(g.nodes[2].function_bits, [0, 0, 1, 0]);
}

#[test]
fn test_missing_outputs_line_uses_flagged_gates() {
    let text = "\
0 input
1 input
2 output gate arity 2 table [ 0 1 1 0 ] inputs [ 0 1 ]
";
    let list = parse_gate_list(text).expect("parse");
    assert_eq!(list.outputs, vec![2]);
}
