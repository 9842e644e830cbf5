//! Gate-List Parser
//!
//! This module parses the line-oriented textual gate-list format and builds
//! the Γ₂ supergraph the rest of the pipeline works on.
//!
//! # Gate-List Format
//! - `<id> input` — declares an input wire
//! - `<id> [output] gate arity <a> table [ b0 b1 [b2 b3] ] inputs [ w1 [w2] ]`
//!   — declares a gate; arity 1 tables have 2 bits, arity 2 tables 4 bits in
//!   ordered-inputs order
//! - `outputs w1 w2 ...` — names the output wires in emission order
//!
//! Wire ids are dense and appear in topological order: inputs first, then
//! gates. The Γ₂ reader appends one extra node per declared output.

use crate::compiler::error::UcError;
use crate::compiler::gamma::Gamma2;

/// A single parsed gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    /// Wire id of the gate.
    pub id: u32,
    /// True if the gate is flagged as a circuit output.
    pub is_output: bool,
    /// Arity, 1 or 2.
    pub arity: u8,
    /// Declared truth-table bits in ordered-inputs order; arity 1 uses the
    /// first two entries.
    pub table: [u16; 4],
    /// Declared input wires; arity 1 uses the first entry.
    pub inputs: [u32; 2],
}

/// One line of the gate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// `<id> input`
    Input { id: u32 },
    /// A gate declaration.
    Gate(Gate),
}

impl Entry {
    /// Wire id of the entry.
    pub fn id(&self) -> u32 {
        match self {
            Entry::Input { id } => *id,
            Entry::Gate(gate) => gate.id,
        }
    }
}

/// Parsed gate list: the wire declarations in file order plus the output
/// order line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateList {
    pub entries: Vec<Entry>,
    pub outputs: Vec<u32>,
}

impl GateList {
    /// Number of declared inputs.
    pub fn num_inputs(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Input { .. }))
            .count()
    }

    /// Number of declared gates.
    pub fn num_gates(&self) -> usize {
        self.entries.len() - self.num_inputs()
    }

    /// Number of wires (inputs + gates).
    pub fn num_wires(&self) -> usize {
        self.entries.len()
    }

    /// Render the gate list back into its textual format.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.entries.len() * 48);
        for entry in &self.entries {
            match entry {
                Entry::Input { id } => {
                    out.push_str(&format!("{} input\n", id));
                }
                Entry::Gate(gate) => {
                    out.push_str(&format!("{}", gate.id));
                    if gate.is_output {
                        out.push_str(" output");
                    }
                    out.push_str(&format!(" gate arity {} table [ ", gate.arity));
                    for i in 0..(gate.arity as usize * 2) {
                        out.push_str(&format!("{} ", gate.table[i]));
                    }
                    out.push_str("] inputs [ ");
                    for i in 0..gate.arity as usize {
                        out.push_str(&format!("{} ", gate.inputs[i]));
                    }
                    out.push_str("]\n");
                }
            }
        }
        out.push_str("outputs");
        for w in &self.outputs {
            out.push_str(&format!(" {}", w));
        }
        out.push('\n');
        out
    }
}

/// Parse a decimal token, citing the line on failure.
fn parse_num(token: &str, line_no: usize) -> Result<u32, UcError> {
    token
        .parse::<u32>()
        .map_err(|_| UcError::InputMalformed(format!("line {}: bad number '{}'", line_no, token)))
}

/// Parse the textual gate-list format.
///
/// # Errors
/// `InputMalformed` with the offending line number for every structural
/// problem; the core never sees a partially parsed list.
pub fn parse_gate_list(text: &str) -> Result<GateList, UcError> {
    let mut list = GateList::default();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        if tokens[0] == "outputs" {
            for token in &tokens[1..] {
                list.outputs.push(parse_num(token, line_no)?);
            }
            continue;
        }

        let id = parse_num(tokens[0], line_no)?;
        match tokens.get(1) {
            Some(&"input") => {
                list.entries.push(Entry::Input { id });
            }
            Some(&"output") | Some(&"gate") => {
                let is_output = tokens[1] == "output";
                // <id> [output] gate arity <a> table [ bits ] inputs [ wires ]
                let gate_base = if is_output { 2 } else { 1 };
                if tokens.get(gate_base) != Some(&"gate") {
                    return Err(UcError::InputMalformed(format!(
                        "line {}: expected 'gate'",
                        line_no
                    )));
                }
                if tokens.get(gate_base + 1) != Some(&"arity") {
                    return Err(UcError::InputMalformed(format!(
                        "line {}: expected 'arity'",
                        line_no
                    )));
                }
                let arity = parse_num(
                    tokens.get(gate_base + 2).ok_or_else(|| {
                        UcError::InputMalformed(format!("line {}: missing arity", line_no))
                    })?,
                    line_no,
                )? as u8;
                if arity == 0 || arity > 2 {
                    return Err(UcError::InputMalformed(format!(
                        "line {}: arity {} out of range",
                        line_no, arity
                    )));
                }
                let bits = arity as usize * 2;
                // table [ b... ] starts after "table [".
                let table_base = gate_base + 5;
                let mut table = [0u16; 4];
                for i in 0..bits {
                    let token = tokens.get(table_base + i).ok_or_else(|| {
                        UcError::InputMalformed(format!("line {}: truncated table", line_no))
                    })?;
                    table[i] = parse_num(token, line_no)? as u16;
                }
                // inputs [ w... ] after "] inputs [".
                let inputs_base = table_base + bits + 3;
                let mut inputs = [0u32; 2];
                for i in 0..arity as usize {
                    let token = tokens.get(inputs_base + i).ok_or_else(|| {
                        UcError::InputMalformed(format!("line {}: truncated inputs", line_no))
                    })?;
                    inputs[i] = parse_num(token, line_no)?;
                }
                list.entries.push(Entry::Gate(Gate {
                    id,
                    is_output,
                    arity,
                    table,
                    inputs,
                }));
            }
            _ => {
                return Err(UcError::InputMalformed(format!(
                    "line {}: unrecognised declaration",
                    line_no
                )));
            }
        }
    }

    if list.entries.is_empty() {
        return Err(UcError::InputMalformed("empty gate list".to_string()));
    }
    if list.outputs.is_empty() {
        // No outputs line: fall back to the output-flagged gates in
        // declaration order.
        for entry in &list.entries {
            if let Entry::Gate(gate) = entry {
                if gate.is_output {
                    list.outputs.push(gate.id);
                }
            }
        }
        if list.outputs.is_empty() {
            return Err(UcError::InputMalformed(
                "gate list declares no outputs".to_string(),
            ));
        }
        log::warn!("no outputs line; using the output-flagged gates");
    }
    for (i, entry) in list.entries.iter().enumerate() {
        if entry.id() as usize != i {
            return Err(UcError::InputMalformed(format!(
                "wire {} declared at position {}",
                entry.id(),
                i
            )));
        }
    }
    for &w in &list.outputs {
        if w as usize >= list.entries.len() {
            return Err(UcError::InputMalformed(format!(
                "output names undeclared wire {}",
                w
            )));
        }
    }

    Ok(list)
}

/// Build the Γ₂ supergraph of a normalised gate list.
///
/// # Algorithm
/// Every wire becomes the Γ₂ node at its id; one node per declared output is
/// appended and flagged, with an edge from the wire it names. Gate edges are
/// inserted second-declared-input first, so the parent slot each named input
/// lands in is known, and the truth table is canonicalised to
/// `f(left_val, right_val)` accordingly:
/// - arity 1, input in the left slot: `(c0, c0, c1, c1)`
/// - arity 1, input in the right slot: `(c0, c1, c0, c1)`
/// - arity 2, declared order matching the slots: `(c0, c1, c2, c3)`
/// - arity 2, declared order crossed: `(c0, c2, c1, c3)`
///
/// # Returns
/// The supergraph plus the input and output counts.
///
/// # Errors
/// `InputMalformed` if the list has not been fanout-normalised (a slot
/// insert fails) or an input feeds a gate before being declared.
pub fn build_gamma2(list: &GateList) -> Result<(Gamma2, usize, usize), UcError> {
    let wires = list.num_wires();
    let out_num = list.outputs.len();
    let mut g = Gamma2::new(wires + out_num);
    let mut inputs = 0usize;

    for entry in &list.entries {
        match entry {
            Entry::Input { .. } => {
                inputs += 1;
            }
            Entry::Gate(gate) => {
                let num = gate.id as usize;
                let c = gate.table;
                if gate.arity == 2 {
                    let input2 = gate.inputs[1] as usize;
                    g.add_edge(input2, num);
                }
                let input1 = gate.inputs[0] as usize;
                g.add_edge(input1, num);

                if gate.arity == 1 {
                    if g.nodes[num].left_parent == Some(input1) {
                        g.nodes[num].set_function_bits(c[0], c[0], c[1], c[1]);
                    } else if g.nodes[num].right_parent == Some(input1) {
                        g.nodes[num].set_function_bits(c[0], c[1], c[0], c[1]);
                    }
                } else {
                    let input2 = gate.inputs[1] as usize;
                    if g.nodes[num].left_parent == Some(input1)
                        && g.nodes[num].right_parent == Some(input2)
                    {
                        g.nodes[num].set_function_bits(c[0], c[1], c[2], c[3]);
                    } else if g.nodes[num].right_parent == Some(input1)
                        && g.nodes[num].left_parent == Some(input2)
                    {
                        g.nodes[num].set_function_bits(c[0], c[2], c[1], c[3]);
                    } else {
                        return Err(UcError::InputMalformed(format!(
                            "gate {}: input wires {} {} could not be attached",
                            num, input1, input2
                        )));
                    }
                }
            }
        }
    }

    for (i, &w) in list.outputs.iter().enumerate() {
        let k = wires + i;
        g.add_edge(w as usize, k);
        g.nodes[k].output = true;
        // Function bits of output nodes are set during finalisation.
    }

    Ok((g, inputs, out_num))
}
