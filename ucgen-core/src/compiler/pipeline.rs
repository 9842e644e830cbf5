//! Compilation Pipeline
//!
//! Orchestrates the complete run from gate-list text to the emitted circuit
//! and programming files, in the fixed stage order the construction
//! requires:
//!
//! 1. **Parse**: read the textual gate list
//! 2. **Normalise**: insert copy gates until every fanout is at most 2
//! 3. **Supergraph**: build the Γ₂ graph with canonicalised gate tables
//! 4. **Split tree**: recursive edge two-colouring, plus the parity sweep
//! 5. **Skeleton**: build the empty universal graph for the chosen split
//! 6. **Embedding**: program recursion points and blocks from the tree
//! 7. **Validation**: per-block and end-to-end embedding checks
//! 8. **Finalisation**: pole roles, truth tables, topological numbering
//! 9. **Emission**: render the circuit and programming files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compiler::emitter::{self, EmitCounts};
use crate::compiler::error::UcError;
use crate::compiler::gamma::gamma2::{random_gamma2, Gamma2};
use crate::compiler::hybrid::HybridChoice;
use crate::compiler::normalizer;
use crate::compiler::parser::{self, GateList};
use crate::compiler::uc::circuit::UniversalCircuit;
use crate::compiler::uc::zhao::ZhaoTable;
use crate::compiler::validator;

/// Construction selection, passed down the pipeline instead of global
/// state.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Split selection: 0 hybrid, 2 two-way, 4 four-way, -2 accepted as a
    /// legacy alias of the two-way construction.
    pub version: i32,
    /// Use Valiant's 4-way body blocks instead of Zhao's.
    pub valiant: bool,
    /// Zhao programming table location; required for Zhao body blocks.
    pub zhao_table: Option<PathBuf>,
    /// Directory for the emitted files; next to the input by default.
    pub output_dir: Option<PathBuf>,
    /// Write graphviz renderings of the split tree and the universal
    /// circuit into this directory.
    pub dump_graphs: Option<PathBuf>,
}

/// Statistics collected during a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    pub inputs: usize,
    pub outputs: usize,
    pub gates: usize,
    pub supergraph_nodes: usize,
    pub supergraph_edges: usize,
    pub uc_nodes: usize,
    pub x_switches: usize,
    pub y_switches: usize,
    pub universal_gates: usize,
}

/// Outcome of an in-memory compilation.
#[derive(Debug)]
pub struct CompileResult {
    pub normalized: GateList,
    pub circuit: String,
    pub programming: String,
    pub stats: PipelineStats,
}

/// Resolve the requested version to the top-level split parameter.
fn resolve_version(version: i32) -> Result<u32, UcError> {
    match version {
        0 | 2 | 4 => Ok(version as u32),
        -2 => {
            log::info!("legacy two-way selector requested; using the two-way construction");
            Ok(2)
        }
        other => Err(UcError::InputMalformed(format!(
            "unknown construction version {}",
            other
        ))),
    }
}

/// Load the Zhao table if the configuration calls for Zhao body blocks,
/// falling back to Valiant's blocks when none is available.
fn resolve_zhao(config: &Config, version: u32) -> Result<(bool, ZhaoTable), UcError> {
    let wants_zhao = !config.valiant && (version == 0 || version == 4);
    if !wants_zhao {
        return Ok((false, ZhaoTable::empty()));
    }
    match &config.zhao_table {
        Some(path) => {
            let table = ZhaoTable::load(path)?;
            log::info!("loaded Zhao programming table ({} entries)", table.len());
            Ok((true, table))
        }
        None => {
            log::warn!("no Zhao programming table configured; using Valiant body blocks");
            Ok((false, ZhaoTable::empty()))
        }
    }
}

/// Compile a gate-list text into circuit and programming file bodies.
pub fn compile_text(text: &str, config: &Config) -> Result<CompileResult, UcError> {
    log::info!("Step 1: Parsing gate list...");
    let list = parser::parse_gate_list(text)?;
    compile_list(&list, config)
}

/// Compile a parsed gate list into circuit and programming file bodies.
pub fn compile_list(list: &GateList, config: &Config) -> Result<CompileResult, UcError> {
    let version = resolve_version(config.version)?;
    let (zhao, mapping) = resolve_zhao(config, version)?;

    log::info!("Step 2: Normalising fanout...");
    let normalized = normalizer::normalize(list)?;

    log::info!("Step 3: Building the supergraph...");
    let (mut dag, inputs, outputs) = parser::build_gamma2(&normalized)?;
    let n = dag.len();
    let edges = dag.edge_count();
    log::info!(
        "supergraph: {} nodes ({} inputs, {} outputs), {} edges",
        n,
        inputs,
        outputs,
        edges
    );

    let choice = HybridChoice::build(n, zhao);
    let hybrid = version == 0;
    let top_k = if hybrid { choice.next_k(n) } else { version };

    log::info!("Step 4: Building the split tree (k = {})...", top_k);
    dag.create_subgraphs(0, true, top_k == 4, hybrid, &choice)?;
    dag.check_subgraphs();

    log::info!("Step 5: Building the universal graph skeleton...");
    let mut uc = UniversalCircuit::build(n, version, zhao, &choice);

    log::info!("Step 6: Embedding edges...");
    uc.embed(&mut dag, &mapping)?;

    log::info!("Step 7: Validating the embedding...");
    validator::validate_block_embedding(&uc)?;
    validator::validate_recursion_point_embedding(&uc, &dag)?;

    log::info!("Step 8: Finalising poles and numbering...");
    uc.finalize(&mut dag, inputs, outputs, zhao)?;

    if let Some(dir) = &config.dump_graphs {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join("gamma2.dot"), crate::compiler::debug::gamma2_dot(&dag))?;
        std::fs::write(dir.join("uc.dot"), crate::compiler::debug::uc_dot(&uc))?;
        log::info!("wrote graphviz dumps into {}", dir.display());
    }

    log::info!("Step 9: Emitting circuit and programming...");
    let (circuit, programming, counts) = emitter::emit(&uc, &dag);

    let stats = build_stats(inputs, outputs, n, edges, uc.size(), counts);
    log::info!(
        "done: {} universal gates, {} X switches, {} Y switches",
        stats.universal_gates,
        stats.x_switches,
        stats.y_switches
    );

    Ok(CompileResult {
        normalized,
        circuit,
        programming,
        stats,
    })
}

fn build_stats(
    inputs: usize,
    outputs: usize,
    n: usize,
    edges: usize,
    uc_nodes: usize,
    counts: EmitCounts,
) -> PipelineStats {
    PipelineStats {
        inputs,
        outputs,
        gates: n - inputs - outputs,
        supergraph_nodes: n,
        supergraph_edges: edges,
        uc_nodes,
        x_switches: counts.x_switches,
        y_switches: counts.y_switches,
        universal_gates: counts.universal_gates,
    }
}

/// Compile a gate-list file and write the three output files next to it
/// (or into the configured output directory).
///
/// # Returns
/// The circuit and programming file paths plus the run statistics.
pub fn compile_file(
    path: &Path,
    config: &Config,
) -> Result<(PathBuf, PathBuf, PipelineStats), UcError> {
    let text = std::fs::read_to_string(path)?;
    let result = compile_text(&text, config)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "circuit".to_string());
    let dir = config
        .output_dir
        .clone()
        .or_else(|| path.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)?;

    let mod_path = dir.join(format!("{}_mod.circuit", file_name));
    let circuit_path = dir.join(format!("{}_circ.txt", file_name));
    let programming_path = dir.join(format!("{}_prog.txt", file_name));

    std::fs::write(&mod_path, result.normalized.to_text())?;
    std::fs::write(&circuit_path, &result.circuit)?;
    std::fs::write(&programming_path, &result.programming)?;
    log::info!(
        "wrote {}, {} and {}",
        mod_path.display(),
        circuit_path.display(),
        programming_path.display()
    );

    Ok((circuit_path, programming_path, result.stats))
}

/// Build, embed and validate the universal graph of a random Γ₂ graph.
///
/// Stress-tests the construction without emitting files; a random graph
/// declares no inputs or outputs to emit.
pub fn random_construction<R: rand::Rng>(
    n: usize,
    config: &Config,
    rng: &mut R,
) -> Result<PipelineStats, UcError> {
    let version = resolve_version(config.version)?;
    let (zhao, mapping) = resolve_zhao(config, version)?;

    log::info!("random construction over {} nodes", n);
    let mut dag: Gamma2 = random_gamma2(n, rng);
    let edges = dag.edge_count();

    let choice = HybridChoice::build(n, zhao);
    let hybrid = version == 0;
    let top_k = if hybrid { choice.next_k(n) } else { version };

    dag.create_subgraphs(0, true, top_k == 4, hybrid, &choice)?;
    dag.check_subgraphs();

    let mut uc = UniversalCircuit::build(n, version, zhao, &choice);
    uc.embed(&mut dag, &mapping)?;

    validator::validate_block_embedding(&uc)?;
    validator::validate_recursion_point_embedding(&uc, &dag)?;

    Ok(build_stats(
        0,
        0,
        n,
        edges,
        uc.size(),
        EmitCounts::default(),
    ))
}
