// CLI driver for the universal circuit compiler
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use std::path::PathBuf;
use std::process::ExitCode;

use ucgen_core::compiler::bristol;
use ucgen_core::compiler::evaluator;
use ucgen_core::compiler::parser;
use ucgen_core::compiler::pipeline::{self, Config};

#[derive(Parser)]
#[command(name = "uc")]
#[command(about = "Compile a boolean circuit into a programmed universal circuit")]
#[command(version)]
struct Cli {
    /// Gate-list circuit file to compile
    file: Option<PathBuf>,

    /// Construction: 0 hybrid, 2 two-way, 4 four-way (-2 is accepted as
    /// the legacy two-way selector)
    #[arg(short = 'k', long = "variant", default_value = "0", allow_hyphen_values = true)]
    variant: i32,

    /// Use Valiant's 4-way body blocks instead of Zhao's
    #[arg(long)]
    valiant: bool,

    /// Zhao programming table file (required for Zhao body blocks)
    #[arg(long)]
    zhao_table: Option<PathBuf>,

    /// Convert the input from Bristol format before compiling
    #[arg(long)]
    bristol: bool,

    /// Build and validate the universal graph of a random circuit with
    /// this many nodes instead of compiling a file
    #[arg(long, value_name = "N")]
    random: Option<usize>,

    /// Seed for --random
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Evaluate the emitted files against the input circuit on random
    /// inputs after compiling
    #[arg(long)]
    check: bool,

    /// Number of random input vectors for --check
    #[arg(long, default_value = "64")]
    check_runs: usize,

    /// Directory for the emitted files (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write graphviz renderings of the split tree and universal circuit
    /// into this directory
    #[arg(long, value_name = "DIR")]
    dump_graphs: Option<PathBuf>,

    /// Print the run statistics as JSON
    #[arg(long)]
    stats_json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config {
        version: cli.variant,
        valiant: cli.valiant,
        zhao_table: cli.zhao_table.clone(),
        output_dir: cli.output_dir.clone(),
        dump_graphs: cli.dump_graphs.clone(),
    };

    if let Some(n) = cli.random {
        let pb = spinner("Building random universal graph...");
        let mut rng = rand::rngs::StdRng::seed_from_u64(cli.seed);
        let stats = pipeline::random_construction(n, &config, &mut rng)?;
        pb.finish_with_message("Construction validated");
        if cli.stats_json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "universal graph over {} nodes built and validated ({} nodes total)",
                stats.supergraph_nodes, stats.uc_nodes
            );
        }
        return Ok(());
    }

    let Some(file) = cli.file.as_ref() else {
        anyhow::bail!("no input file given (or use --random N)");
    };

    let mut text = std::fs::read_to_string(file)?;
    if cli.bristol {
        let pb = spinner("Converting Bristol circuit...");
        let list = bristol::bristol_to_gate_list(&text)?;
        text = list.to_text();
        pb.finish_with_message("Conversion complete");
    }

    let pb = spinner("Compiling universal circuit...");
    let result = pipeline::compile_text(&text, &config)?;
    pb.finish_with_message("Compilation complete");

    // Write the output files the same way the file-based entry point does.
    let dir = config
        .output_dir
        .clone()
        .or_else(|| file.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "circuit".to_string());
    let circuit_path = dir.join(format!("{}_circ.txt", file_name));
    let programming_path = dir.join(format!("{}_prog.txt", file_name));
    std::fs::write(dir.join(format!("{}_mod.circuit", file_name)), result.normalized.to_text())?;
    std::fs::write(&circuit_path, &result.circuit)?;
    std::fs::write(&programming_path, &result.programming)?;
    println!(
        "wrote {} and {}",
        circuit_path.display(),
        programming_path.display()
    );

    if cli.check {
        let pb = spinner("Checking evaluation round trip...");
        let list = parser::parse_gate_list(&text)?;
        let mut rng = rand::rngs::StdRng::seed_from_u64(cli.seed);
        for _ in 0..cli.check_runs {
            let inputs: Vec<bool> = (0..list.num_inputs()).map(|_| rand::Rng::gen(&mut rng)).collect();
            let expected = evaluator::eval_gate_list(&list, &inputs)?;
            let actual = evaluator::eval_uc(&result.circuit, &result.programming, &inputs)?;
            if expected != actual {
                anyhow::bail!(
                    "evaluation mismatch on inputs {:?}: circuit {:?}, universal circuit {:?}",
                    inputs,
                    expected,
                    actual
                );
            }
        }
        pb.finish_with_message("Round trip verified");
        println!("{} evaluation runs matched", cli.check_runs);
    }

    if cli.stats_json {
        println!("{}", serde_json::to_string_pretty(&result.stats)?);
    }

    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb
}
