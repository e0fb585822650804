//! CLI entry point for parley_graph.
//! Usage: cargo run -p parley_graph -- check conversations/

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, warn};
use parley_data::REPLY_PLACEHOLDER;
use parley_graph::config::config_path;
use parley_graph::script::{goto_script, goto_target_value};
use parley_graph::{
    Graph, ParleyConfig, decode_document, decode_str, encode_graph, encode_to_string, lint_graph, load_config,
};
use serde_yaml::{Mapping, Value};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about = "Convert conversation documents to dialogue graphs and back.")]
struct Cli {
    /// Configuration file (defaults to ./parley.toml when present).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a YAML conversation into graph JSON.
    Decode(ConvertArgs),
    /// Encode graph JSON back into a YAML conversation.
    Encode(ConvertArgs),
    /// Lint conversations and verify they survive a decode/encode round trip.
    Check(CheckArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Input file.
    input: PathBuf,
    /// Write here instead of stdout.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    /// Conversation file or directory (searched recursively for .yml/.yaml).
    path: PathBuf,
    /// Treat lint issues as failures.
    #[arg(long)]
    deny_warnings: bool,
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();
    let config = match config_path(cli.config.as_deref()) {
        Some(path) => load_config(&path),
        None => ParleyConfig::default(),
    };

    match cli.command {
        Commands::Decode(args) => run_decode(&args, &config).map(|()| ExitCode::SUCCESS),
        Commands::Encode(args) => run_encode(&args, &config).map(|()| ExitCode::SUCCESS),
        Commands::Check(args) => run_check(&args, &config),
    }
}

fn run_decode(args: &ConvertArgs, config: &ParleyConfig) -> Result<()> {
    let text = read_input(&args.input)?;
    let graph =
        decode_str(&text, &config.layout).with_context(|| format!("decoding '{}'", args.input.display()))?;
    info!(
        "decoded {} nodes and {} edges from '{}'",
        graph.nodes.len(),
        graph.edges.len(),
        args.input.display()
    );
    let json = serde_json::to_string_pretty(&graph).context("serializing graph")?;
    write_output(args.out.as_deref(), &json)
}

fn run_encode(args: &ConvertArgs, config: &ParleyConfig) -> Result<()> {
    let text = read_input(&args.input)?;
    let graph: Graph =
        serde_json::from_str(&text).with_context(|| format!("parsing graph JSON from '{}'", args.input.display()))?;
    let (yaml, warnings) = encode_to_string(&graph, &config.encode).context("encoding graph")?;
    if !warnings.is_empty() {
        eprintln!("encode: {} option(s) or edge(s) degraded (see warnings)", warnings.len());
    }
    write_output(args.out.as_deref(), &yaml)
}

fn run_check(args: &CheckArgs, config: &ParleyConfig) -> Result<ExitCode> {
    let files = collect_conversation_files(&args.path)?;
    if files.is_empty() {
        eprintln!("check: no .yml/.yaml files under '{}'", args.path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut failures = 0usize;
    let mut issues = 0usize;
    for file in &files {
        match check_one_file(file, config) {
            Ok(count) => issues += count,
            Err(e) => {
                eprintln!("check: {}: {:#}", file.display(), e);
                failures += 1;
            },
        }
    }

    eprintln!(
        "check: {} file(s), {} failure(s), {} lint issue(s)",
        files.len(),
        failures,
        issues
    );
    if failures > 0 || (args.deny_warnings && issues > 0) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Decode, lint and re-encode one file; returns the number of lint issues.
fn check_one_file(path: &Path, config: &ParleyConfig) -> Result<usize> {
    let text = read_input(path)?;
    let document: Value = serde_yaml::from_str(&text).context("parsing yaml")?;
    let graph = decode_document(&document, &config.layout)?;

    let issues = lint_graph(&graph);
    for issue in &issues {
        println!("{}: {}", path.display(), issue);
    }

    let encoded = encode_graph(&graph, &config.encode);
    for warning in &encoded.warnings {
        warn!("{}: {}", path.display(), warning);
    }
    if let Some(difference) = round_trip_difference(&document, &encoded.document) {
        bail!("round trip changed the document: {difference}");
    }
    debug!("{}: round trip ok ({} nodes)", path.display(), graph.nodes.len());
    Ok(issues.len())
}

/// Describe the first difference the editor would introduce, ignoring the
/// normalizations it makes on purpose (string `npc` → list, default metadata).
fn round_trip_difference(original: &Value, encoded: &Value) -> Option<String> {
    let (Some(original), Some(encoded)) = (original.as_mapping(), encoded.as_mapping()) else {
        return None;
    };
    let original_keys: Vec<&Value> = original.keys().collect();
    let encoded_keys: Vec<&Value> = encoded
        .keys()
        .filter(|key| original.contains_key(*key))
        .collect();
    if original_keys != encoded_keys {
        return Some("section order or set differs".to_string());
    }
    for (key, value) in original {
        let normalized = normalize_section(value);
        if encoded.get(key) != Some(&normalized) {
            return Some(format!("section {} differs", key.as_str().unwrap_or("<non-string key>")));
        }
    }
    None
}

fn normalize_section(section: &Value) -> Value {
    let Some(map) = section.as_mapping() else {
        return section.clone();
    };
    if !(map.contains_key("npc") || map.contains_key("player")) {
        return section.clone();
    }
    let mut normalized = Mapping::new();
    for (key, value) in map {
        let value = match (key.as_str(), value) {
            (Some("npc"), Value::Null) => Value::Sequence(Vec::new()),
            (Some("npc"), Value::String(line)) => Value::Sequence(vec![Value::String(line.clone())]),
            (Some("player"), Value::Sequence(options)) => {
                Value::Sequence(options.iter().map(normalize_option).collect())
            },
            (Some("player"), _) => Value::Sequence(Vec::new()),
            _ => value.clone(),
        };
        normalized.insert(key.clone(), value);
    }
    for key in ["npc", "player"] {
        if !normalized.contains_key(key) {
            normalized.insert(key.into(), Value::Sequence(Vec::new()));
        }
    }
    Value::Mapping(normalized)
}

fn normalize_option(option: &Value) -> Value {
    let mut normalized = Mapping::new();
    match option {
        Value::String(reply) => {
            normalized.insert("reply".into(), Value::String(reply.clone()));
        },
        Value::Mapping(map) => {
            for (key, value) in map {
                match (key.as_str(), value) {
                    (Some("then"), Value::Null) => {},
                    (Some("then"), script) => {
                        let script = goto_target_value(script)
                            .map_or_else(|| script.clone(), |target| goto_script(target).into());
                        normalized.insert(key.clone(), script);
                    },
                    _ => {
                        normalized.insert(key.clone(), value.clone());
                    },
                }
            }
            if !normalized.contains_key("reply") {
                normalized.insert("reply".into(), REPLY_PLACEHOLDER.into());
            }
        },
        other => return other.clone(),
    }
    Value::Mapping(normalized)
}

fn collect_conversation_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking '{}'", root.display()))?;
        let is_yaml = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if entry.file_type().is_file() && is_yaml {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading '{}'", path.display()))
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(path) => fs::write(path, contents).with_context(|| format!("writing '{}'", path.display())),
        None => {
            println!("{contents}");
            Ok(())
        },
    }
}
