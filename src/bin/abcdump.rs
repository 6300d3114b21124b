//! CLI tool for inspecting compiled ABC modules
//!
//! Usage: abcdump [options] <module.abc>
//!
//! Options:
//!   --json             Print the decoded module graph as JSON
//!   --config <file>    Runtime config (JSON) to decode with
//!   --verbose          Trace every decoded record
//!
//! Log output goes to stderr and is filtered by `RUST_LOG` (default `info`).

use std::env;
use std::fs;
use std::path::PathBuf;

use asrun::{DecodeOptions, Decoder, ModuleGraph, RuntimeConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// CLI configuration
struct Args {
    module_path: PathBuf,
    config_path: Option<PathBuf>,
    json: bool,
    verbose: bool,
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let program_name = args.first().map_or("abcdump", |s| s.as_str());

    let mut config_path = None;
    let mut json = false;
    let mut verbose = false;
    let mut module_arg: Option<&str> = None;

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--verbose" => verbose = true,
            "--config" => {
                let path = rest
                    .next()
                    .ok_or_else(|| "--config requires a file argument".to_string())?;
                config_path = Some(PathBuf::from(path));
            }
            other if other.starts_with("--") => {
                return Err(format!("Unknown option: {}", other));
            }
            other => {
                if module_arg.is_some() {
                    return Err("Only one module file may be given".to_string());
                }
                module_arg = Some(other);
            }
        }
    }

    let module_path = module_arg
        .map(PathBuf::from)
        .ok_or_else(|| format!("Usage: {} [--json] [--config <file>] [--verbose] <module.abc>", program_name))?;

    Ok(Args {
        module_path,
        config_path,
        json,
        verbose,
    })
}

fn run() -> Result<(), String> {
    let args = parse_args()?;

    let mut config = match &args.config_path {
        Some(path) => RuntimeConfig::from_file(path)
            .map_err(|e| format!("{}: {}", path.display(), e))?,
        None => RuntimeConfig::default(),
    };
    if args.verbose {
        config.verbose_parse = true;
    }

    let bytes = fs::read(&args.module_path)
        .map_err(|e| format!("{}: {}", args.module_path.display(), e))?;

    let decoder = Decoder::new(DecodeOptions::from(&config));
    let graph = decoder
        .decode(&bytes)
        .map_err(|e| format!("{}: {}", args.module_path.display(), e))?;

    summarize(&graph);

    if args.json {
        let json = serde_json::to_string_pretty(&graph).map_err(|e| e.to_string())?;
        println!("{}", json);
    }
    Ok(())
}

fn summarize(graph: &ModuleGraph) {
    let pool = &graph.constant_pool;
    info!(
        version = %format!("{}.{}", graph.major_version, graph.minor_version),
        strings = pool.string_count() - 1,
        multinames = pool.multiname_count() - 1,
        methods = graph.methods.len(),
        classes = graph.classes.len(),
        scripts = graph.scripts.len(),
        bodies = graph.bodies.len(),
        "module"
    );

    for (index, instance) in graph.instances.iter().enumerate() {
        info!(
            class = index,
            name = %graph.multiname_display(instance.name),
            extends = %graph.multiname_display(instance.super_name),
            traits = instance.traits.len(),
            "class"
        );
        for t in &instance.traits {
            info!(
                name = %graph.multiname_display(t.name),
                kind = ?t.kind(),
                "  trait"
            );
        }
    }

    for (index, script) in graph.scripts.iter().enumerate() {
        let code = graph.method_body(script.init).map_or(0, |body| body.code.len());
        info!(script = index, init = %graph.method_name(script.init), code, "script");
    }
}
