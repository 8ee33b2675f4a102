//! restscan command-line interface
//!
//! This binary provides the main entry point for restscan: it reads the
//! configuration, opens the search path, runs the analysis and writes the
//! rendered document.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

use std::env;
use std::path::PathBuf;

use config::{BackendKind, Config};
use log::{info, warn};
use model::{DocumentInfo, RenderBackend};

fn main() {
    let args: Vec<String> = env::args().collect();

    // Handle help flag
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("restscan — static REST surface extraction from compiled class artifacts");
        println!();
        println!("USAGE:");
        println!("    restscan analyze --project <path>... [FLAGS]");
        println!();
        println!("SUBCOMMANDS:");
        println!("    analyze                       Analyze project locations and emit the surface document");
        println!("    --help, -h                    Show this help message");
        println!("FLAGS:");
        println!("    --project <path>              Directory or archive of compiled classes to scan (repeatable) [REQUIRED]");
        println!("    --classpath <path>            Additional location searched for type resolution only (repeatable)");
        println!("    --config <file>               Configuration file (TOML); defaults to the user config dir");
        println!("    --backend <swagger|plaintext> Output renderer (default swagger)");
        println!("    --output <file>               Write the document to <file> instead of standard output");
        println!("    --name <string>               Project name rendered into the document");
        println!("    --project-version <string>    Project version rendered into the document");
        println!("    --domain <string>             Host domain rendered into the document");
        println!();
        println!("EXAMPLES:");
        println!("    restscan analyze --project target/classes");
        println!("    restscan analyze --project app.jar --classpath lib/deps.jar --backend plaintext --output surface.txt");
        return;
    }

    if !args.iter().any(|a| a == "analyze") {
        eprintln!("Error: No valid subcommand provided");
        eprintln!("Use 'restscan --help' for usage information");
        std::process::exit(1);
    }

    // Collect repeatable location flags.
    let project = flag_values(&args, "--project");
    if project.is_empty() {
        eprintln!("Error: at least one --project <path> is required");
        eprintln!("Use 'restscan --help' for usage information");
        std::process::exit(1);
    }
    let classpath = flag_values(&args, "--classpath");

    for location in project.iter().chain(classpath.iter()) {
        if !location.exists() {
            eprintln!("Error: location does not exist: {}", location.display());
            std::process::exit(1);
        }
    }

    // Configuration file, then flag overrides.
    let mut config = match flag_value(&args, "--config") {
        Some(path) => match Config::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: failed to load config '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        None => Config::default_path()
            .ok()
            .filter(|p| p.exists())
            .and_then(|p| Config::from_file(&p).ok())
            .unwrap_or_default(),
    };
    if let Some(backend) = flag_value(&args, "--backend") {
        config.output.backend = match backend.parse::<BackendKind>() {
            Ok(kind) => kind,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
    }
    if let Some(output) = flag_value(&args, "--output") {
        config.output.location = Some(PathBuf::from(output));
    }
    if let Some(name) = flag_value(&args, "--name") {
        config.project.name = name;
    }
    if let Some(version) = flag_value(&args, "--project-version") {
        config.project.version = version;
    }
    if let Some(domain) = flag_value(&args, "--domain") {
        config.project.domain = domain;
    }

    logging::init(&config.logging.level);

    let options = pipeline::AnalyzeOptions { project, classpath };
    let report = match pipeline::analyze(&options) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "scanned {} classes, {} resource classes, {} interpreted summaries",
        report.stats.project_classes,
        report.stats.resource_classes,
        report.stats.interpreted_summaries
    );

    // An empty surface is a successful run with no document.
    if report.resources.is_empty() {
        warn!("no resources discovered; no document written");
        return;
    }

    let backend: Box<dyn RenderBackend> = match config.output.backend {
        BackendKind::Swagger => Box::new(swagger::SwaggerBackend::new()),
        BackendKind::Plaintext => Box::new(text::TextBackend::new()),
    };
    let document_info = DocumentInfo {
        project_name: config.project.name.clone(),
        project_version: config.project.version.clone(),
        domain: config.project.domain.clone(),
    };
    let rendered = backend.render(&report.resources, &document_info);

    match &config.output.location {
        Some(path) => {
            if let Err(e) = std::fs::write(path, rendered) {
                eprintln!("Error: failed to write {}: {}", path.display(), e);
                std::process::exit(1);
            }
            info!("{} document written to {}", backend.name(), path.display());
        }
        None => print!("{}", rendered),
    }
}

/// All values of a repeatable `--flag value` pair.
fn flag_values(args: &[String], flag: &str) -> Vec<PathBuf> {
    args.iter()
        .enumerate()
        .filter(|(_, a)| a.as_str() == flag)
        .filter_map(|(i, _)| args.get(i + 1))
        .map(PathBuf::from)
        .collect()
}

/// The value of a single-use `--flag value` pair.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1)).cloned()
}
