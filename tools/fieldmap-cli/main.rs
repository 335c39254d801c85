use clap::{Parser, Subcommand};
use fieldmap::prelude::*;
use fieldmap::settings::Settings;
use fieldmap::suggest::parse_suggestions;
use serde::Serialize;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Compile, rebuild and bootstrap field-mapping canvases from JSON files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional settings JSON file
    #[arg(short, long, global = true)]
    settings: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a canvas document into a UI snapshot and an execution configuration
    Export {
        /// Path to the canvas JSON file (`{nodes, edges}`)
        canvas_path: String,
        /// Where to write the UI configuration
        #[arg(long, default_value = "ui_config.json")]
        ui_out: String,
        /// Where to write the execution configuration
        #[arg(long, default_value = "execution_config.json")]
        execution_out: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Rebuild a canvas document from a saved configuration
    Import {
        /// Path to a UI configuration, or to an execution configuration with `--execution-only`
        config_path: String,
        /// Execution configuration supplying array group-by settings
        #[arg(long)]
        execution: Option<String>,
        /// Treat the input as an execution configuration and lay the canvas out from scratch
        #[arg(long)]
        execution_only: bool,
        #[arg(short, long, default_value = "canvas.json")]
        out: String,
    },
    /// Turn a saved oracle response into a starting canvas
    Suggest {
        /// Path to the raw oracle response text
        response_path: String,
        /// Sample source records used to infer field types
        #[arg(long)]
        samples: Option<String>,
        #[arg(short, long, default_value = "canvas.json")]
        out: String,
    },
    /// Pack an execution configuration into a binary artifact
    Pack {
        execution_path: String,
        #[arg(short, long, default_value = "mapping.bin")]
        out: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => Settings::from_file(path).unwrap_or_else(|e| exit_with_error(&e.to_string())),
        None => Settings::default(),
    };

    let start = Instant::now();
    match cli.command {
        Command::Export {
            canvas_path,
            ui_out,
            execution_out,
            name,
            version,
        } => run_export(&settings, &canvas_path, &ui_out, &execution_out, name, version),
        Command::Import {
            config_path,
            execution,
            execution_only,
            out,
        } => run_import(&settings, &config_path, execution.as_deref(), execution_only, &out),
        Command::Suggest {
            response_path,
            samples,
            out,
        } => run_suggest(&settings, &response_path, samples.as_deref(), &out),
        Command::Pack { execution_path, out } => run_pack(&execution_path, &out),
    }
    println!("Done in {:?}", start.elapsed());
}

fn run_export(settings: &Settings, canvas_path: &str, ui_out: &str, execution_out: &str, name: String, version: Option<String>) {
    let graph = Graph::from_json(&read(canvas_path))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse canvas '{}': {}", canvas_path, e)));

    let mut builder = Exporter::builder().options(settings.export.clone()).name(name);
    if let Some(version) = version {
        builder = builder.version(version);
    }
    let output = builder.build().export(&graph);

    write_json(ui_out, &output.ui);
    write_json(execution_out, &output.execution);

    println!(
        "Exported {} nodes, {} connections and {} rules",
        graph.nodes().len(),
        output.ui.connections.len(),
        output.execution.mappings.len()
    );
    if !output.warnings.is_empty() {
        println!("\n--- Skipped ---");
        for warning in &output.warnings {
            println!("  -> {}", warning);
        }
    }
}

fn run_import(settings: &Settings, config_path: &str, execution: Option<&str>, execution_only: bool, out: &str) {
    let mut builder = Importer::builder().layout(settings.layout.clone());
    if let Some(path) = execution {
        builder = builder.execution(&parse_execution(path));
    }

    let graph = if execution_only {
        let config = parse_execution(config_path);
        builder.execution(&config).build().import_execution(&config)
    } else {
        let config = MappingConfiguration::from_json(&read(config_path))
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse configuration '{}': {}", config_path, e)));
        builder
            .build()
            .import(&config)
            .unwrap_or_else(|e| exit_with_error(&format!("Import failed: {}", e)))
    };

    write_json(out, &graph);
    println!("Rebuilt {} nodes and {} edges", graph.nodes().len(), graph.edges().len());
}

fn run_suggest(settings: &Settings, response_path: &str, samples: Option<&str>, out: &str) {
    let suggestions = parse_suggestions(&read(response_path))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read suggestions: {}", e)));
    let samples: Vec<serde_json::Value> = match samples {
        Some(path) => serde_json::from_str(&read(path))
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse samples '{}': {}", path, e))),
        None => Vec::new(),
    };

    let conversion = SuggestionSet::new(suggestions)
        .with_samples(samples)
        .with_layout(settings.layout.clone())
        .into_canvas();

    write_json(out, &conversion.graph);
    println!(
        "Created {} nodes and {} edges, skipped {} suggestions",
        conversion.graph.nodes().len(),
        conversion.graph.edges().len(),
        conversion.skipped.len()
    );
    for skipped in &conversion.skipped {
        println!(
            "  -> {} ({}): {}",
            skipped.target_field.as_deref().unwrap_or("<none>"),
            skipped.mapping_type,
            skipped.reason
        );
    }
}

fn run_pack(execution_path: &str, out: &str) {
    let config = parse_execution(execution_path);
    if let Err(e) = config.validate() {
        exit_with_error(&e.to_string());
    }
    let artifact = MappingArtifact::pack(&config).unwrap_or_else(|e| exit_with_error(&e.to_string()));
    artifact.save(out).unwrap_or_else(|e| exit_with_error(&e.to_string()));
    println!("Packed {} rules into '{}'", artifact.rule_count, out);
}

fn parse_execution(path: &str) -> ExecutionMappingConfig {
    ExecutionMappingConfig::from_json(&read(path))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse execution configuration '{}': {}", path, e)))
}

fn read(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| exit_with_error(&format!("Failed to read '{}': {}", path, e)))
}

fn write_json(path: &str, value: &impl Serialize) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to encode '{}': {}", path, e)));
    fs::write(path, json).unwrap_or_else(|e| exit_with_error(&format!("Failed to write '{}': {}", path, e)));
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
