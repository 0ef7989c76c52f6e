use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use flowsmith_rs::flowsmith::compiler::{document_schema, Compiler, DocumentLoader};
use flowsmith_rs::flowsmith::config::FlowsmithConfig;
use flowsmith_rs::flowsmith::server;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a graph document into a Python module
    Compile {
        /// Path to the graph document (.json, .yaml or .yml)
        file: PathBuf,

        /// Where to write the generated module (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Where to write the diagnostics as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Validate a graph document without generating code
    Validate {
        /// Path to the graph document
        file: PathBuf,

        /// Print the validation report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the registered node types and their config schemas
    NodeTypes,
    /// Print the JSON Schema of the graph document format
    Schema,
    /// Serve the compiler over HTTP
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config =
        FlowsmithConfig::load(args.config.as_deref()).context("failed to load config")?;
    let port = config.server.port;
    let compiler = Compiler::with_builtins(config)?;

    match args.command {
        Commands::Compile { file, out, report } => {
            let document = load_document(&file)?;
            let outcome = compiler
                .compile(&document)
                .with_context(|| format!("failed to compile {}", file.display()))?;

            for diagnostic in &outcome.diagnostics {
                eprintln!("{}", diagnostic);
            }
            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&outcome.diagnostics)?;
                fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }

            let Some(code) = outcome.code else {
                log::warn!("{} is not valid; no code generated", file.display());
                return Ok(ExitCode::from(1));
            };
            match out {
                Some(path) => {
                    fs::write(&path, code)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    log::info!("Wrote {}", path.display());
                }
                None => print!("{}", code),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { file, json } => {
            let document = load_document(&file)?;
            let report = compiler
                .check(&document)
                .with_context(|| format!("failed to validate {}", file.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for diagnostic in &report.diagnostics {
                    println!("{}", diagnostic);
                }
                println!(
                    "{}: {} error(s), {} warning(s)",
                    if report.is_valid { "valid" } else { "invalid" },
                    report.errors().count(),
                    report.warnings().count()
                );
            }
            Ok(if report.is_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Commands::NodeTypes => {
            let catalog = compiler.registry().catalog();
            println!("{}", serde_json::to_string_pretty(&catalog)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&document_schema())?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve { port: override_port } => {
            // Request spans from TraceLayer; `log` output stays with env_logger.
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::INFO)
                .finish();
            if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
                log::warn!("Failed to install tracing subscriber: {}", e);
            }

            server::serve(compiler, override_port.unwrap_or(port)).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_document(path: &Path) -> anyhow::Result<serde_json::Value> {
    DocumentLoader::new()
        .load(path)
        .with_context(|| format!("failed to read {}", path.display()))
}
