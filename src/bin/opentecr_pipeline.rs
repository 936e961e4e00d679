use std::io::{self, Write};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use opentecr_pipeline::config::ConfigLoader;
use opentecr_pipeline::error::PipelineError;
use opentecr_pipeline::metanetx::MetaNetXHttpClient;
use opentecr_pipeline::pipeline::Pipeline;
use opentecr_pipeline::sheets::SheetsHttpClient;
use opentecr_pipeline::store::Store;

#[derive(Parser)]
#[command(name = "opentecr-pipeline")]
#[command(about = "Materialize the openTECR and MetaNetX reference tables")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    base_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the full openTECR chain (bronze through gold)")]
    Opentecr,
    #[command(about = "Fetch and validate the MetaNetX tables")]
    Metanetx(MetaNetXArgs),
    #[command(about = "Run everything")]
    All,
}

#[derive(Args)]
struct MetaNetXArgs {
    /// Restrict the run to the named table files.
    #[arg(long)]
    table: Vec<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PipelineError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PipelineError) -> u8 {
    match error {
        PipelineError::Transport { .. } | PipelineError::Status { .. } => 3,
        PipelineError::MalformedChecksum { .. }
        | PipelineError::ChecksumMismatch { .. }
        | PipelineError::SizeMismatch { .. } => 4,
        PipelineError::Config(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut resolved = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    if let Some(base_path) = cli.base_path {
        resolved.base_path = Some(base_path.into());
    }

    let store = match &resolved.base_path {
        Some(base) => Store::new_with_base(base.clone()),
        None => Store::new().into_diagnostic()?,
    };
    let sheets =
        SheetsHttpClient::new(&resolved.sheets_base_url, &resolved.spreadsheet_id)
            .into_diagnostic()?;
    let metanetx = MetaNetXHttpClient::new(&resolved.mnx_base_url, &resolved.mnx_version)
        .into_diagnostic()?;
    let pipeline = Pipeline::new(store, sheets, metanetx);

    match cli.command {
        Commands::Opentecr => {
            let run = pipeline
                .materialize_opentecr(&resolved.opentecr)
                .into_diagnostic()?;
            print_json(&run.summary()).into_diagnostic()
        }
        Commands::Metanetx(args) => {
            let tables: Vec<_> = if args.table.is_empty() {
                resolved.mnx_tables.clone()
            } else {
                resolved
                    .mnx_tables
                    .iter()
                    .filter(|spec| args.table.contains(&spec.table))
                    .cloned()
                    .collect()
            };
            let results = pipeline.materialize_metanetx(&tables).into_diagnostic()?;
            let reports: Vec<_> = results.into_iter().map(|(_, report)| report).collect();
            print_json(&reports).into_diagnostic()
        }
        Commands::All => {
            let run = pipeline
                .materialize_opentecr(&resolved.opentecr)
                .into_diagnostic()?;
            let results = pipeline
                .materialize_metanetx(&resolved.mnx_tables)
                .into_diagnostic()?;
            #[derive(Serialize)]
            struct AllSummary<T: Serialize, U: Serialize> {
                opentecr: T,
                metanetx: U,
            }
            let reports: Vec<_> = results.into_iter().map(|(_, report)| report).collect();
            print_json(&AllSummary {
                opentecr: run.summary(),
                metanetx: reports,
            })
            .into_diagnostic()
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    let mut stdout = io::stdout();
    stdout.write_all(json.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}
