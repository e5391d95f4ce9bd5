use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use sheetsql_core::{ImportConfig, SheetImporter};
use std::fs;
use std::path::PathBuf;

mod formatter;

#[derive(Parser)]
#[command(name = "sheetsql")]
#[command(about = "Generate idempotent catalog upsert SQL from a product spreadsheet", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the XLSX file to convert
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Tenant that owns every generated row
    #[arg(short, long, value_name = "ID")]
    tenant_id: Option<String>,

    /// 0-based index of the sheet to read
    #[arg(short, long, value_name = "N")]
    sheet_index: Option<usize>,

    /// Write the SQL script here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Print an import summary to stderr
    #[arg(long, value_enum, value_name = "FORMAT")]
    summary: Option<SummaryFormat>,
}

#[derive(Clone, ValueEnum)]
enum SummaryFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripts
    Json,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        ImportConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from("sheetsql.toml");
        if default_config_path.exists() {
            ImportConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            ImportConfig::default()
        }
    };

    // Command line wins over the file
    if let Some(tenant_id) = cli.tenant_id {
        config.tenant_id = Some(tenant_id);
    }
    if let Some(sheet_index) = cli.sheet_index {
        config.sheet_index = sheet_index;
    }
    config.validate().context("Invalid configuration")?;

    let Some(tenant_id) = config.tenant_id.clone() else {
        anyhow::bail!("A tenant id is required. Use --tenant-id <ID> or set 'tenant_id' in the config file.");
    };

    let importer = SheetImporter::with_config(config);
    let output = importer
        .import_file(&cli.file, &tenant_id)
        .with_context(|| format!("Failed to convert file: {}", cli.file.display()))?;

    match &cli.output {
        Some(output_path) => {
            fs::write(output_path, &output.sql)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            info!("Wrote {} bytes of SQL", output.sql.len());
            eprintln!("SQL written to {}", output_path.display());
        }
        None => print!("{}", output.sql),
    }

    match cli.summary {
        Some(SummaryFormat::Human) => formatter::print_human(&cli.file, &output.summary),
        Some(SummaryFormat::Json) => formatter::print_json(&cli.file, &output.summary)?,
        None => {}
    }

    Ok(())
}
