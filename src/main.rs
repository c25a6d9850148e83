use anyhow::{Context, Result};
use scrapegraph::cli::commands::{CsvCommand, ImageCommand, ValidateCommand};
use scrapegraph::cli::output::*;
use scrapegraph::cli::{Cli, Command};
use scrapegraph::{
    convert, CsvScraperGraph, GraphConfig, Image, ImageScraperGraph, ScraperGraph, Source, Table,
};
use serde_json::Value;
use std::path::Path;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    match &cli.command {
        Command::Csv(cmd) => run_csv(cmd, &cli).await?,
        Command::Image(cmd) => run_image(cmd, &cli).await?,
        Command::Validate(cmd) => validate_config(cmd, &cli)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<GraphConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = GraphConfig::from_file(path).context("Failed to load graph config")?;
            println!("{} Loaded config: {}", INFO, style(path).bold());
            config
        }
        None => GraphConfig::default(),
    };
    config.verbose |= cli.verbose;
    Ok(config)
}

async fn run_csv(cmd: &CsvCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let table = Table::from_path(&cmd.file).context("Failed to read CSV file")?;
    println!(
        "{} Loaded {} rows from {}",
        INFO,
        style(table.rows.len()).cyan(),
        style(&cmd.file).bold()
    );

    let graph = CsvScraperGraph::new(cmd.prompt.clone(), table, config)
        .context("Failed to build CSV scraper graph")?;
    run_graph(graph, &cmd.output, &cmd.output_dir, cmd.no_write).await
}

async fn run_image(cmd: &ImageCommand, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    if !cmd.language.is_empty() {
        config.ocr.languages = cmd.language.clone();
    }

    let source = Source::from(Image::from_path(&cmd.file));
    let graph = ImageScraperGraph::new(cmd.prompt.clone(), source, config)
        .context("Failed to build image scraper graph")?;
    run_graph(graph, &cmd.output, &cmd.output_dir, cmd.no_write).await
}

async fn run_graph<G: ScraperGraph>(
    mut graph: G,
    stem: &str,
    output_dir: &str,
    no_write: bool,
) -> Result<()> {
    let spinner = create_spinner();
    let progress = spinner.clone();
    graph.on_event(move |event| {
        progress.println(format_execution_event(&event));
    });

    println!();
    let result = graph.run().await;
    spinner.finish_and_clear();

    println!("\n{}", style("Execution info").bold());
    println!("{}", graph.get_execution_info().prettify());

    let value = match result {
        Ok(value) => value,
        Err(e) => {
            println!("\n{} {}", CROSS, style("Run failed").red());
            error!("{}", e);
            std::process::exit(1);
        }
    };

    println!("{} {}", CHECK, style("Result").green());
    println!("{}", format_result(&value, 40));

    if !no_write {
        write_outputs(&value, stem, Path::new(output_dir))?;
    }
    Ok(())
}

fn write_outputs(value: &Value, stem: &str, dir: &Path) -> Result<()> {
    let json_path =
        convert::to_json_file(value, stem, dir).context("Failed to write JSON result")?;
    let csv_path = convert::to_csv_file(value, stem, dir).context("Failed to write CSV result")?;
    println!(
        "\n{} Wrote {} and {}",
        INFO,
        style(json_path.display()).dim(),
        style(csv_path.display()).dim()
    );
    Ok(())
}

fn validate_config(cmd: &ValidateCommand, cli: &Cli) -> Result<()> {
    let path = cli
        .config
        .as_deref()
        .context("validate needs --config <file>")?;
    println!("{} Validating {}...", INFO, style(path).bold());

    match GraphConfig::from_file(path) {
        Ok(config) => {
            println!("{} Configuration is valid!", CHECK);
            println!("  Model: {}", style(&config.llm.model).bold());
            if let Ok(endpoint) = config.llm.endpoint() {
                println!("  Endpoint: {}", style(endpoint).cyan());
            }
            println!("  OCR languages: {}", style(config.ocr.languages.join(", ")).cyan());
            println!(
                "  Engine: max_steps={} max_retries={} backoff={}ms",
                config.engine.max_steps, config.engine.max_retries, config.engine.backoff_ms
            );

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}
