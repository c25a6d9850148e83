//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{CsvCommand, ImageCommand, ValidateCommand};
use std::ffi::OsString;

/// Extract structured answers from tables and images with a language model
#[derive(Debug, Parser, Clone)]
#[command(name = "scrapegraph")]
#[command(version)]
#[command(about = "Extract structured answers from tables and images with a language model", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (prompts and model replies at debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to graph configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Answer a prompt over a CSV file
    Csv(CsvCommand),

    /// Answer a prompt over the text in an image
    Image(ImageCommand),

    /// Validate a graph configuration
    Validate(ValidateCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
