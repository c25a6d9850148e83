//! CLI command definitions

use clap::Args;

/// Answer a prompt over a CSV file
#[derive(Debug, Args, Clone)]
pub struct CsvCommand {
    /// Path to the CSV file (first row is the header)
    #[arg(short, long)]
    pub file: String,

    /// Question to answer from the file
    #[arg(short, long)]
    pub prompt: String,

    /// File stem for the written `.json` and `.csv` results
    #[arg(short, long, default_value = "result")]
    pub output: String,

    /// Directory the results are written to
    #[arg(long, default_value = ".")]
    pub output_dir: String,

    /// Print the result without writing files
    #[arg(long)]
    pub no_write: bool,
}

/// Answer a prompt over the text in an image
#[derive(Debug, Args, Clone)]
pub struct ImageCommand {
    /// Path to the image
    #[arg(short, long)]
    pub file: String,

    /// Question to answer from the image text
    #[arg(short, long)]
    pub prompt: String,

    /// OCR language (repeatable); overrides `ocr.languages`
    #[arg(short, long)]
    pub language: Vec<String>,

    /// File stem for the written `.json` and `.csv` results
    #[arg(short, long, default_value = "result")]
    pub output: String,

    /// Directory the results are written to
    #[arg(long, default_value = ".")]
    pub output_dir: String,

    /// Print the result without writing files
    #[arg(long)]
    pub no_write: bool,
}

/// Validate a graph configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
