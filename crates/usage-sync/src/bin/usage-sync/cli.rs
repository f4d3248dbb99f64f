//! usage-sync cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a usage file listing every usage attribute of the given resources
    ///
    /// Values already present in the usage file are kept, everything else is written commented out with its
    /// default.
    Sync(SyncCommand),

    /// Print the values of an existing usage file
    Show(ShowCommand),

    /// Print the reference schema
    ///
    /// Lists all known resource types unless a type is given.
    #[command(alias = "ref")]
    Reference(ReferenceCommand),
}

#[derive(Parser, Debug)]
pub struct SyncCommand {
    /// Usage file to update
    #[clap(short = 'u', long = "usage-file")]
    pub usage_file: PathBuf,

    /// Create the usage file if it does not exist
    #[clap(short = 'c', long = "create")]
    pub create: bool,

    /// Resource addresses, for example `aws_instance.web` or `module.app.aws_instance.web[0]`
    #[clap(required = true)]
    pub addresses: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct ShowCommand {
    /// Usage file to read
    #[clap(short = 'u', long = "usage-file")]
    pub usage_file: PathBuf,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct ReferenceCommand {
    /// Resource type, for example `aws_instance`
    pub resource_type: Option<String>,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
