mod cli;

use indexmap::IndexMap;
use usage_sync::reference::ReferenceSchema;
use usage_sync::value::AttributeMap;
use usage_sync::{EstimationContext, InterruptAction, Project, Resource, Synchronizer};

/// 128 + SIGINT
const EXIT_CODE_INTERRUPTED: i32 = 130;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("USAGE_SYNC_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let command_result = match cli.command {
        cli::Command::Sync(sync_cli) => sync(sync_cli),
        cli::Command::Show(show_cli) => show(show_cli),
        cli::Command::Reference(reference_cli) => reference(reference_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn sync(cli: cli::SyncCommand) -> anyhow::Result<()> {
    let existing = usage_sync::load_from_file(&cli.usage_file, cli.create)?;
    let reference = ReferenceSchema::bundled()?;

    let context = EstimationContext::new();
    {
        let context = context.clone();
        ctrlc::set_handler(move || match context.interrupt() {
            InterruptAction::Cancel => {
                tracing::warn!("Interrupted, cancelling estimation. Press Ctrl-C again to exit immediately")
            }
            InterruptAction::Exit => std::process::exit(EXIT_CODE_INTERRUPTED),
        })?;
    }

    let project = cli
        .addresses
        .into_iter()
        .fold(Project::new("cli".to_string()), |project, address| {
            project.with_resource(Resource::new(address))
        });

    let result = Synchronizer::new(&reference)
        .with_context(context)
        .sync_to_file(&[project], &existing, &cli.usage_file)?;

    for (address, error) in &result.estimation_errors {
        eprintln!("{address}: {error:#}");
    }
    eprintln!(
        "Synced {} resources into {}",
        result.resource_count,
        cli.usage_file.display()
    );

    Ok(())
}

pub fn show(cli: cli::ShowCommand) -> anyhow::Result<()> {
    let usage = usage_sync::load_from_file(&cli.usage_file, false)?;
    let usage: IndexMap<String, AttributeMap> = usage
        .into_iter()
        .map(|(address, data)| (address, data.attributes))
        .collect();

    output(&cli.output, &usage)
}

pub fn reference(cli: cli::ReferenceCommand) -> anyhow::Result<()> {
    let reference = ReferenceSchema::bundled()?;

    match cli.resource_type {
        Some(resource_type) => {
            let Some(items) = reference.get(&resource_type) else {
                anyhow::bail!("Unknown resource type {resource_type}");
            };
            let defaults: AttributeMap = items
                .iter()
                .map(|item| (item.key.clone(), item.default_tree()))
                .collect();
            output(&cli.output, &defaults)
        }
        None => {
            let types: Vec<&str> = reference.resource_types().collect();
            output(&cli.output, &types)
        }
    }
}

fn output(output: &cli::OutputArgs, value: &impl serde::Serialize) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), value)?;
            println!();
        }
    };

    Ok(())
}
