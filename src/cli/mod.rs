// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `ask`    — loads a checkpoint and answers a question
//                 from a directory of documents
//   2. `config` — prints the effective reader configuration,
//                 ready to be passed back with --config
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{AskArgs, Commands, ConfigArgs, ReaderArgs};

use crate::application::config::ReaderConfig;
use crate::application::reader::RunOverrides;
use crate::infra::device::Device;

#[derive(Parser, Debug)]
#[command(
    name = "extractive-reader",
    version = "0.1.0",
    about = "Find answer spans for a question in a directory of documents."
)]
pub struct Cli {
    /// The subcommand to run (ask or config)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Ask(args)    => run_ask(args),
            Commands::Config(args) => run_config(args),
        }
    }
}

/// Handles the `ask` subcommand.
fn run_ask(args: AskArgs) -> Result<()> {
    use crate::application::ask_use_case::{format_answers, AskUseCase};

    let config    = build_config(&args.reader)?;
    let overrides = RunOverrides::from(&args);

    let use_case = AskUseCase::new(config, args.docs_dir.clone())?;
    let answers  = use_case.answer(&args.question, &overrides)?;

    println!("\nQuestion: {}\n", args.question);
    print!("{}", format_answers(&answers));
    Ok(())
}

/// Handles the `config` subcommand.
fn run_config(args: ConfigArgs) -> Result<()> {
    let config = build_config(&args.reader)?;
    let json   = serde_json::to_string_pretty(&config.to_dict()?)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, json + "\n")
                .with_context(|| format!("Cannot write config to '{path}'"))?;
            println!("Config written to {path}");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Defaults, then the --config file, then individual flags.
fn build_config(args: &ReaderArgs) -> Result<ReaderConfig> {
    let mut config = match &args.config {
        Some(path) => ReaderConfig::from_file(path)?,
        None       => ReaderConfig::default(),
    };

    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(device) = &args.device {
        let device: Device = device.parse()?;
        config.device = Some(device);
        // An explicit flag replaces whatever the file resolved to
        config.model_kwargs.device_map = None;
    }
    if let Some(v) = args.max_seq_length {
        config.max_seq_length = v;
    }
    if let Some(v) = args.stride {
        config.stride = v;
    }

    let config = config.resolve_devices();
    config.validate()?;
    Ok(config)
}
