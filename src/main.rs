use anyhow::Result;
use clap::Parser;
use extractive_reader::cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("extractive_reader=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
