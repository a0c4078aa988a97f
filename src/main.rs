//! Command-line interface for fixturegen
//!
//! ```bash
//! # One instance of the model's root type
//! fixturegen --model model.yaml
//!
//! # Ten instances, fixed seed, smaller collections
//! fixturegen --model model.yaml -n 10 --seed 42 --set collection.max.size=3 --pretty
//! ```

use clap::Parser;
use fixturegen::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = run(&cli)?;
    println!("{output}");
    Ok(())
}
