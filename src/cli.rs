//! Command-line front end: generate instances from a model file.

use crate::fixture::Fixture;
use anyhow::Context;
use clap::Parser;
use fixture_core::FixtureModel;
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug, Clone)]
#[command(name = "fixturegen")]
#[command(about = "Generate populated test fixtures from a YAML type model")]
#[command(long_about = None)]
pub struct Cli {
    /// Path to the fixture model (root type, types, overrides, assignments)
    #[arg(long, value_name = "PATH")]
    pub model: PathBuf,

    /// Number of root instances to generate
    #[arg(long, short = 'n', default_value = "1")]
    pub count: usize,

    /// Random seed; the model's seed is used when omitted
    #[arg(long, env = "FIXTUREGEN_SEED")]
    pub seed: Option<u64>,

    /// Override a setting (format: key=value, e.g. collection.max.size=3)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Warn about selectors that match nothing instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Run the CLI and return the rendered JSON.
///
/// One instance is printed as a single value; more as an array.
pub fn run(cli: &Cli) -> anyhow::Result<String> {
    let model = FixtureModel::from_file(&cli.model)
        .with_context(|| format!("Failed to load model from {}", cli.model.display()))?;
    let catalog = model.catalog().context("Invalid type definitions in model")?;

    let mut fixture = Fixture::from_model(&catalog, &model)?;
    for pair in &cli.settings {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Invalid setting '{pair}', expected key=value"))?;
        fixture = fixture
            .with_setting(key.trim(), value.trim())
            .with_context(|| format!("Failed to apply setting '{pair}'"))?;
    }
    if let Some(seed) = cli.seed {
        fixture = fixture.with_seed(seed);
    }
    if cli.lenient {
        fixture = fixture.lenient();
    }

    info!("Generating {} instance(s) of {}", cli.count, fixture.root());
    let output = if cli.count == 1 {
        fixture.create()?.to_json()
    } else {
        JsonValue::Array(
            fixture
                .create_list(cli.count)?
                .iter()
                .map(|value| value.to_json())
                .collect(),
        )
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    Ok(rendered)
}
