use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use renderer::Renderer;
use shadersync::Fingerprint;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, RunArgs};
use crate::config::Settings;

const DEFAULT_LOG_FILTER: &str = "warn,livefrag=info,renderer=info,shadersync=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    match cli.command {
        Some(Command::Run(args)) => run_canvas(&args),
        Some(Command::Config(args)) => show_config(&args.run, args.json),
        Some(Command::Fingerprint(args)) => show_fingerprint(&args.path),
        None => run_canvas(&cli.run),
    }
}

fn initialise_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_canvas(args: &RunArgs) -> Result<()> {
    let settings = Settings::resolve(args).context("failed to resolve configuration")?;
    tracing::info!(
        source = %settings.source,
        interval = %humantime::format_duration(settings.poll_interval),
        "starting livefrag"
    );
    let mut renderer = Renderer::new(settings.into_renderer_config());
    renderer.run()
}

fn show_config(args: &RunArgs, json: bool) -> Result<()> {
    let settings = Settings::resolve(args).context("failed to resolve configuration")?;
    let rendered = if json {
        serde_json::to_string_pretty(&settings).context("failed to encode settings as JSON")?
    } else {
        toml::to_string_pretty(&settings).context("failed to encode settings as TOML")?
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn show_fingerprint(path: &Path) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read shader at {}", path.display()))?;
    println!("{}", Fingerprint::of(&source));
    Ok(())
}
