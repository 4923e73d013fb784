use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use renderer::GpuPowerPreference;

#[derive(Parser, Debug)]
#[command(
    name = "livefrag",
    author,
    version,
    about = "Live-coding canvas that hot-reloads a fragment shader"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Shader source: an http(s) URL, a `file://` URL, or a path.
    #[arg(long, env = "LIVEFRAG_SOURCE", value_name = "URL|PATH")]
    pub source: Option<String>,

    /// How often to re-fetch the source (e.g. `400ms`, `1s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Give up on a single fetch after this long.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub fetch_timeout: Option<Duration>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Window title.
    #[arg(long)]
    pub title: Option<String>,

    /// Present without waiting for vertical sync.
    #[arg(long)]
    pub no_vsync: bool,

    /// GPU adapter preference: `low` or `high`.
    #[arg(long, value_name = "POWER", value_parser = parse_gpu_power)]
    pub gpu_power: Option<GpuPowerPreference>,

    /// TOML config file; defaults to `livefrag.toml` in the user config directory.
    #[arg(long, env = "LIVEFRAG_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the canvas (the default when no subcommand is given).
    Run(RunArgs),
    /// Print the resolved settings without opening a window.
    Config(ConfigArgs),
    /// Print the fingerprint the hot-reloader would compute for a file.
    Fingerprint(FingerprintArgs),
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Emit JSON instead of TOML.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Shader source file to hash.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration must not be empty".to_string());
    }
    humantime::parse_duration(trimmed)
        .map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size '{trimmed}' must be non-zero in both dimensions"));
    }
    Ok((width, height))
}

pub fn parse_gpu_power(value: &str) -> Result<GpuPowerPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "integrated" => Ok(GpuPowerPreference::Low),
        "high" | "discrete" => Ok(GpuPowerPreference::High),
        other => Err(format!("unknown GPU power preference '{other}'; expected low or high")),
    }
}
