use anyhow::Result;
use clap::Parser;
use serde_derive::Deserialize;

#[derive(Debug, Parser)]
#[command(
    name = "metalmq-queue-shell",
    version,
    author = "Richard Jonas <richard.jonas.76@gmail.com>",
    about = "Declares a queue topology on a loopback channel and replays its operations"
)]
pub(crate) struct CliConfig {
    /// Path to the topology file
    #[arg(short = 'c', long = "config", value_name = "FILE", default_value = "topology.toml")]
    pub(crate) config_file_path: String,
    /// Open the channel after every operation is requested, so they are replayed on open
    #[arg(long)]
    pub(crate) open_late: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    #[serde(default = "default_channel")]
    pub(crate) channel: u16,
    #[serde(default, rename = "queue")]
    pub(crate) queues: Vec<QueueConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueueConfig {
    /// Empty or missing name means server-named queue.
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) durable: bool,
    #[serde(default)]
    pub(crate) exclusive: bool,
    #[serde(default)]
    pub(crate) auto_delete: bool,
    #[serde(default)]
    pub(crate) bindings: Vec<BindingConfig>,
    #[serde(default)]
    pub(crate) publish: Vec<String>,
    #[serde(default)]
    pub(crate) consume: bool,
    /// Number of messages to get one by one.
    #[serde(default)]
    pub(crate) pop: u32,
    #[serde(default)]
    pub(crate) status: bool,
    #[serde(default)]
    pub(crate) purge: bool,
    #[serde(default)]
    pub(crate) delete: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BindingConfig {
    pub(crate) exchange: String,
    pub(crate) routing_key: Option<String>,
}

fn default_channel() -> u16 {
    1
}

pub(crate) fn parse_config(path: &str) -> Result<Config> {
    let cfg = std::fs::read_to_string(path)?;

    from_toml(&cfg)
}

pub(crate) fn from_toml(cfg: &str) -> Result<Config> {
    Ok(toml::from_str(cfg)?)
}

pub(crate) fn cli() -> CliConfig {
    CliConfig::parse()
}
