use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub namespace: NamespaceConfig,
    pub monitor: MonitorConfig,
    pub redundancy: RedundancyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address clients connect to for routing and mutation requests.
    pub client_addr: String,
    /// Address storage servers announce themselves on.
    pub storage_addr: String,
    /// Host used when dialing storage server control and alive ports.
    pub storage_host: String,
}

#[derive(Debug, Deserialize)]
pub struct NamespaceConfig {
    pub cache_capacity: usize,
    /// Hard ceiling on a serialized subtree accepted from a storage server.
    pub max_tree_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct MonitorConfig {
    pub sweep_interval_secs: u64,
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct RedundancyConfig {
    pub enabled: bool,
    /// Replication kicks in once this many servers are registered.
    pub replication_factor: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

use std::env;

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("ROUTEFS_CONFIG").unwrap_or_else(|_| "config".to_string());

    let settings: Settings = config::Config::builder()
        .set_default("server.client_addr", "127.0.0.1:18001")?
        .set_default("server.storage_addr", "127.0.0.1:18000")?
        .set_default("server.storage_host", "127.0.0.1")?
        .set_default("namespace.cache_capacity", 16)?
        .set_default("namespace.max_tree_bytes", 65536)?
        .set_default("monitor.sweep_interval_secs", 3)?
        .set_default("monitor.probe_timeout_ms", 500)?
        .set_default("redundancy.enabled", true)?
        .set_default("redundancy.replication_factor", 3)?
        .set_default("logging.log_dir", "logs")?
        .set_default("logging.stdout_level", "info")?
        .set_default("logging.file_level", "debug")?
        .add_source(config::File::with_name(&config_path).required(false))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
