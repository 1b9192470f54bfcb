//! Initialize configuration from command line arguments, the
//! environment, and the configuration file.
use clap::Parser;
use swarm_tracker_configuration::{Configuration, Error, Info};

/// The whole configuration document can be injected via this env var,
/// which is handy for containers without a persistent filesystem. It
/// takes priority over the configuration file.
pub const ENV_VAR_CONFIG: &str = "SWARM_TRACKER_CONFIG";

/// The default configuration file path, relative to the working
/// directory.
pub const DEFAULT_CONFIG_PATH: &str = "./tracker.yaml";

#[derive(Parser, Debug)]
#[command(name = "swarm-tracker", about = "A standalone BitTorrent tracker", version)]
pub struct Arguments {
    /// Path of the YAML configuration file.
    #[arg(short, long, env = "SWARM_TRACKER_CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

/// Loads the configuration from the env var holding the whole document,
/// or from the configured file path.
///
/// # Errors
///
/// Will return `Err` if the document cannot be read, parsed or
/// validated.
pub fn initialize_configuration(args: &Arguments) -> Result<Configuration, Error> {
    let info = Info {
        config_yaml: std::env::var(ENV_VAR_CONFIG).ok(),
        config_yaml_path: args.config.clone(),
    };

    Configuration::load(&info)
}
