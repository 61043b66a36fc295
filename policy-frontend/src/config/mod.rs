use serde::Deserialize;
use store_core::config::HostedStoreSettings;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: HostedStoreSettings,
    #[serde(default)]
    pub resolver: ResolverSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Timeout bounds for session/role resolution. The UI keeps its own outer
/// render timeout around 8000 ms; both bounds here must stay well under it.
#[derive(Deserialize, Clone)]
pub struct ResolverSettings {
    #[serde(default = "default_init_safety_ms")]
    pub init_safety_ms: u64,
    #[serde(default = "default_loading_timeout_ms")]
    pub loading_timeout_ms: u64,
}

fn default_init_safety_ms() -> u64 {
    3000
}

fn default_loading_timeout_ms() -> u64 {
    5000
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            init_safety_ms: default_init_safety_ms(),
            loading_timeout_ms: default_loading_timeout_ms(),
        }
    }
}

impl ResolverSettings {
    pub fn timeouts(&self) -> crate::services::session::ResolverTimeouts {
        crate::services::session::ResolverTimeouts {
            init_safety: std::time::Duration::from_millis(self.init_safety_ms),
            loading: std::time::Duration::from_millis(self.loading_timeout_ms),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");

    // Check if we're already in policy-frontend directory or need to navigate to it
    let configuration_directory = if base_path.ends_with("policy-frontend") {
        base_path.join("config")
    } else {
        base_path.join("policy-frontend").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
