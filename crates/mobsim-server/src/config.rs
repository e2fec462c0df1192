use std::path::Path;

use mobsim_ai::{AiConfig, AiError};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid [server] section: {0}")]
    Server(String),

    #[error(transparent)]
    Ai(#[from] AiError),
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub world: WorldSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Heartbeat period in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Number of simulated wandering observers.
    #[serde(default = "default_observers")]
    pub observers: usize,
    #[serde(default = "default_observer_speed")]
    pub observer_speed: f32,
    /// Seconds between status lines. 0 = disabled.
    #[serde(default = "default_status_interval")]
    pub status_interval: u64,
}

fn default_tick_ms() -> u64 {
    50
}

fn default_observers() -> usize {
    2
}

fn default_observer_speed() -> f32 {
    2.0
}

fn default_status_interval() -> u64 {
    30
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            observers: default_observers(),
            observer_speed: default_observer_speed(),
            status_interval: default_status_interval(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WorldSection {
    #[serde(default = "default_world_name")]
    pub name: String,
    #[serde(default)]
    pub seed: u64,
    /// Loaded chunks extend this many chunks from the origin on each axis.
    #[serde(default = "default_radius")]
    pub radius: i32,
    /// Directory holding one JSON file per chunk with persisted mobs.
    #[serde(default = "default_save_dir")]
    pub save_dir: String,
    /// Spawned on a fresh world, i.e. when nothing was restored from disk.
    #[serde(default = "default_initial_mobs")]
    pub initial_mobs: Vec<InitialMobs>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InitialMobs {
    pub type_id: String,
    pub count: usize,
}

fn default_world_name() -> String {
    "world".into()
}

fn default_radius() -> i32 {
    3
}

fn default_save_dir() -> String {
    "world/mobs".into()
}

fn default_initial_mobs() -> Vec<InitialMobs> {
    [
        ("mobsim:cow", 4),
        ("mobsim:pig", 2),
        ("mobsim:chicken", 3),
        ("mobsim:zombie", 2),
        ("mobsim:harvester", 1),
    ]
    .into_iter()
    .map(|(type_id, count)| InitialMobs {
        type_id: type_id.into(),
        count,
    })
    .collect()
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: 0,
            radius: default_radius(),
            save_dir: default_save_dir(),
            initial_mobs: default_initial_mobs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.tick_ms == 0 {
            return Err(ConfigError::Server("tick_ms must be positive".into()));
        }
        if self.server.observer_speed < 0.0 {
            return Err(ConfigError::Server("observer_speed must not be negative".into()));
        }
        if self.world.radius < 0 {
            return Err(ConfigError::Server("world radius must not be negative".into()));
        }
        self.ai.validate()?;
        Ok(())
    }

    /// Heartbeat period in seconds.
    pub fn tick_secs(&self) -> f32 {
        self.server.tick_ms as f32 / 1000.0
    }
}
