//! Runtime configuration for the bridge binary.
//!
//! Sources, in order: built-in defaults, then the TOML file named by `PHYSYNC_CONFIG` (if
//! set), then `NET_SERVER_LISTEN_PORT`.

use std::path::Path;
use std::time::Duration;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use shared::{
    paired_port, PhysicsSettings, DEFAULT_DROP_POSITION, DEFAULT_GRAVITY, DEFAULT_PEER_HOST,
    MAX_STEP_SECONDS, PEER_PORT_A,
};

pub const CONFIG_PATH_ENV: &str = "PHYSYNC_CONFIG";
pub const LISTEN_PORT_ENV: &str = "NET_SERVER_LISTEN_PORT";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Gravity acceleration in world coordinates (Z up).
    pub gravity: [f32; 3],
    pub max_step_seconds: f32,
    /// Where `spawn_at_marker` drops new objects.
    pub drop_position: [f32; 3],
    pub net: NetConfig,
    pub demo: DemoConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            max_step_seconds: MAX_STEP_SECONDS,
            drop_position: DEFAULT_DROP_POSITION,
            net: NetConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub peer_host: String,
    /// Port this process is known by. The peer port is derived from it.
    pub listen_port: u16,
    pub connect_timeout_ms: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            peer_host: DEFAULT_PEER_HOST.to_string(),
            listen_port: PEER_PORT_A,
            connect_timeout_ms: 500,
        }
    }
}

/// Headless driver loop settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub frames: u64,
    pub frame_interval_ms: u64,
    /// Spawn a cube at the marker every N frames. 0 spawns once, on the first frame.
    pub spawn_every: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            frame_interval_ms: 16,
            spawn_every: 120,
        }
    }
}

impl BridgeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overlaid with the file and port from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var(CONFIG_PATH_ENV).ok(),
            std::env::var(LISTEN_PORT_ENV).ok(),
        )
    }

    fn from_vars(path: Option<String>, listen_port: Option<String>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                log::info!("loading config from {path}");
                Self::load(&path)?
            }
            None => {
                log::info!("{CONFIG_PATH_ENV} not set, using default config");
                Self::default()
            }
        };

        if let Some(port) = listen_port {
            config.net.listen_port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "net.listen_port",
                reason: format!("`{port}` is not a port number"),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gravity.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "gravity",
                reason: format!("{:?} has a non-finite component", self.gravity),
            });
        }
        if !(self.max_step_seconds.is_finite() && self.max_step_seconds > 0.0) {
            return Err(ConfigError::Invalid {
                field: "max_step_seconds",
                reason: format!("{} must be positive", self.max_step_seconds),
            });
        }
        if self.drop_position.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "drop_position",
                reason: format!("{:?} has a non-finite component", self.drop_position),
            });
        }
        Ok(())
    }

    pub fn peer_port(&self) -> u16 {
        paired_port(self.net.listen_port)
    }

    pub fn peer_addr(&self) -> String {
        format!("{}:{}", self.net.peer_host, self.peer_port())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.net.connect_timeout_ms)
    }

    pub fn drop_position(&self) -> Vector3<f32> {
        Vector3::from(self.drop_position)
    }

    pub fn physics_settings(&self) -> PhysicsSettings {
        PhysicsSettings {
            gravity: Vector3::from(self.gravity),
            max_step_seconds: self.max_step_seconds,
        }
    }
}
