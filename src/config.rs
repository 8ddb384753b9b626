//! Daemon settings.
//!
//! Settings are read from a TOML file and then overridden by command
//! line arguments. Only [`BridgeConfig`] reaches the device model.
use crate::light::group::{GroupMode, ParseGroupModeError};
use clap::Parser;
use serde_derive::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

pub const DEFAULT_CONFIG_FILE: &str = "dali2mqtt.toml";
pub const MAX_LAMPS: u32 = 64;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    GroupMode(#[from] ParseGroupModeError),
    #[error("dali_lamps must be between 1 and 64, got {0}")]
    LampCount(u32),
    #[error("Unknown log level \"{0}\", expected critical, error, warning, info or debug")]
    LogLevel(String),
    #[error("mqtt_port must not be 0")]
    Port,
}

/// Configuration of the device model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Stop scanning after this many lamps
    pub max_lamps: usize,
    pub group_mode: GroupMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            max_lamps: MAX_LAMPS as usize,
            group_mode: GroupMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub mqtt_server: String,
    pub mqtt_port: u16,
    pub mqtt_username: String,
    pub mqtt_password: String,
    pub mqtt_base_topic: String,
    /// Driver name with optional parameters, e.g. `DALI_RPI:port=/dev/ttyACM0`
    pub dali_driver: String,
    pub dali_lamps: u32,
    pub ha_discovery_prefix: String,
    pub devices_names: PathBuf,
    pub log_level: String,
    pub log_color: bool,
    pub group_mode: String,
    /// Seconds between polls of all lamps, 0 to disable
    pub poll_interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            mqtt_server: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_username: String::new(),
            mqtt_password: String::new(),
            mqtt_base_topic: "dali2mqtt".to_string(),
            dali_driver: "default".to_string(),
            dali_lamps: MAX_LAMPS,
            ha_discovery_prefix: "homeassistant".to_string(),
            devices_names: PathBuf::from("devices.json"),
            log_level: "info".to_string(),
            log_color: false,
            group_mode: GroupMode::default().to_string(),
            poll_interval: 0,
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file gives the defaults
    /// unless `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Settings, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound && !required => {
                return Ok(Settings::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        if !(1..=MAX_LAMPS).contains(&self.dali_lamps) {
            return Err(ConfigError::LampCount(self.dali_lamps));
        }
        Ok(BridgeConfig {
            max_lamps: self.dali_lamps as usize,
            group_mode: self.group_mode.parse()?,
        })
    }

    pub fn log_filter(&self) -> Result<LevelFilter, ConfigError> {
        match self.log_level.as_str() {
            "critical" | "error" => Ok(LevelFilter::ERROR),
            "warning" => Ok(LevelFilter::WARN),
            "info" => Ok(LevelFilter::INFO),
            "debug" => Ok(LevelFilter::DEBUG),
            l => Err(ConfigError::LogLevel(l.to_string())),
        }
    }

    /// Check everything that can be checked without connecting
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt_port == 0 {
            return Err(ConfigError::Port);
        }
        self.bridge_config()?;
        self.log_filter()?;
        Ok(())
    }
}

#[derive(Parser, Debug, Default)]
#[command(about = "Bridge between a DALI bus and an MQTT broker")]
pub struct CmdArgs {
    /// Configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// MQTT broker host
    #[arg(long)]
    pub mqtt_server: Option<String>,
    #[arg(long)]
    pub mqtt_port: Option<u16>,
    #[arg(long)]
    pub mqtt_username: Option<String>,
    #[arg(long)]
    pub mqtt_password: Option<String>,
    /// Prefix of all topics
    #[arg(long)]
    pub mqtt_base_topic: Option<String>,
    /// Select DALI-device
    #[arg(short = 'd', long)]
    pub dali_driver: Option<String>,
    /// Maximum number of lamps to scan for
    #[arg(long)]
    pub dali_lamps: Option<u32>,
    #[arg(long)]
    pub ha_discovery_prefix: Option<String>,
    /// File with friendly names
    #[arg(long)]
    pub devices_names: Option<PathBuf>,
    /// critical, error, warning, info or debug
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub log_color: Option<bool>,
    /// mean, max, min or off
    #[arg(long)]
    pub group_mode: Option<String>,
    /// Seconds between polls, 0 to disable
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

macro_rules! override_setting {
    ($args: expr, $settings: expr, $($field: ident),*) => {
        $(
            if let Some(v) = &$args.$field {
                $settings.$field = v.clone();
            }
        )*
    };
}

impl CmdArgs {
    pub fn apply(&self, settings: &mut Settings) {
        override_setting!(
            self,
            settings,
            mqtt_server,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_base_topic,
            dali_driver,
            dali_lamps,
            ha_discovery_prefix,
            devices_names,
            log_level,
            log_color,
            group_mode,
            poll_interval
        );
    }

    /// Read the configuration file and apply overrides from the command line
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path, true)?,
            None => Settings::load(Path::new(DEFAULT_CONFIG_FILE), false)?,
        };
        self.apply(&mut settings);
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_test() {
        let s = Settings::default();
        assert_eq!(s.mqtt_server, "localhost");
        assert_eq!(s.mqtt_port, 1883);
        assert_eq!(s.mqtt_base_topic, "dali2mqtt");
        assert_eq!(s.ha_discovery_prefix, "homeassistant");
        assert_eq!(s.dali_lamps, 64);
        assert!(s.validate().is_ok());
        assert_eq!(s.bridge_config().unwrap(), BridgeConfig::default());
    }

    #[test]
    fn toml_test() {
        let s: Settings = toml::from_str(
            r#"
mqtt_server = "broker.local"
dali_lamps = 12
group_mode = "max"
"#,
        )
        .unwrap();
        assert_eq!(s.mqtt_server, "broker.local");
        assert_eq!(s.mqtt_port, 1883);
        let c = s.bridge_config().unwrap();
        assert_eq!(c.max_lamps, 12);
        assert_eq!(c.group_mode, GroupMode::Max);

        assert!(toml::from_str::<Settings>("no_such_key = 1").is_err());
    }

    #[test]
    fn invalid_test() {
        let s = Settings {
            dali_lamps: 65,
            ..Default::default()
        };
        assert!(matches!(s.bridge_config(), Err(ConfigError::LampCount(65))));
        let s = Settings {
            dali_lamps: 0,
            ..Default::default()
        };
        assert!(s.validate().is_err());
        let s = Settings {
            group_mode: "mean_on".to_string(),
            ..Default::default()
        };
        assert!(matches!(s.bridge_config(), Err(ConfigError::GroupMode(_))));
        let s = Settings {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(matches!(s.validate(), Err(ConfigError::LogLevel(_))));
        let s = Settings {
            log_level: "critical".to_string(),
            ..Default::default()
        };
        assert_eq!(s.log_filter().unwrap(), LevelFilter::ERROR);
    }

    #[test]
    fn cmd_args_test() {
        let args = CmdArgs::try_parse_from([
            "dali2mqtt",
            "-d",
            "SIMULATOR:count=3",
            "--mqtt-port",
            "1884",
            "--log-color",
            "true",
            "--group-mode",
            "off",
        ])
        .unwrap();
        let mut s = Settings::default();
        args.apply(&mut s);
        assert_eq!(s.dali_driver, "SIMULATOR:count=3");
        assert_eq!(s.mqtt_port, 1884);
        assert!(s.log_color);
        assert_eq!(s.bridge_config().unwrap().group_mode, GroupMode::Off);
        assert_eq!(s.mqtt_server, "localhost");
    }

    #[test]
    fn missing_file_test() {
        let path = Path::new("/nonexistent/dali2mqtt.toml");
        assert_eq!(Settings::load(path, false).unwrap(), Settings::default());
        assert!(matches!(Settings::load(path, true), Err(ConfigError::Read { .. })));
    }
}
