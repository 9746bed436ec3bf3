//! Environment configuration
//!
//! Each recognised `QUILL_*` variable is described by a `ConfigDescriptor`:
//! its name, how to parse it, and a setter that applies the parsed value.
//! Bad values are logged and ignored so startup never fails on configuration.

use crate::constants::{defaults, env};
use crate::recovery::RecoveryStrategy;
use std::path::PathBuf;
use std::time::Duration;

/// Parsed value handed to a setter; setters never see raw strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
    Integer(usize),
    Enum(&'static str),
    Text(String),
}

#[derive(Debug, Clone)]
pub enum ConfigType {
    /// true/false, on/off, yes/no, 1/0
    Boolean,
    /// Integer with inclusive bounds
    Integer { min: usize, max: usize },
    Enum { variants: &'static [&'static str] },
    /// Any non-empty string
    Text,
}

pub type ConfigSetter = fn(&mut Config, ConfigValue);

pub struct ConfigDescriptor {
    pub var: &'static str,
    pub ty: ConfigType,
    pub set: ConfigSetter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub tab_width: usize,
    pub debug: bool,
    pub status_duration: Duration,
    pub snapshot_interval: Duration,
    pub snapshot_capacity: usize,
    /// Persist snapshots here when set
    pub snapshot_dir: Option<PathBuf>,
    pub max_event_depth: usize,
    pub recovery_strategy: RecoveryStrategy,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tab_width: defaults::TAB_WIDTH,
            debug: false,
            status_duration: Duration::from_secs(defaults::STATUS_DURATION_SECS),
            snapshot_interval: Duration::from_secs(defaults::SNAPSHOT_INTERVAL_SECS),
            snapshot_capacity: defaults::SNAPSHOT_CAPACITY,
            snapshot_dir: None,
            max_event_depth: defaults::MAX_EVENT_DEPTH,
            recovery_strategy: RecoveryStrategy::default(),
            log_file: PathBuf::from(defaults::LOG_FILE),
        }
    }
}

fn integer(value: ConfigValue) -> usize {
    match value {
        ConfigValue::Integer(n) => n,
        _ => 0,
    }
}

fn set_tab_width(config: &mut Config, value: ConfigValue) {
    config.tab_width = integer(value);
}

fn set_debug(config: &mut Config, value: ConfigValue) {
    if let ConfigValue::Bool(on) = value {
        config.debug = on;
    }
}

fn set_status_duration(config: &mut Config, value: ConfigValue) {
    config.status_duration = Duration::from_secs(integer(value) as u64);
}

fn set_snapshot_interval(config: &mut Config, value: ConfigValue) {
    config.snapshot_interval = Duration::from_secs(integer(value) as u64);
}

fn set_snapshot_capacity(config: &mut Config, value: ConfigValue) {
    config.snapshot_capacity = integer(value);
}

fn set_snapshot_dir(config: &mut Config, value: ConfigValue) {
    if let ConfigValue::Text(dir) = value {
        config.snapshot_dir = Some(PathBuf::from(dir));
    }
}

fn set_max_event_depth(config: &mut Config, value: ConfigValue) {
    config.max_event_depth = integer(value);
}

fn set_recovery_strategy(config: &mut Config, value: ConfigValue) {
    if let ConfigValue::Enum(name) = value {
        if let Ok(strategy) = name.parse() {
            config.recovery_strategy = strategy;
        }
    }
}

fn set_log_file(config: &mut Config, value: ConfigValue) {
    if let ConfigValue::Text(path) = value {
        config.log_file = PathBuf::from(path);
    }
}

pub const DESCRIPTORS: &[ConfigDescriptor] = &[
    ConfigDescriptor {
        var: env::TAB_WIDTH,
        ty: ConfigType::Integer { min: 1, max: 16 },
        set: set_tab_width,
    },
    ConfigDescriptor {
        var: env::DEBUG,
        ty: ConfigType::Boolean,
        set: set_debug,
    },
    ConfigDescriptor {
        var: env::STATUS_DURATION_SECS,
        ty: ConfigType::Integer { min: 1, max: 3600 },
        set: set_status_duration,
    },
    ConfigDescriptor {
        var: env::SNAPSHOT_INTERVAL_SECS,
        ty: ConfigType::Integer {
            min: 1,
            max: 24 * 3600,
        },
        set: set_snapshot_interval,
    },
    ConfigDescriptor {
        var: env::SNAPSHOT_CAPACITY,
        ty: ConfigType::Integer { min: 1, max: 1000 },
        set: set_snapshot_capacity,
    },
    ConfigDescriptor {
        var: env::SNAPSHOT_DIR,
        ty: ConfigType::Text,
        set: set_snapshot_dir,
    },
    ConfigDescriptor {
        var: env::MAX_EVENT_DEPTH,
        ty: ConfigType::Integer { min: 1, max: 64 },
        set: set_max_event_depth,
    },
    ConfigDescriptor {
        var: env::RECOVERY_STRATEGY,
        ty: ConfigType::Enum {
            variants: &["latest", "rollback", "incremental"],
        },
        set: set_recovery_strategy,
    },
    ConfigDescriptor {
        var: env::LOG_FILE,
        ty: ConfigType::Text,
        set: set_log_file,
    },
];

/// Parse and validate a raw value against its type
pub fn parse_value(ty: &ConfigType, raw: &str) -> Result<ConfigValue, String> {
    let raw = raw.trim();
    match ty {
        ConfigType::Boolean => match raw.to_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(ConfigValue::Bool(true)),
            "false" | "0" | "off" | "no" | "" => Ok(ConfigValue::Bool(false)),
            _ => Err(format!("invalid boolean value: {raw}")),
        },
        ConfigType::Integer { min, max } => {
            let val = raw
                .parse::<usize>()
                .map_err(|_| format!("invalid integer value: {raw}"))?;
            if val < *min {
                return Err(format!("value {val} is below minimum {min}"));
            }
            if val > *max {
                return Err(format!("value {val} is above maximum {max}"));
            }
            Ok(ConfigValue::Integer(val))
        }
        ConfigType::Enum { variants } => {
            let lower = raw.to_lowercase();
            variants
                .iter()
                .find(|v| **v == lower)
                .map(|v| ConfigValue::Enum(*v))
                .ok_or_else(|| {
                    format!("invalid value: {raw} (expected one of {})", variants.join(", "))
                })
        }
        ConfigType::Text => {
            if raw.is_empty() {
                Err("empty value".to_string())
            } else {
                Ok(ConfigValue::Text(raw.to_string()))
            }
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`; unset variables keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        for descriptor in DESCRIPTORS {
            let Some(raw) = lookup(descriptor.var) else {
                continue;
            };
            match parse_value(&descriptor.ty, &raw) {
                Ok(value) => (descriptor.set)(&mut config, value),
                Err(e) => log::warn!("ignoring {}: {}", descriptor.var, e),
            }
        }
        config
    }
}
