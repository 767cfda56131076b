//! Configuration data model

use std::path::PathBuf;

/// Event classes sway accepts in a `SUBSCRIBE` request
pub const KNOWN_EVENTS: &[&str] = &[
    "workspace",
    "output",
    "mode",
    "window",
    "barconfig_update",
    "binding",
    "shutdown",
    "tick",
    "bar_state_update",
    "input",
];

/// Connection retries when the config does not set `max-retries`
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub global: GlobalConfig,
    pub ipc: IpcConfig,
}

/// Global settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Unset means "let the binary pick"
    pub log_level: Option<LogLevel>,
    /// Overrides `$SWAYSOCK` / `$I3SOCK`
    pub socket_path: Option<PathBuf>,
}

/// IPC connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcConfig {
    /// Event classes to subscribe to
    pub subscribe: Vec<String>,
    /// Connection retries before giving up
    pub max_retries: u32,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            subscribe: vec!["window".to_string(), "workspace".to_string()],
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive usable in a `tracing` `EnvFilter`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
