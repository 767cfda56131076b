//! KDL configuration parser

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::model::*;

/// Default location of the configuration file
const DEFAULT_CONFIG_PATH: &str = "~/.config/sway-mirror/config.kdl";

/// Default configuration path with `~` expanded
pub fn default_config_path() -> PathBuf {
    shellexpand::tilde(DEFAULT_CONFIG_PATH).into_owned().into()
}

/// Load the configuration, falling back to defaults if the file is missing
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    parse_config(path)
}

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl reports spans with its own miette version
        let span = source_span(e.span.offset(), e.span.len());
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node, content)?;
            }
            "ipc" => {
                config.ipc = parse_ipc(node, content)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

fn source_span(offset: usize, len: usize) -> miette::SourceSpan {
    miette::SourceSpan::from((offset, len))
}

fn invalid_value(entry: &kdl::KdlEntry, key: &str, message: String, source: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message,
        src: source.to_string(),
        span: source_span(entry.span().offset(), entry.span().len()),
    }
}

/// Positional arguments of a node, skipping `key=value` properties
fn arguments(node: &kdl::KdlNode) -> impl Iterator<Item = &kdl::KdlEntry> {
    node.entries().iter().filter(|e| e.name().is_none())
}

fn first_argument<'a>(node: &'a kdl::KdlNode, key: &str) -> Result<&'a kdl::KdlEntry, ConfigError> {
    arguments(node).next().ok_or_else(|| ConfigError::MissingValue {
        key: key.to_string(),
    })
}

fn string_argument<'a>(
    node: &'a kdl::KdlNode,
    key: &str,
    source: &str,
) -> Result<&'a str, ConfigError> {
    let entry = first_argument(node, key)?;
    entry
        .value()
        .as_string()
        .ok_or_else(|| invalid_value(entry, key, "expected a string".to_string(), source))
}

fn parse_global(node: &kdl::KdlNode, source: &str) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    let entry = first_argument(child, "log-level")?;
                    let level = entry
                        .value()
                        .as_string()
                        .ok_or_else(|| "expected a string".to_string())
                        .and_then(str::parse)
                        .map_err(|message| invalid_value(entry, "log-level", message, source))?;
                    global.log_level = Some(level);
                }
                "socket-path" => {
                    let val = string_argument(child, "socket-path", source)?;
                    global.socket_path = Some(shellexpand::tilde(val).into_owned().into());
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_ipc(node: &kdl::KdlNode, source: &str) -> Result<IpcConfig, ConfigError> {
    let mut ipc = IpcConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "subscribe" => {
                    ipc.subscribe = parse_subscribe(child, source)?;
                }
                "max-retries" => {
                    let entry = first_argument(child, "max-retries")?;
                    let value = entry.value().as_i64().ok_or_else(|| {
                        invalid_value(entry, "max-retries", "expected an integer".to_string(), source)
                    })?;
                    ipc.max_retries = u32::try_from(value).map_err(|_| {
                        invalid_value(
                            entry,
                            "max-retries",
                            format!("{} is out of range", value),
                            source,
                        )
                    })?;
                }
                name => {
                    tracing::warn!("Unknown ipc config option: {}", name);
                }
            }
        }
    }

    Ok(ipc)
}

fn parse_subscribe(node: &kdl::KdlNode, source: &str) -> Result<Vec<String>, ConfigError> {
    let mut events = Vec::new();

    for entry in arguments(node) {
        let name = entry.value().as_string().ok_or_else(|| {
            invalid_value(entry, "subscribe", "expected an event name".to_string(), source)
        })?;

        if !KNOWN_EVENTS.contains(&name) {
            return Err(invalid_value(
                entry,
                "subscribe",
                format!("unknown event class '{}'", name),
                source,
            ));
        }

        if !events.iter().any(|e| e == name) {
            events.push(name.to_string());
        }
    }

    if events.is_empty() {
        return Err(ConfigError::Invalid {
            message: "`subscribe` needs at least one event class, e.g. `subscribe \"window\"`"
                .to_string(),
        });
    }

    Ok(events)
}
