//! Configuration parsing for sway-mirror
//!
//! This crate handles parsing the KDL configuration file that controls how
//! sway-mirror finds the sway socket, what it subscribes to and how loudly it
//! logs.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{default_config_path, load_config, parse_config, parse_config_str};
