use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(sway_mirror::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(sway_mirror::config::invalid))]
    Invalid { message: String },

    #[error("Invalid value for `{key}`: {message}")]
    #[diagnostic(code(sway_mirror::config::invalid_value))]
    InvalidValue {
        key: String,
        message: String,
        #[source_code]
        src: String,
        #[label("{message}")]
        span: miette::SourceSpan,
    },

    #[error("Missing value for `{key}`")]
    #[diagnostic(code(sway_mirror::config::missing_value))]
    MissingValue { key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
