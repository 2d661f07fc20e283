use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MacpineError {
    #[error("invalid {field}: {message}")]
    #[diagnostic(code(macpine::validation))]
    Validation { field: &'static str, message: String },

    #[error("instance with name \"{alias}\" already exists")]
    #[diagnostic(
        code(macpine::alias_exists),
        help("pick another --name or remove the existing instance first")
    )]
    AliasExists { alias: String },

    #[error("could not determine the home directory")]
    #[diagnostic(code(macpine::io))]
    HomeDirNotFound,

    #[error("{context}")]
    #[diagnostic(code(macpine::io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}: {message}")]
    #[diagnostic(code(macpine::config_parse))]
    ConfigParse { path: String, message: String },

    #[error("failed to serialize config for {alias}: {message}")]
    #[diagnostic(code(macpine::config_write))]
    ConfigSerialize { alias: String, message: String },

    #[error("{message}")]
    #[diagnostic(code(macpine::engine))]
    Engine { message: String },

    #[error("failed to launch instance {alias}")]
    #[diagnostic(code(macpine::launch))]
    Launch {
        alias: String,
        #[source]
        source: Box<MacpineError>,
    },
}

impl MacpineError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        MacpineError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        MacpineError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Process exit status for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            MacpineError::Validation { .. } => 2,
            MacpineError::AliasExists { .. } => 3,
            MacpineError::HomeDirNotFound
            | MacpineError::Io { .. }
            | MacpineError::ConfigParse { .. }
            | MacpineError::ConfigSerialize { .. } => 4,
            MacpineError::Engine { .. } | MacpineError::Launch { .. } => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_kind() {
        assert_eq!(MacpineError::validation("memory", "too small").exit_code(), 2);
        assert_eq!(
            MacpineError::AliasExists {
                alias: "web".into()
            }
            .exit_code(),
            3
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(MacpineError::io("reading config", io).exit_code(), 4);
        let launch = MacpineError::Launch {
            alias: "web".into(),
            source: Box::new(MacpineError::Engine {
                message: "qemu exited".into(),
            }),
        };
        assert_eq!(launch.exit_code(), 5);
    }

    #[test]
    fn validation_message_names_field() {
        let err = MacpineError::validation("disk", "suffix must be K, M, or G");
        assert_eq!(err.to_string(), "invalid disk: suffix must be K, M, or G");
    }
}
