use cmdtree_argparse::ParseError;
use cmdtree_resolve::{ConfigError, ResolveError};

/// Process exit statuses used by cmdtree front ends.
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const SYNTAX_ERROR: u8 = 1;
    pub const APPLICATION_ERROR: u8 = 2;
    pub const INPUT_ERROR: u8 = 3;
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{}", .0.join("\n"))]
    MissingMandatory(Vec<String>),

    /// The command table itself is broken.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("option groups attached to unknown command '{0}'")]
    UnknownCommandPath(String),
}

impl CliError {
    /// Errors caused by what the user typed, as opposed to how the application is built.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            CliError::Resolve(_) | CliError::Parse(_) | CliError::MissingMandatory(_)
        )
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_syntax() {
            exit_code::SYNTAX_ERROR
        } else {
            exit_code::APPLICATION_ERROR
        }
    }
}
