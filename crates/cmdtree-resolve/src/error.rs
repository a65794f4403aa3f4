/// Registration mistakes. These indicate a bug in the application's command table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("empty command name under '{parent}'")]
    EmptyName { parent: String },

    #[error("command name '{name}' under '{parent}' contains whitespace")]
    Whitespace { name: String, parent: String },

    #[error("duplicate command name or alias '{name}' under '{parent}'")]
    Duplicate { name: String, parent: String },

    #[error("command '{0}' has neither an implementation nor subcommands")]
    MissingImplementation(String),
}

/// Unresolvable user input. Callers print the message and exit with a syntax error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Missing command.")]
    MissingCommand,

    #[error("Command '{0}' not supported.")]
    NotSupported(String),

    #[error("Command '{0}' is not unique.")]
    NotUnique(String),

    /// `suggestion` is the canonical path of the command the typed text started to match.
    #[error("Command '{typed}' is probably misspelled.")]
    Misspelled { typed: String, suggestion: String },

    #[error("Command '{path}' requires a subcommand.")]
    MissingSubcommand { path: String, available: Vec<String> },
}
