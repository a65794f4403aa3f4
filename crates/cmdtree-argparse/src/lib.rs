//! Single-pass option parsing and help rendering.
//!
//! Options are declared in groups, each definition carrying its own `init`/`action`
//! callbacks over a caller-owned config value. Parsing never keeps state between calls:
//! every `parse()` re-runs all `init` callbacks, so the same groups can serve many
//! invocations (one per REPL line, one per session) without residue.

pub mod args {
    /// Leading tokens that look like command words (start with a letter).
    ///
    /// Collection stops at the first token that does not, typically an option.
    pub fn leading_words<S: AsRef<str>>(argv: &[S]) -> Vec<&str> {
        argv.iter()
            .map(|s| s.as_ref())
            .take_while(|arg| arg.chars().next().is_some_and(|c| c.is_alphabetic()))
            .collect()
    }

    /// Get the remaining arguments from a start index.
    pub fn rest<S>(argv: &[S], start: usize) -> &[S] {
        if start >= argv.len() {
            &argv[argv.len()..]
        } else {
            &argv[start..]
        }
    }
}

pub mod options {
    use std::fmt;

    type InitFn<C> = Box<dyn Fn(&mut C) + Send + Sync>;
    type ActionFn<C> = Box<dyn Fn(&mut C, Option<&str>) + Send + Sync>;

    /// One recognized option.
    ///
    /// `action` receives `None` for flags (the boolean-true effect) and `Some(value)`
    /// for value-taking options.
    pub struct OptionDefinition<C> {
        aliases: Vec<String>,
        has_value: bool,
        value_name: Option<String>,
        allowed_values: Option<Vec<String>>,
        mandatory: bool,
        multiple: bool,
        early: bool,
        help: String,
        init: Option<InitFn<C>>,
        action: ActionFn<C>,
    }

    impl<C> OptionDefinition<C> {
        fn with_action<I, S>(aliases: I, has_value: bool, action: ActionFn<C>) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                aliases: aliases.into_iter().map(Into::into).collect(),
                has_value,
                value_name: None,
                allowed_values: None,
                mandatory: false,
                multiple: false,
                early: false,
                help: String::new(),
                init: None,
                action,
            }
        }

        /// A boolean option such as `-v`/`--verbose`.
        pub fn flag<I, S, F>(aliases: I, action: F) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
            F: Fn(&mut C) + Send + Sync + 'static,
        {
            Self::with_action(
                aliases,
                false,
                Box::new(move |config: &mut C, _: Option<&str>| action(config)),
            )
        }

        /// An option taking a value, either `--name=value` or `--name value`.
        pub fn value<I, S, F>(aliases: I, action: F) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
            F: Fn(&mut C, &str) + Send + Sync + 'static,
        {
            Self::with_action(
                aliases,
                true,
                Box::new(move |config: &mut C, value: Option<&str>| {
                    action(config, value.unwrap_or_default())
                }),
            )
        }

        /// An option whose action handles both shapes itself.
        pub fn new<I, S, F>(aliases: I, has_value: bool, action: F) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
            F: Fn(&mut C, Option<&str>) + Send + Sync + 'static,
        {
            Self::with_action(aliases, has_value, Box::new(action))
        }

        /// Establish the option's default in the config. Runs at the start of every parse.
        pub fn init<F>(mut self, init: F) -> Self
        where
            F: Fn(&mut C) + Send + Sync + 'static,
        {
            self.init = Some(Box::new(init));
            self
        }

        pub fn allowed_values<I, S>(mut self, values: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.allowed_values = Some(values.into_iter().map(Into::into).collect());
            self
        }

        pub fn mandatory(mut self) -> Self {
            self.mandatory = true;
            self
        }

        pub fn multiple(mut self) -> Self {
            self.multiple = true;
            self
        }

        pub fn early(mut self) -> Self {
            self.early = true;
            self
        }

        pub fn help(mut self, help: impl Into<String>) -> Self {
            self.help = help.into();
            self
        }

        pub fn value_name(mut self, name: impl Into<String>) -> Self {
            self.value_name = Some(name.into());
            self
        }

        pub fn aliases(&self) -> &[String] {
            &self.aliases
        }

        pub fn has_value(&self) -> bool {
            self.has_value
        }

        pub fn get_value_name(&self) -> Option<&str> {
            self.value_name.as_deref()
        }

        pub fn get_allowed_values(&self) -> Option<&[String]> {
            self.allowed_values.as_deref()
        }

        pub fn is_mandatory(&self) -> bool {
            self.mandatory
        }

        pub fn is_multiple(&self) -> bool {
            self.multiple
        }

        pub fn is_early(&self) -> bool {
            self.early
        }

        pub fn get_help(&self) -> &str {
            &self.help
        }

        /// All aliases joined with `|`, as used in diagnostics.
        pub fn display_name(&self) -> String {
            self.aliases.join("|")
        }

        pub fn matches(&self, name: &str) -> bool {
            self.aliases.iter().any(|a| a == name)
        }

        pub(crate) fn run_init(&self, config: &mut C) {
            if let Some(init) = &self.init {
                init(config);
            }
        }

        pub(crate) fn run_action(&self, config: &mut C, value: Option<&str>) {
            (self.action)(config, value);
        }
    }

    impl<C> fmt::Debug for OptionDefinition<C> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("OptionDefinition")
                .field("aliases", &self.aliases)
                .field("has_value", &self.has_value)
                .field("allowed_values", &self.allowed_values)
                .field("mandatory", &self.mandatory)
                .field("multiple", &self.multiple)
                .field("early", &self.early)
                .finish_non_exhaustive()
        }
    }

    /// A titled set of options. Common groups apply to every command.
    pub struct OptionGroup<C> {
        title: String,
        common: bool,
        definitions: Vec<OptionDefinition<C>>,
    }

    impl<C> OptionGroup<C> {
        pub fn new(title: impl Into<String>) -> Self {
            Self {
                title: title.into(),
                common: false,
                definitions: Vec::new(),
            }
        }

        pub fn common(mut self) -> Self {
            self.common = true;
            self
        }

        pub fn option(mut self, definition: OptionDefinition<C>) -> Self {
            self.definitions.push(definition);
            self
        }

        pub fn push(&mut self, definition: OptionDefinition<C>) {
            self.definitions.push(definition);
        }

        pub fn title(&self) -> &str {
            &self.title
        }

        pub fn is_common(&self) -> bool {
            self.common
        }

        pub fn definitions(&self) -> &[OptionDefinition<C>] {
            &self.definitions
        }
    }

    impl<C> fmt::Debug for OptionGroup<C> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("OptionGroup")
                .field("title", &self.title)
                .field("common", &self.common)
                .field("definitions", &self.definitions)
                .finish()
        }
    }
}

pub mod parser {
    use super::options::{OptionDefinition, OptionGroup};

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum ParseError {
        #[error("'{0}' expects a value")]
        MissingValue(String),
        #[error("Value '{value}' not allowed for '{option}'")]
        ValueNotAllowed { option: String, value: String },
    }

    pub type ParseResult<T> = Result<T, ParseError>;

    /// Outcome of one parse.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ParsedArgs {
        /// Tokens not consumed as options, in their original order.
        pub remainder: Vec<String>,
        /// One `Mandatory '<aliases>' not found` message per missing mandatory option.
        pub missing_mandatory: Vec<String>,
    }

    impl ParsedArgs {
        pub fn is_complete(&self) -> bool {
            self.missing_mandatory.is_empty()
        }
    }

    /// Command-specific definitions come first, then common ones. Lookup is first match.
    fn flatten<'g, C>(groups: &[&'g OptionGroup<C>]) -> Vec<&'g OptionDefinition<C>> {
        let specific = groups.iter().filter(|g| !g.is_common());
        let common = groups.iter().filter(|g| g.is_common());
        specific
            .chain(common)
            .copied()
            .flat_map(|g| g.definitions().iter())
            .collect()
    }

    /// Parse `argv` against `groups`, applying option actions to `config`.
    ///
    /// - `--` ends option scanning; it is dropped and everything after it is kept verbatim
    /// - unknown `-`/`--` tokens and plain words go to `remainder` in order
    /// - value options take `--name=value` or the next token
    pub fn parse<C, S: AsRef<str>>(
        argv: &[S],
        groups: &[&OptionGroup<C>],
        config: &mut C,
    ) -> ParseResult<ParsedArgs> {
        let defs = flatten(groups);
        for def in &defs {
            def.run_init(config);
        }
        let mut processed = vec![false; defs.len()];

        let mut out = ParsedArgs::default();
        let mut i = 0usize;
        while i < argv.len() {
            let arg = argv[i].as_ref();

            if arg == "--" {
                out.remainder
                    .extend(argv[i + 1..].iter().map(|s| s.as_ref().to_string()));
                break;
            }

            if !arg.starts_with('-') {
                out.remainder.push(arg.to_string());
                i += 1;
                continue;
            }

            let (name, inline_value) = match arg.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (arg, None),
            };

            let Some(idx) = defs.iter().position(|d| d.matches(name)) else {
                tracing::trace!(token = arg, "unrecognized option kept in remainder");
                out.remainder.push(arg.to_string());
                i += 1;
                continue;
            };
            let def = defs[idx];

            if def.has_value() {
                let value = match inline_value {
                    Some(value) => value,
                    None => {
                        i += 1;
                        match argv.get(i) {
                            Some(value) => value.as_ref(),
                            None => return Err(ParseError::MissingValue(name.to_string())),
                        }
                    }
                };
                if let Some(allowed) = def.get_allowed_values() {
                    if !allowed.iter().any(|a| a == value) {
                        return Err(ParseError::ValueNotAllowed {
                            option: name.to_string(),
                            value: value.to_string(),
                        });
                    }
                }
                tracing::trace!(option = name, value, "option value");
                def.run_action(config, Some(value));
            } else {
                tracing::trace!(option = name, "flag");
                def.run_action(config, None);
            }
            processed[idx] = true;
            i += 1;
        }

        out.missing_mandatory = defs
            .iter()
            .zip(&processed)
            .filter(|(def, seen)| def.is_mandatory() && !**seen)
            .map(|(def, _)| format!("Mandatory '{}' not found", def.display_name()))
            .collect();

        tracing::debug!(
            remainder = out.remainder.len(),
            missing = out.missing_mandatory.len(),
            "parsed options"
        );
        Ok(out)
    }
}

pub mod help {
    use super::options::{OptionDefinition, OptionGroup};

    fn format_option_left<C>(def: &OptionDefinition<C>) -> String {
        let mut out = def.aliases().join(", ");
        if def.has_value() {
            let name = def.get_value_name().unwrap_or("value");
            out.push_str(&format!(" <{name}>"));
        }
        out
    }

    fn format_option_help<C>(def: &OptionDefinition<C>) -> String {
        let mut out = def.get_help().trim().to_string();
        let mut push = |text: &str| {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(text);
        };
        if let Some(allowed) = def.get_allowed_values() {
            push(&format!("[{}]", allowed.join(", ")));
        }
        if def.is_multiple() {
            push("(multiple)");
        }
        if def.is_mandatory() {
            push("(mandatory)");
        }
        out
    }

    fn push_rows(out: &mut String, rows: &[(String, String)], width: usize) {
        for (left, help) in rows {
            if help.is_empty() {
                out.push_str(&format!("  {}\n", left));
            } else {
                out.push_str(&format!("  {:width$}  {}\n", left, help, width = width));
            }
        }
    }

    /// Render option groups, one titled section per non-empty group.
    ///
    /// Early options are listed before the rest of their group. The left column is
    /// aligned across all groups.
    pub fn options<C>(groups: &[&OptionGroup<C>]) -> String {
        let sections: Vec<(&str, Vec<(String, String)>)> = groups
            .iter()
            .filter(|g| !g.definitions().is_empty())
            .map(|g| {
                let (early, late): (Vec<_>, Vec<_>) =
                    g.definitions().iter().partition(|d| d.is_early());
                let rows = early
                    .into_iter()
                    .chain(late)
                    .map(|d| (format_option_left(d), format_option_help(d)))
                    .collect();
                (g.title(), rows)
            })
            .collect();

        let width = sections
            .iter()
            .flat_map(|(_, rows)| rows.iter().map(|(l, _)| l.len()))
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for (title, rows) in sections {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("{}:\n", title.trim_end_matches(':')));
            push_rows(&mut out, &rows, width);
        }
        out
    }

    /// Render a `Commands:` section from `(name, summary)` rows.
    pub fn commands(rows: &[(String, String)]) -> String {
        if rows.is_empty() {
            return String::new();
        }
        let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        let mut out = String::from("Commands:\n");
        push_rows(&mut out, rows, width);
        out
    }
}

pub use options::{OptionDefinition, OptionGroup};
pub use parser::{ParseError, ParseResult, ParsedArgs, parse};

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Config {
        log_level: String,
        verbose: bool,
        output: Option<String>,
        includes: Vec<String>,
    }

    fn common_group() -> OptionGroup<Config> {
        OptionGroup::new("Common options")
            .common()
            .option(
                OptionDefinition::value(["--loglevel"], |c: &mut Config, v| {
                    c.log_level = v.to_string()
                })
                .init(|c| c.log_level = "info".to_string())
                .allowed_values(["silent", "warn", "info", "verbose", "debug", "trace"])
                .help("Set log level"),
            )
            .option(
                OptionDefinition::flag(["-v", "--verbose"], |c: &mut Config| c.verbose = true)
                    .init(|c| c.verbose = false),
            )
    }

    fn command_group() -> OptionGroup<Config> {
        OptionGroup::new("Copy options")
            .option(
                OptionDefinition::value(["-o", "--output"], |c: &mut Config, v| {
                    c.output = Some(v.to_string())
                })
                .init(|c| c.output = None)
                .mandatory()
                .value_name("file"),
            )
            .option(
                OptionDefinition::value(["-I", "--include"], |c: &mut Config, v| {
                    c.includes.push(v.to_string())
                })
                .init(|c| c.includes.clear())
                .multiple(),
            )
    }

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn value_option_without_value_fails() {
        let common = common_group();
        let mut config = Config::default();
        let err = parse(&argv(&["--loglevel"]), &[&common], &mut config).unwrap_err();
        assert_eq!(err, ParseError::MissingValue("--loglevel".into()));
        assert_eq!(err.to_string(), "'--loglevel' expects a value");
    }

    #[test]
    fn value_outside_allowed_set_fails() {
        let common = common_group();
        let mut config = Config::default();
        let err = parse(&argv(&["--loglevel", "xxx"]), &[&common], &mut config).unwrap_err();
        assert_eq!(err.to_string(), "Value 'xxx' not allowed for '--loglevel'");

        let err = parse(&argv(&["--loglevel=xxx"]), &[&common], &mut config).unwrap_err();
        assert_eq!(err.to_string(), "Value 'xxx' not allowed for '--loglevel'");
    }

    #[test]
    fn remainder_preserves_unknown_tokens_and_drops_separator() {
        let common = common_group();
        let mut config = Config::default();
        let parsed = parse(
            &argv(&["abc", "-bcd", "cde", "--def", "--", "--xyz"]),
            &[&common],
            &mut config,
        )
        .unwrap();
        assert_eq!(parsed.remainder, ["abc", "-bcd", "cde", "--def", "--xyz"]);
        assert!(parsed.missing_mandatory.is_empty());
    }

    #[test]
    fn options_after_separator_are_not_interpreted() {
        let common = common_group();
        let mut config = Config::default();
        let parsed = parse(
            &argv(&["--", "--verbose", "--loglevel"]),
            &[&common],
            &mut config,
        )
        .unwrap();
        assert_eq!(parsed.remainder, ["--verbose", "--loglevel"]);
        assert!(!config.verbose);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn value_taken_from_next_slot_or_equals_suffix() {
        let common = common_group();
        let copy = command_group();
        let mut config = Config::default();
        let parsed = parse(
            &argv(&["src", "--loglevel", "debug", "-o=out.bin", "-v", "dst"]),
            &[&common, &copy],
            &mut config,
        )
        .unwrap();
        assert_eq!(parsed.remainder, ["src", "dst"]);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.output.as_deref(), Some("out.bin"));
        assert!(config.verbose);
    }

    #[test]
    fn mandatory_option_reported_with_all_aliases() {
        let copy = command_group();
        let mut config = Config::default();
        let parsed = parse(&argv(&["file"]), &[&copy], &mut config).unwrap();
        assert_eq!(parsed.missing_mandatory, ["Mandatory '-o|--output' not found"]);
        assert!(!parsed.is_complete());

        let parsed = parse(&argv(&["file", "--output", "x"]), &[&copy], &mut config).unwrap();
        assert!(parsed.missing_mandatory.is_empty());
    }

    #[test]
    fn reparse_does_not_carry_state_over() {
        let common = common_group();
        let copy = command_group();
        let groups = [&copy, &common];
        let mut config = Config::default();

        let first = parse(
            &argv(&["-o", "a", "-I", "x", "-I", "y", "--verbose", "--loglevel", "trace"]),
            &groups,
            &mut config,
        )
        .unwrap();
        assert!(first.is_complete());
        assert_eq!(config.includes, ["x", "y"]);
        assert!(config.verbose);

        let second = parse(&argv(&["-I", "z"]), &groups, &mut config).unwrap();
        assert_eq!(second.missing_mandatory.len(), 1);
        assert_eq!(config.includes, ["z"]);
        assert!(!config.verbose);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.output, None);
    }

    #[test]
    fn command_groups_take_precedence_over_common_groups() {
        let common = OptionGroup::new("Common")
            .common()
            .option(OptionDefinition::flag(["-x"], |c: &mut Vec<&'static str>| {
                c.push("common")
            }));
        let specific = OptionGroup::new("Specific")
            .option(OptionDefinition::flag(["-x"], |c: &mut Vec<&'static str>| {
                c.push("specific")
            }));
        let mut seen = Vec::new();
        parse(&["-x"], &[&common, &specific], &mut seen).unwrap();
        assert_eq!(seen, ["specific"]);
    }

    #[test]
    fn flag_ignores_equals_suffix() {
        let common = common_group();
        let mut config = Config::default();
        let parsed = parse(&["--verbose=no"], &[&common], &mut config).unwrap();
        assert!(parsed.remainder.is_empty());
        assert!(config.verbose);
    }

    #[test]
    fn leading_words_stop_at_first_option() {
        let argv = ["copy", "binary", "-o", "x", "more"];
        assert_eq!(args::leading_words(&argv), ["copy", "binary"]);
        assert!(args::leading_words(&["--help", "copy"]).is_empty());
        assert!(args::leading_words(&["1st", "copy"]).is_empty());
        assert_eq!(args::rest(&argv, 2), ["-o", "x", "more"]);
        assert!(args::rest(&argv, 9).is_empty());
    }

    #[test]
    fn help_lists_early_options_first() {
        let group = OptionGroup::<Config>::new("Common options")
            .option(OptionDefinition::flag(["--late"], |_| {}).help("Late"))
            .option(OptionDefinition::flag(["-h", "--help"], |_| {}).early().help("Help"));
        let copy = command_group();
        let text = help::options(&[&group, &copy]);

        let help_pos = text.find("-h, --help").unwrap();
        let late_pos = text.find("--late").unwrap();
        assert!(help_pos < late_pos, "early option not first:\n{text}");
        assert!(text.contains("Copy options:\n"));
        assert!(text.contains("-o, --output <file>"));
        assert!(text.contains("(mandatory)"));
        assert!(text.contains("(multiple)"));
    }

    #[test]
    fn help_renders_allowed_values() {
        let common = common_group();
        let text = help::options(&[&common]);
        assert!(text.contains("--loglevel <value>"));
        assert!(text.contains("Set log level [silent, warn, info, verbose, debug, trace]"));
    }

    #[test]
    fn help_commands_aligns_summaries() {
        let text = help::commands(&[
            ("copy".to_string(), "Copy files".to_string()),
            ("config".to_string(), String::new()),
        ]);
        assert_eq!(text, "Commands:\n  copy    Copy files\n  config\n");
        assert!(help::commands(&[]).is_empty());
    }
}
