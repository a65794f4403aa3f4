//! Registration data model for cmdtree applications.
//!
//! This crate intentionally holds plain data only. The types here describe:
//! - the command hierarchy handed to `cmdtree-resolve` (names, aliases, locators, subcommands)
//! - declarative option groups that the dispatcher turns into parser definitions
//!
//! Maps are `IndexMap`s so that registration order survives a JSON round-trip; sibling
//! order is observable in help output and in `children_names()`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Registration map: command name -> definition, in registration order.
pub type CommandSpecs = IndexMap<String, CommandSpec>;

/// Help text attached to a command.
///
/// The resolver never looks inside; it is carried through to help rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub usage: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Opaque locator forwarded to whatever loads the command implementation.
    #[serde(
        default,
        rename = "module",
        alias = "implementationLocator",
        skip_serializing_if = "Option::is_none"
    )]
    pub implementation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub sub_commands: CommandSpecs,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<HelpMetadata>,

    /// Options recognized only after this command was matched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub option_groups: Vec<OptionGroupSpec>,
}

impl CommandSpec {
    /// A command implemented by `module`.
    pub fn module(module: impl Into<String>) -> Self {
        Self {
            implementation: Some(module.into()),
            ..Default::default()
        }
    }

    /// A pure grouping namespace; only legal once it has subcommands.
    pub fn group() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn sub_command(mut self, name: impl Into<String>, spec: CommandSpec) -> Self {
        self.sub_commands.insert(name.into(), spec);
        self
    }

    pub fn help(mut self, help: HelpMetadata) -> Self {
        self.help = Some(help);
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.help.get_or_insert_with(HelpMetadata::default).summary = summary.into();
        self
    }

    pub fn option_group(mut self, group: OptionGroupSpec) -> Self {
        self.option_groups.push(group);
        self
    }
}

/// Declarative description of one option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSpec {
    /// Every spelling of the option, e.g. `["-o", "--output"]`.
    pub aliases: Vec<String>,
    /// Storage key for the parsed value. Derived from the aliases when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub has_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub multiple: bool,
    /// Listed first in help output. Has no effect on parsing.
    #[serde(default)]
    pub early: bool,
}

impl OptionSpec {
    /// The key parsed values are stored under.
    ///
    /// Falls back to the longest alias with its leading dashes removed
    /// (`["-o", "--output"]` -> `output`).
    pub fn key(&self) -> String {
        if let Some(key) = self.key.as_deref().filter(|k| !k.trim().is_empty()) {
            return key.trim().to_string();
        }
        self.aliases
            .iter()
            .max_by_key(|a| a.len())
            .map(|a| a.trim_start_matches('-').to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionGroupSpec {
    pub title: String,
    /// Common groups apply to every command of the application.
    #[serde(default)]
    pub common: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_specs_deserialize_in_registration_order() {
        let json = r#"{
  "zeta": { "module": "./zeta.js" },
  "copy": {
    "aliases": ["cp"],
    "className": "Copy",
    "subCommands": {
      "binary": { "module": "./copy/binary.js" },
      "ascii": { "implementationLocator": "./copy/ascii.js" }
    },
    "help": { "summary": "Copy things" }
  },
  "alpha": { "module": "./alpha.js" }
}"#;
        let specs: CommandSpecs = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = specs.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, ["zeta", "copy", "alpha"]);

        let copy = &specs["copy"];
        assert_eq!(copy.aliases, ["cp"]);
        assert_eq!(copy.implementation, None);
        assert_eq!(copy.class_name.as_deref(), Some("Copy"));
        assert_eq!(copy.help.as_ref().map(|h| h.summary.as_str()), Some("Copy things"));

        let subs: Vec<&str> = copy.sub_commands.keys().map(|k| k.as_str()).collect();
        assert_eq!(subs, ["binary", "ascii"]);
        assert_eq!(
            copy.sub_commands["ascii"].implementation.as_deref(),
            Some("./copy/ascii.js")
        );
    }

    #[test]
    fn builder_matches_json_shape() {
        let built = CommandSpec::group()
            .alias("cp")
            .summary("Copy things")
            .sub_command("binary", CommandSpec::module("./copy/binary.js"));
        let json = serde_json::to_value(&built).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "aliases": ["cp"],
                "subCommands": { "binary": { "module": "./copy/binary.js" } },
                "help": { "summary": "Copy things" }
            })
        );
    }

    #[test]
    fn option_key_defaults_to_longest_alias() {
        let spec = OptionSpec {
            aliases: vec!["-o".into(), "--output".into()],
            ..Default::default()
        };
        assert_eq!(spec.key(), "output");

        let spec = OptionSpec {
            aliases: vec!["-o".into()],
            key: Some("out_file".into()),
            ..Default::default()
        };
        assert_eq!(spec.key(), "out_file");
    }

    #[test]
    fn option_group_defaults() {
        let group: OptionGroupSpec = serde_json::from_str(
            r#"{ "title": "Common", "options": [ { "aliases": ["--loglevel"], "hasValue": true,
                 "allowedValues": ["silent", "info"] } ] }"#,
        )
        .unwrap();
        assert!(!group.common);
        let opt = &group.options[0];
        assert!(opt.has_value);
        assert!(!opt.mandatory && !opt.multiple && !opt.early);
        assert_eq!(
            opt.allowed_values.as_deref(),
            Some(&["silent".to_string(), "info".to_string()][..])
        );
    }
}
