use std::collections::HashMap;
use std::sync::Arc;

use cmdtree_argparse::{OptionGroup, args, help, parse};
use cmdtree_metadata::CommandSpecs;
use cmdtree_resolve::{CommandModule, CommandTree, NodeId};
use serde::Serialize;

use crate::error::CliError;
use crate::manifest::Manifest;
use crate::options::{OptionValues, group_from_spec};

/// Command tree plus the option groups that apply to its commands.
///
/// Built once at startup, then only read. Share it between sessions through an `Arc`.
pub struct Application<C> {
    tree: CommandTree,
    common: Vec<OptionGroup<C>>,
    command_groups: HashMap<NodeId, Vec<OptionGroup<C>>>,
}

impl<C> Application<C> {
    pub fn new(tree: CommandTree) -> Self {
        Self {
            tree,
            common: Vec::new(),
            command_groups: HashMap::new(),
        }
    }

    /// Add a group that applies to every command.
    pub fn with_common_group(mut self, group: OptionGroup<C>) -> Self {
        self.common.push(group.common());
        self
    }

    /// Attach a group to one command. Common groups are still merged in at parse time.
    pub fn attach(&mut self, node: NodeId, group: OptionGroup<C>) {
        self.command_groups.entry(node).or_default().push(group);
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn common_groups(&self) -> &[OptionGroup<C>] {
        &self.common
    }

    /// Groups in effect for `node`: its own first, then the common ones.
    pub fn groups_for(&self, node: NodeId) -> Vec<&OptionGroup<C>> {
        self.command_groups
            .get(&node)
            .into_iter()
            .flatten()
            .chain(self.common.iter())
            .collect()
    }

    /// Help text for `node` (use the tree root for the application overview).
    pub fn help(&self, node: NodeId, program: &str) -> String {
        let tree = &self.tree;
        let meta = tree.node(node).help();
        let path = tree.canonical_path(node);
        let invoked = std::iter::once(program)
            .chain(path.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");

        let mut sections = Vec::new();
        if !meta.summary.is_empty() {
            sections.push(format!("{}\n", meta.summary.trim()));
        }

        let usage = if !meta.usage.is_empty() {
            meta.usage.trim().to_string()
        } else if tree.node(node).has_children() {
            format!("{invoked} <command> [options]")
        } else {
            format!("{invoked} [options]")
        };
        sections.push(format!("Usage: {usage}\n"));

        if !meta.description.is_empty() {
            sections.push(format!("{}\n", meta.description.trim()));
        }

        let rows: Vec<(String, String)> = tree
            .children(node)
            .map(|child| {
                let child = tree.node(child);
                let mut name = child.name().to_string();
                if !child.aliases().is_empty() {
                    name.push_str(&format!(" ({})", child.aliases().join(", ")));
                }
                (name, child.help().summary.clone())
            })
            .collect();
        let commands = help::commands(&rows);
        if !commands.is_empty() {
            sections.push(commands);
        }

        let options = help::options(&self.groups_for(node));
        if !options.is_empty() {
            sections.push(options);
        }

        if !meta.examples.is_empty() {
            let mut examples = String::from("Examples:\n");
            for example in &meta.examples {
                examples.push_str(&format!("  {example}\n"));
            }
            sections.push(examples);
        }

        sections.join("\n")
    }
}

impl Application<OptionValues> {
    /// Build the tree and option groups declared in a manifest.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, CliError> {
        let tree = CommandTree::from_specs(&manifest.commands)?;
        let mut app = Self::new(tree);
        for group in &manifest.options {
            app.common.push(group_from_spec(group, true));
        }
        let root = app.tree.root();
        app.attach_specs(root, &manifest.commands)?;
        tracing::debug!(
            commands = app.tree.len(),
            common_groups = app.common.len(),
            "application loaded"
        );
        Ok(app)
    }

    fn attach_specs(&mut self, parent: NodeId, specs: &CommandSpecs) -> Result<(), CliError> {
        for (name, spec) in specs {
            let Some(id) = self.tree.child(parent, name) else {
                let mut path = self.tree.canonical_path(parent).join(" ");
                if !path.is_empty() {
                    path.push(' ');
                }
                path.push_str(name.trim());
                return Err(CliError::UnknownCommandPath(path));
            };
            for group in &spec.option_groups {
                let group = group_from_spec(group, false);
                if group.is_common() {
                    self.common.push(group);
                } else {
                    self.attach(id, group);
                }
            }
            self.attach_specs(id, &spec.sub_commands)?;
        }
        Ok(())
    }
}

/// The outcome of dispatching one argv.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    /// `None` when argv starts with an option (or is empty).
    pub command: Option<CommandModule>,
    /// Arguments after the command words that were not consumed as options.
    pub remainder: Vec<String>,
    pub missing_mandatory: Vec<String>,
}

impl Invocation {
    pub fn ensure_complete(self) -> Result<Self, CliError> {
        if self.missing_mandatory.is_empty() {
            Ok(self)
        } else {
            Err(CliError::MissingMandatory(self.missing_mandatory))
        }
    }
}

/// One dispatch context: a shared application and a config value of its own.
pub struct Session<C> {
    app: Arc<Application<C>>,
    config: C,
}

impl<C> Session<C> {
    pub fn new(app: Arc<Application<C>>, config: C) -> Self {
        Self { app, config }
    }

    pub fn application(&self) -> &Application<C> {
        &self.app
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn into_config(self) -> C {
        self.config
    }

    /// Resolve the command words at the front of `argv`, then parse what follows.
    ///
    /// Options in effect are re-initialized on every call, so a session can dispatch repeatedly.
    pub fn dispatch<S: AsRef<str>>(&mut self, argv: &[S]) -> Result<Invocation, CliError> {
        let tree = self.app.tree();
        let words = args::leading_words(argv);

        let (command, groups, start): (Option<CommandModule>, Vec<&OptionGroup<C>>, usize) =
            if words.is_empty() {
                (None, self.app.common_groups().iter().collect(), 0)
            } else {
                let resolved = tree.find_command_node(&words)?;
                let node = resolved.node;
                let consumed = resolved.consumed;
                let module = tree.command_module(resolved)?;
                (Some(module), self.app.groups_for(node), consumed)
            };

        let parsed = parse(args::rest(argv, start), &groups, &mut self.config)?;
        if let Some(module) = &command {
            tracing::debug!(
                implementation = module.implementation.as_str(),
                remainder = parsed.remainder.len(),
                "dispatched"
            );
        }
        Ok(Invocation {
            command,
            remainder: parsed.remainder,
            missing_mandatory: parsed.missing_mandatory,
        })
    }
}
