//! The command hierarchy and multi-token resolution.

use cmdtree_metadata::{CommandSpecs, HelpMetadata};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{ConfigError, ResolveError};
use crate::trie::{CharacterTrie, InsertError, Lookup};
use crate::{NodeId, normalize};

const ROOT: NodeId = NodeId(0);

#[derive(Debug, Clone)]
pub struct CommandNode {
    name: String,
    aliases: Vec<String>,
    implementation: Option<String>,
    class_name: Option<String>,
    help: HelpMetadata,
    children: IndexMap<String, NodeId>,
    parent: Option<NodeId>,
    depth: usize,
    /// Index over the names and aliases of `children`.
    scope: CharacterTrie,
}

impl CommandNode {
    fn root() -> Self {
        Self {
            name: String::new(),
            aliases: Vec::new(),
            implementation: None,
            class_name: None,
            help: HelpMetadata::default(),
            children: IndexMap::new(),
            parent: None,
            depth: 1,
            scope: CharacterTrie::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn implementation(&self) -> Option<&str> {
        self.implementation.as_deref()
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn help(&self) -> &HelpMetadata {
        &self.help
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Root is 1; each level of subcommands adds one.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn scope(&self) -> &CharacterTrie {
        &self.scope
    }
}

/// A node reached by [`CommandTree::find_command_node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub node: NodeId,
    /// Typed tokens that named the command path (`depth - 1` of them).
    pub consumed: usize,
    /// Trailing tokens left for the command itself.
    pub unused: Vec<String>,
}

/// What a module loader needs to run a resolved command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandModule {
    pub implementation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Unaliased names from the top-level command down.
    pub canonical_path: Vec<String>,
    pub unused: Vec<String>,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![CommandNode::root()],
        }
    }

    pub fn from_specs(specs: &CommandSpecs) -> Result<Self, ConfigError> {
        let mut tree = Self::new();
        tree.add_commands(specs)?;
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.index()]
    }

    /// Number of registered commands, not counting the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register top-level commands.
    pub fn add_commands(&mut self, specs: &CommandSpecs) -> Result<(), ConfigError> {
        self.add_commands_under(ROOT, specs)
    }

    /// Register `specs` as children of `parent`, recursing into their subcommands.
    ///
    /// All or nothing: on error the tree is left exactly as it was.
    pub fn add_commands_under(
        &mut self,
        parent: NodeId,
        specs: &CommandSpecs,
    ) -> Result<(), ConfigError> {
        let mut staged = self.clone();
        staged.register_under(parent, specs)?;
        *self = staged;
        Ok(())
    }

    fn register_under(&mut self, parent: NodeId, specs: &CommandSpecs) -> Result<(), ConfigError> {
        for (raw_name, spec) in specs {
            let name = normalize(raw_name);
            let parent_path = self.display_path(parent);

            if spec.implementation.is_none() && spec.sub_commands.is_empty() {
                let full = if parent_path.is_empty() {
                    name.clone()
                } else {
                    format!("{parent_path} {name}")
                };
                return Err(ConfigError::MissingImplementation(full));
            }

            let id = NodeId(self.nodes.len());
            let depth = self.nodes[parent.index()].depth + 1;
            let aliases: Vec<String> = spec.aliases.iter().map(|a| normalize(a)).collect();

            let scope = &mut self.nodes[parent.index()].scope;
            for spelling in std::iter::once(&name).chain(aliases.iter()) {
                scope.insert(spelling, id).map_err(|err| match err {
                    InsertError::Empty => ConfigError::EmptyName {
                        parent: parent_path.clone(),
                    },
                    InsertError::Whitespace => ConfigError::Whitespace {
                        name: spelling.clone(),
                        parent: parent_path.clone(),
                    },
                    InsertError::Duplicate(_) => ConfigError::Duplicate {
                        name: spelling.clone(),
                        parent: parent_path.clone(),
                    },
                })?;
            }

            tracing::trace!(command = name.as_str(), depth, "registered command");
            self.nodes.push(CommandNode {
                name: name.clone(),
                aliases,
                implementation: spec.implementation.clone(),
                class_name: spec.class_name.clone(),
                help: spec.help.clone().unwrap_or_default(),
                children: IndexMap::new(),
                parent: Some(parent),
                depth,
                scope: CharacterTrie::new(),
            });
            self.nodes[parent.index()].children.insert(name, id);

            if !spec.sub_commands.is_empty() {
                self.register_under(id, &spec.sub_commands)?;
            }
        }
        Ok(())
    }

    /// Direct children of `id`, in registration order.
    pub fn children_names(&self, id: NodeId) -> Vec<&str> {
        self.node(id).children.keys().map(|k| k.as_str()).collect()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).children.values().copied()
    }

    /// The child registered under exactly `name` (aliases and abbreviations not accepted).
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id).children.get(&normalize(name)).copied()
    }

    /// Canonical names from the top-level command down to `id` (empty for the root).
    pub fn canonical_path(&self, id: NodeId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            if node.parent.is_none() {
                break;
            }
            names.push(node.name.as_str());
            cursor = node.parent;
        }
        names.reverse();
        names
    }

    fn display_path(&self, id: NodeId) -> String {
        self.canonical_path(id).join(" ")
    }

    /// Resolve typed command words, one scope per level.
    ///
    /// Descent stops when the current node has no subcommands; remaining words are
    /// returned as `unused`. A command with its own implementation also stops at a word
    /// that matches none of its subcommands at all. A word that is ambiguous or looks
    /// like a misspelled subcommand is an error at every level, as is any unmatched word
    /// after a grouping-only command.
    pub fn find_command_node<S: AsRef<str>>(&self, parts: &[S]) -> Result<Resolved, ResolveError> {
        if parts.is_empty() {
            return Err(ResolveError::MissingCommand);
        }

        let mut current = ROOT;
        let mut consumed = 0usize;
        for part in parts {
            let node = self.node(current);
            if current != ROOT && !node.has_children() {
                break;
            }

            let id = match node.scope.lookup(part.as_ref()) {
                Lookup::Found(id) => id,
                Lookup::NotSupported if current != ROOT && node.implementation.is_some() => {
                    break;
                }
                Lookup::NotUnique => {
                    return Err(ResolveError::NotUnique(typed_path(parts, consumed)));
                }
                Lookup::NotSupported => {
                    return Err(ResolveError::NotSupported(typed_path(parts, consumed)));
                }
                Lookup::Misspelled(id) => {
                    return Err(ResolveError::Misspelled {
                        typed: typed_path(parts, consumed),
                        suggestion: self.display_path(id),
                    });
                }
            };
            current = id;
            consumed += 1;
        }

        let unused = parts[consumed..]
            .iter()
            .map(|p| p.as_ref().to_string())
            .collect();
        tracing::debug!(
            command = self.display_path(current).as_str(),
            consumed,
            "resolved command"
        );
        Ok(Resolved {
            node: current,
            consumed,
            unused,
        })
    }

    /// Resolve like [`find_command_node`](Self::find_command_node) and describe the
    /// implementation to load.
    pub fn find_command_module<S: AsRef<str>>(
        &self,
        parts: &[S],
    ) -> Result<CommandModule, ResolveError> {
        let resolved = self.find_command_node(parts)?;
        self.command_module(resolved)
    }

    /// Describe the implementation behind an already resolved node.
    pub fn command_module(&self, resolved: Resolved) -> Result<CommandModule, ResolveError> {
        let node = self.node(resolved.node);
        let Some(implementation) = node.implementation.clone() else {
            return Err(ResolveError::MissingSubcommand {
                path: self.display_path(resolved.node),
                available: self
                    .children_names(resolved.node)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            });
        };
        Ok(CommandModule {
            implementation,
            class_name: node.class_name.clone(),
            canonical_path: self
                .canonical_path(resolved.node)
                .into_iter()
                .map(str::to_string)
                .collect(),
            unused: resolved.unused,
            depth: node.depth,
        })
    }
}

/// The words as typed, up to and including the one at `last`.
fn typed_path<S: AsRef<str>>(parts: &[S], last: usize) -> String {
    parts[..=last]
        .iter()
        .map(|p| p.as_ref().trim())
        .collect::<Vec<_>>()
        .join(" ")
}
