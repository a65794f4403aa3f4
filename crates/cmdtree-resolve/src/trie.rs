//! Per-character index over the names and aliases of one command scope.

use std::collections::BTreeMap;

use crate::{NodeId, normalize};

const ROOT: CharId = CharId(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CharId(usize);

/// Which commands can still be reached below a character node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Nobody,
    One(NodeId),
    Many,
}

impl Owner {
    fn add(self, command: NodeId) -> Self {
        match self {
            Owner::Nobody => Owner::One(command),
            Owner::One(existing) if existing == command => self,
            _ => Owner::Many,
        }
    }
}

#[derive(Debug, Clone)]
struct CharNode {
    ch: char,
    parent: Option<CharId>,
    children: BTreeMap<char, CharId>,
    owner: Owner,
    /// Set where a registered name or alias ends.
    terminal: Option<NodeId>,
}

impl CharNode {
    fn new(ch: char, parent: Option<CharId>) -> Self {
        Self {
            ch,
            parent,
            children: BTreeMap::new(),
            owner: Owner::Nobody,
            terminal: None,
        }
    }

    /// The command this node identifies on its own, if any.
    fn command(&self) -> Option<NodeId> {
        match (self.terminal, self.owner) {
            (Some(id), _) | (None, Owner::One(id)) => Some(id),
            _ => None,
        }
    }
}

/// Result of looking up one typed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Exact name/alias, or an abbreviation reaching exactly one command.
    Found(NodeId),
    /// A prefix shared by two or more commands.
    NotUnique,
    /// Nothing registered starts like this.
    NotSupported,
    /// The token started to spell exactly one command and then diverged.
    Misspelled(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    #[error("empty name")]
    Empty,
    #[error("name contains whitespace")]
    Whitespace,
    #[error("name already registered")]
    Duplicate(NodeId),
}

#[derive(Debug, Clone)]
pub struct CharacterTrie {
    nodes: Vec<CharNode>,
}

impl Default for CharacterTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![CharNode::new('\0', None)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT.0].children.is_empty()
    }

    /// Register `name` (after normalization) as a spelling of `command`.
    pub fn insert(&mut self, name: &str, command: NodeId) -> Result<(), InsertError> {
        let name = normalize(name);
        if name.is_empty() {
            return Err(InsertError::Empty);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(InsertError::Whitespace);
        }

        let mut path = Vec::with_capacity(name.len());
        let mut current = ROOT;
        for ch in name.chars() {
            current = match self.nodes[current.0].children.get(&ch) {
                Some(&next) => next,
                None => {
                    let next = CharId(self.nodes.len());
                    self.nodes.push(CharNode::new(ch, Some(current)));
                    self.nodes[current.0].children.insert(ch, next);
                    next
                }
            };
            path.push(current);
        }

        if let Some(existing) = self.nodes[current.0].terminal {
            return Err(InsertError::Duplicate(existing));
        }
        self.nodes[current.0].terminal = Some(command);
        for id in path {
            let node = &mut self.nodes[id.0];
            node.owner = node.owner.add(command);
        }
        Ok(())
    }

    /// Resolve a typed token (normalized first) to one command.
    pub fn lookup(&self, token: &str) -> Lookup {
        let token = normalize(token);
        if token.is_empty() {
            return Lookup::NotSupported;
        }

        let mut current = ROOT;
        for ch in token.chars() {
            match self.nodes[current.0].children.get(&ch) {
                Some(&next) => current = next,
                None => {
                    let node = &self.nodes[current.0];
                    return match node.owner {
                        Owner::One(id) if current != ROOT => {
                            let matched = self.prefix(current);
                            tracing::trace!(
                                token = token.as_str(),
                                matched = matched.as_str(),
                                "token diverges after a unique prefix"
                            );
                            Lookup::Misspelled(id)
                        }
                        _ => Lookup::NotSupported,
                    };
                }
            }
        }

        match self.nodes[current.0].command() {
            Some(id) => Lookup::Found(id),
            None => Lookup::NotUnique,
        }
    }

    /// The characters from the root down to `id`.
    fn prefix(&self, id: CharId) -> String {
        let mut chars = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ROOT {
                break;
            }
            let node = &self.nodes[current.0];
            chars.push(node.ch);
            cursor = node.parent;
        }
        chars.iter().rev().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: NodeId = NodeId(1);
    const COPY: NodeId = NodeId(2);
    const COPA: NodeId = NodeId(3);

    fn config_copy_copa() -> CharacterTrie {
        let mut trie = CharacterTrie::new();
        for name in ["config", "conf", "cong", "co"] {
            trie.insert(name, CONFIG).unwrap();
        }
        trie.insert("copy", COPY).unwrap();
        trie.insert("copa", COPA).unwrap();
        trie
    }

    #[test]
    fn exact_names_and_aliases_resolve() {
        let trie = config_copy_copa();
        for token in ["config", "conf", "cong", "co"] {
            assert_eq!(trie.lookup(token), Lookup::Found(CONFIG), "{token}");
        }
        assert_eq!(trie.lookup("copy"), Lookup::Found(COPY));
        assert_eq!(trie.lookup("copa"), Lookup::Found(COPA));
    }

    #[test]
    fn abbreviations_resolve_when_unique() {
        let trie = config_copy_copa();
        assert_eq!(trie.lookup("confi"), Lookup::Found(CONFIG));
        assert_eq!(trie.lookup("con"), Lookup::Found(CONFIG));
    }

    #[test]
    fn shared_prefixes_are_not_unique() {
        let trie = config_copy_copa();
        assert_eq!(trie.lookup("c"), Lookup::NotUnique);
        assert_eq!(trie.lookup("cop"), Lookup::NotUnique);
    }

    #[test]
    fn divergence_after_unique_prefix_is_misspelled() {
        let trie = config_copy_copa();
        assert_eq!(trie.lookup("copyy"), Lookup::Misspelled(COPY));
        assert_eq!(trie.lookup("conff"), Lookup::Misspelled(CONFIG));
    }

    #[test]
    fn divergence_in_ambiguous_prefix_is_not_supported() {
        let trie = config_copy_copa();
        assert_eq!(trie.lookup("ca"), Lookup::NotSupported);
        assert_eq!(trie.lookup("copb"), Lookup::NotSupported);
        assert_eq!(trie.lookup("xyz"), Lookup::NotSupported);
    }

    #[test]
    fn empty_token_is_not_supported() {
        let trie = config_copy_copa();
        assert_eq!(trie.lookup(""), Lookup::NotSupported);
        assert_eq!(trie.lookup("   "), Lookup::NotSupported);
        assert_eq!(CharacterTrie::new().lookup(""), Lookup::NotSupported);
    }

    #[test]
    fn lookup_is_case_and_padding_insensitive() {
        let trie = config_copy_copa();
        assert_eq!(trie.lookup(" CoPy "), Lookup::Found(COPY));
    }

    #[test]
    fn single_command_scope_never_matches_unrelated_text() {
        let mut trie = CharacterTrie::new();
        trie.insert("build", NodeId(1)).unwrap();
        assert_eq!(trie.lookup("x"), Lookup::NotSupported);
        assert_eq!(trie.lookup("b"), Lookup::Found(NodeId(1)));
        assert_eq!(trie.lookup("bx"), Lookup::Misspelled(NodeId(1)));
    }

    #[test]
    fn alias_mixing() {
        let build = NodeId(1);
        let conf = NodeId(2);
        let mut trie = CharacterTrie::new();
        for name in ["build", "b", "bild"] {
            trie.insert(name, build).unwrap();
        }
        trie.insert("conf", conf).unwrap();

        assert_eq!(trie.lookup("b"), Lookup::Found(build));
        assert_eq!(trie.lookup("bi"), Lookup::Found(build));
        assert_eq!(trie.lookup("bild"), Lookup::Found(build));
        assert_eq!(trie.lookup("bildu"), Lookup::Misspelled(build));
        assert_eq!(trie.lookup("conf"), Lookup::Found(conf));
    }

    #[test]
    fn exact_match_wins_over_longer_names() {
        let short = NodeId(1);
        let long = NodeId(2);
        let mut trie = CharacterTrie::new();
        trie.insert("co", short).unwrap();
        trie.insert("copy", long).unwrap();
        assert_eq!(trie.lookup("co"), Lookup::Found(short));
        assert_eq!(trie.lookup("cop"), Lookup::Found(long));
    }

    #[test]
    fn insert_rejects_bad_names() {
        let mut trie = config_copy_copa();
        assert_eq!(trie.insert("", COPY), Err(InsertError::Empty));
        assert_eq!(trie.insert("co py", COPY), Err(InsertError::Whitespace));
        assert_eq!(trie.insert("CONF", COPY), Err(InsertError::Duplicate(CONFIG)));
        // A prefix of an existing name is not a duplicate.
        trie.insert("cop", NodeId(9)).unwrap();
        assert_eq!(trie.lookup("cop"), Lookup::Found(NodeId(9)));
    }

    #[test]
    fn prefix_walks_back_to_root() {
        let trie = config_copy_copa();
        let mut current = ROOT;
        for ch in "conf".chars() {
            current = trie.nodes[current.0].children[&ch];
        }
        assert_eq!(trie.prefix(current), "conf");
        assert_eq!(trie.prefix(ROOT), "");
    }
}
