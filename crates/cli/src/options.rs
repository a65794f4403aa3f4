//! Declarative option specs turned into parser definitions over [`OptionValues`].

use std::collections::HashSet;

use cmdtree_argparse::{OptionDefinition, OptionGroup};
use cmdtree_metadata::{OptionGroupSpec, OptionSpec};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    One(String),
    Many(Vec<String>),
}

/// Parsed option values keyed by [`OptionSpec::key`].
///
/// Defaults installed by `init` are replaced, not appended to, by the first explicit value.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct OptionValues {
    values: IndexMap<String, OptionValue>,
    #[serde(skip)]
    explicit: HashSet<String>,
}

impl OptionValues {
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            OptionValue::One(v) => Some(v.as_str()),
            OptionValue::Many(v) => v.last().map(|s| s.as_str()),
            OptionValue::Flag(_) => None,
        }
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        match self.values.get(key) {
            Some(OptionValue::One(v)) => vec![v.as_str()],
            Some(OptionValue::Many(v)) => v.iter().map(|s| s.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_set(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(OptionValue::Flag(true)))
    }

    /// Whether the value came from argv rather than a default.
    pub fn is_explicit(&self, key: &str) -> bool {
        self.explicit.contains(key)
    }

    pub fn as_map(&self) -> &IndexMap<String, OptionValue> {
        &self.values
    }

    fn reset(&mut self, key: &str, default: Option<&str>, multiple: bool) {
        self.explicit.remove(key);
        match default {
            Some(d) if multiple => {
                self.values
                    .insert(key.to_string(), OptionValue::Many(vec![d.to_string()]));
            }
            Some(d) => {
                self.values
                    .insert(key.to_string(), OptionValue::One(d.to_string()));
            }
            None => {
                self.values.shift_remove(key);
            }
        }
    }

    fn set_flag(&mut self, key: &str) {
        self.explicit.insert(key.to_string());
        self.values.insert(key.to_string(), OptionValue::Flag(true));
    }

    fn record(&mut self, key: &str, value: &str, multiple: bool) {
        let first = self.explicit.insert(key.to_string());
        if !multiple {
            self.values
                .insert(key.to_string(), OptionValue::One(value.to_string()));
            return;
        }
        match self.values.get_mut(key) {
            Some(OptionValue::Many(values)) if !first => values.push(value.to_string()),
            _ => {
                self.values
                    .insert(key.to_string(), OptionValue::Many(vec![value.to_string()]));
            }
        }
    }
}

pub fn definition_from_spec(spec: &OptionSpec) -> OptionDefinition<OptionValues> {
    let key = spec.key();
    let multiple = spec.multiple;

    let mut def = if spec.has_value {
        let key = key.clone();
        OptionDefinition::value(spec.aliases.clone(), move |values: &mut OptionValues, v| {
            values.record(&key, v, multiple)
        })
    } else {
        let key = key.clone();
        OptionDefinition::flag(spec.aliases.clone(), move |values: &mut OptionValues| {
            values.set_flag(&key)
        })
    };

    let default = spec.default_value.clone();
    def = def
        .init(move |values| values.reset(&key, default.as_deref(), multiple))
        .help(spec.description.clone());
    if let Some(name) = &spec.value_name {
        def = def.value_name(name.clone());
    }
    if let Some(allowed) = &spec.allowed_values {
        def = def.allowed_values(allowed.iter().cloned());
    }
    if spec.mandatory {
        def = def.mandatory();
    }
    if spec.multiple {
        def = def.multiple();
    }
    if spec.early {
        def = def.early();
    }
    def
}

/// `common` forces a common group even when `OptionGroupSpec::common` is false.
pub fn group_from_spec(spec: &OptionGroupSpec, common: bool) -> OptionGroup<OptionValues> {
    let mut group = OptionGroup::new(spec.title.clone());
    if common || spec.common {
        group = group.common();
    }
    for option in &spec.options {
        group.push(definition_from_spec(option));
    }
    group
}
