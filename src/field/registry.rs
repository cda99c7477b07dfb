use std::collections::HashMap;

use super::{ChoiceField, ComboField, Field, FieldBuilder, InputField, InvalidField, TextField};
use crate::descriptor::FieldDescriptor;
use crate::Result;

pub type FieldFactory = fn(&mut FieldBuilder<'_>, &FieldDescriptor) -> Result<Box<dyn Field>>;

/// Built-in field type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Input,
    Radio,
    MultiSelect,
    ComboBox,
}

impl FieldKind {
    pub const ALL: [FieldKind; 5] = [
        FieldKind::Text,
        FieldKind::Input,
        FieldKind::Radio,
        FieldKind::MultiSelect,
        FieldKind::ComboBox,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Input => "input",
            Self::Radio => "radio",
            Self::MultiSelect => "multiselect",
            Self::ComboBox => "combobox",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    fn factory(self) -> FieldFactory {
        match self {
            Self::Text => TextField::build,
            Self::Input => InputField::build,
            Self::Radio => ChoiceField::build_radio,
            Self::MultiSelect => ChoiceField::build_multiselect,
            Self::ComboBox => ComboField::build,
        }
    }
}

/// Maps a descriptor's `type` tag to the factory that builds it. Tags with
/// no entry go to the fallback, which must not fail for malformed input.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    factories: HashMap<String, FieldFactory>,
    fallback: FieldFactory,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        let factories = FieldKind::ALL
            .into_iter()
            .map(|kind| (kind.tag().to_string(), kind.factory()))
            .collect();
        Self {
            factories,
            fallback: InvalidField::build,
        }
    }
}

impl FieldRegistry {
    /// A registry with no entries; every tag renders the fallback.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
            fallback: InvalidField::build,
        }
    }

    pub fn register(mut self, tag: impl Into<String>, factory: FieldFactory) -> Self {
        self.factories.insert(tag.into(), factory);
        self
    }

    pub fn with_fallback(mut self, fallback: FieldFactory) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    pub fn create(&self, cx: &mut FieldBuilder<'_>, descriptor: &FieldDescriptor) -> Result<Box<dyn Field>> {
        match self.factories.get(&descriptor.kind) {
            Some(factory) => factory(cx, descriptor),
            None => {
                log::warn!(
                    target: "stepform",
                    "unrecognized field type {:?} on page {}, rendering placeholder",
                    descriptor.kind,
                    cx.page
                );
                (self.fallback)(cx, descriptor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_tag_round_trips() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(FieldKind::from_tag("bogus"), None);
    }

    #[test]
    fn default_registry_knows_builtins_only() {
        let registry = FieldRegistry::default();
        assert!(registry.contains("combobox"));
        assert!(!registry.contains("bogus"));
        assert!(!FieldRegistry::empty().contains("text"));
        assert!(FieldRegistry::empty().register("text", TextField::build).contains("text"));
    }
}
