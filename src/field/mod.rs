//! The field family: one trait, a registry of factories, and the built-in
//! variants.

use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use rand::rngs::StdRng;

use crate::config::FormConfig;
use crate::descriptor::{FieldDescriptor, NavAction};
use crate::document::Document;
use crate::dom::NodeId;
use crate::events::{EventState, EventType, FieldHook, Handler};
use crate::page::{EnterCallback, handle_ctrl_enter};
use crate::scheduler::TimerTask;
use crate::trace::TraceCategory;
use crate::validate::{ValidationTarget, Validators};
use crate::{Error, Result};

mod choice;
mod combo;
mod input;
mod invalid;
mod registry;
mod text;

pub use choice::ChoiceField;
pub use combo::ComboField;
pub use input::InputField;
pub use invalid::InvalidField;
pub use registry::{FieldFactory, FieldKind, FieldRegistry};
pub use text::TextField;

/// What a field currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    None,
    Text(String),
    /// Indices of the checked options.
    Choices(Vec<usize>),
}

/// State every field variant carries: its descriptor, mounted root and the
/// sub-elements it addresses by logical id.
#[derive(Debug, Clone)]
pub struct FieldBase {
    pub descriptor: FieldDescriptor,
    pub root: NodeId,
    pub parts: HashMap<String, NodeId>,
}

impl FieldBase {
    pub fn new(descriptor: &FieldDescriptor, root: NodeId) -> Self {
        Self {
            descriptor: descriptor.clone(),
            root,
            parts: HashMap::new(),
        }
    }
}

pub trait Field: fmt::Debug {
    fn base(&self) -> &FieldBase;

    fn kind(&self) -> &str {
        &self.base().descriptor.kind
    }

    fn root(&self) -> NodeId {
        self.base().root
    }

    fn part(&self, id: &str) -> Option<NodeId> {
        self.base().parts.get(id).copied()
    }

    /// Reacts to one of the listeners the field registered. A returned
    /// action is carried out by the owning form.
    fn handle(
        &mut self,
        _cx: &mut FieldContext<'_>,
        _hook: FieldHook,
        _event: &mut EventState,
    ) -> Result<Option<NavAction>> {
        Ok(None)
    }

    fn on_timer(&mut self, _cx: &mut FieldContext<'_>, _task: TimerTask) -> Result<()> {
        Ok(())
    }

    fn value(&self, _doc: &Document) -> Result<FieldValue> {
        Ok(FieldValue::None)
    }

    /// Runs the validators without touching error display.
    fn is_valid(&self, _doc: &Document, _validators: &Validators) -> Result<bool> {
        Ok(true)
    }
}

/// Construction-time access for field factories.
pub struct FieldBuilder<'a> {
    pub doc: &'a mut Document,
    pub config: &'a FormConfig,
    pub(crate) rng: &'a mut StdRng,
    pub(crate) page: usize,
    pub(crate) field: usize,
    pub(crate) page_root: NodeId,
}

impl FieldBuilder<'_> {
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn field(&self) -> usize {
        self.field
    }

    /// Appends a field root to the owning page.
    pub fn mount(&mut self, root: NodeId) -> Result<()> {
        self.doc.append_child(self.page_root, root)
    }

    pub fn listen(&mut self, node: NodeId, event: EventType, hook: FieldHook) {
        let handler = Handler::Field {
            page: self.page,
            field: self.field,
            hook,
        };
        self.doc.listen(node, event, handler);
    }

    /// The descriptor's group name, or a random `0..=1000` suffix when none
    /// is given. Not guaranteed unique.
    pub fn group_name(&mut self, descriptor: &FieldDescriptor) -> String {
        match descriptor.name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => self.rng.gen_range(0..=1000u32).to_string(),
        }
    }
}

/// Event-time access for field handlers.
pub struct FieldContext<'a> {
    pub doc: &'a mut Document,
    pub config: &'a FormConfig,
    pub validators: &'a Validators,
    pub(crate) page: usize,
    pub(crate) field: usize,
}

impl FieldContext<'_> {
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn field(&self) -> usize {
        self.field
    }

    /// The page keyboard shortcut handler, applied to an event a field
    /// received.
    pub fn ctrl_enter(
        &mut self,
        event: &mut EventState,
        custom: Option<EnterCallback<'_>>,
    ) -> Result<Option<NavAction>> {
        handle_ctrl_enter(self.doc, self.config, event, custom)
    }

    pub fn schedule_menu_check(&mut self) -> i64 {
        let task = TimerTask::MenuCloseCheck {
            page: self.page,
            field: self.field,
        };
        self.doc.set_timeout(self.config.menu_close_delay_ms, task)
    }

    /// Validates `target` and mirrors the outcome as the error class on
    /// `marker`.
    pub fn validate_and_mark(&mut self, target: &ValidationTarget<'_>, marker: NodeId) -> Result<bool> {
        let valid = self.validators.validate(target);
        self.doc
            .set_class(marker, &self.config.error_class, !valid)?;
        self.doc.trace_line(
            TraceCategory::Validation,
            format!(
                "[validate] page={} field={} kind={} name={} valid={}",
                self.page, self.field, target.kind, target.name, valid
            ),
        );
        Ok(valid)
    }
}

pub(crate) fn unset(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

/// The `index`-th element child of a template root. Descriptor text is only
/// ever mounted inside these slots, so the template's own shape is fixed.
pub(crate) fn slot(doc: &Document, root: NodeId, index: usize) -> Result<NodeId> {
    doc.dom
        .element_children(root)
        .get(index)
        .copied()
        .ok_or_else(|| Error::Dom(format!("template lost element {index}")))
}
