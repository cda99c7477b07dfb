use super::{Field, FieldBase, FieldBuilder, FieldContext, FieldValue, slot, unset};
use crate::builder::{Mount, build, set_attributes};
use crate::descriptor::{FieldDescriptor, NavAction};
use crate::document::Document;
use crate::dom::NodeId;
use crate::events::{EventState, EventType, FieldHook};
use crate::validate::{ValidationTarget, Validators};
use crate::{Error, Result};

/// Labelled single-line text input with an error slot.
#[derive(Debug)]
pub struct InputField {
    base: FieldBase,
    control: NodeId,
}

impl InputField {
    pub fn build(cx: &mut FieldBuilder<'_>, descriptor: &FieldDescriptor) -> Result<Box<dyn Field>> {
        let built = build(
            cx.doc,
            r#"<label></label><input id="field" class="input"/><span id="error"></span>"#,
            Mount::Tag("div"),
        )?;
        set_attributes(cx.doc, built.root, &[("class", "input-box")])?;
        let control = built
            .child("field")
            .ok_or_else(|| Error::Dom("input field markup lost its control".into()))?;
        let label = slot(cx.doc, built.root, 0)?;
        build(cx.doc, unset(&descriptor.label), Mount::Existing(label))?;

        let value = unset(&descriptor.value);
        set_attributes(
            cx.doc,
            control,
            &[("value", value), ("placeholder", unset(&descriptor.placeholder))],
        )?;
        cx.doc.set_value(control, value)?;

        let name = descriptor.name_or_empty();
        if !name.is_empty() {
            set_attributes(cx.doc, control, &[("id", name), ("name", name)])?;
        }

        cx.mount(built.root)?;
        cx.listen(control, EventType::Keydown, FieldHook::Keydown(0));
        cx.listen(control, EventType::Input, FieldHook::Input(0));

        let mut base = FieldBase::new(descriptor, built.root);
        base.parts = built.children;
        Ok(Box::new(Self { base, control }))
    }

    pub fn control(&self) -> NodeId {
        self.control
    }

    fn target<'a>(&'a self, value: &'a str) -> ValidationTarget<'a> {
        ValidationTarget {
            kind: &self.base.descriptor.kind,
            name: self.base.descriptor.name_or_empty(),
            value,
            checked: &[],
            required: self.base.descriptor.required,
        }
    }
}

impl Field for InputField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn handle(
        &mut self,
        cx: &mut FieldContext<'_>,
        hook: FieldHook,
        event: &mut EventState,
    ) -> Result<Option<NavAction>> {
        match hook {
            FieldHook::Keydown(_) => cx.ctrl_enter(event, None),
            FieldHook::Input(_) => {
                let value = cx.doc.value(self.control)?;
                cx.validate_and_mark(&self.target(&value), self.control)?;
                event.prevent_default();
                Ok(None)
            }
            FieldHook::FocusGained | FieldHook::FocusLost | FieldHook::Search => Ok(None),
        }
    }

    fn value(&self, doc: &Document) -> Result<FieldValue> {
        Ok(FieldValue::Text(doc.value(self.control)?))
    }

    fn is_valid(&self, doc: &Document, validators: &Validators) -> Result<bool> {
        let value = doc.value(self.control)?;
        Ok(validators.validate(&self.target(&value)))
    }
}
