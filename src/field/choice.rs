use super::{Field, FieldBase, FieldBuilder, FieldContext, FieldValue, slot, unset};
use crate::builder::{Mount, build, set_attributes};
use crate::descriptor::{FieldDescriptor, NavAction};
use crate::document::Document;
use crate::dom::NodeId;
use crate::events::{EventState, EventType, FieldHook};
use crate::validate::{ValidationTarget, Validators};
use crate::{Error, Result};

/// One rendered option per descriptor entry: the row `div`, the control in
/// it, and the label text.
#[derive(Debug, Clone, Default)]
pub(crate) struct OptionGroup {
    pub(crate) name: String,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) rows: Vec<NodeId>,
    pub(crate) labels: Vec<String>,
}

impl OptionGroup {
    /// Renders `descriptor.options` into `parent` as `input_type` controls
    /// sharing one group name, wiring input and keydown per option.
    pub(crate) fn render(
        cx: &mut FieldBuilder<'_>,
        base: &mut FieldBase,
        parent: NodeId,
        descriptor: &FieldDescriptor,
        input_type: &str,
    ) -> Result<Self> {
        let name = cx.group_name(descriptor);
        let mut group = Self {
            name,
            ..Self::default()
        };
        for (index, option) in descriptor.options.iter().enumerate() {
            let option_id = format!("{}_{index}", group.name);
            let built = build(cx.doc, "<input/><label></label>", Mount::Default)?;
            let input = slot(cx.doc, built.root, 0)?;
            let label = slot(cx.doc, built.root, 1)?;
            let value = index.to_string();
            set_attributes(
                cx.doc,
                input,
                &[
                    ("id", option_id.as_str()),
                    ("type", input_type),
                    ("name", group.name.as_str()),
                    ("value", value.as_str()),
                ],
            )?;
            cx.doc.set_value(input, &value)?;
            set_attributes(cx.doc, label, &[("for", option_id.as_str())])?;
            build(cx.doc, option, Mount::Existing(label))?;
            cx.listen(input, EventType::Input, FieldHook::Input(index));
            cx.listen(input, EventType::Keydown, FieldHook::Keydown(index));
            cx.doc.append_child(parent, built.root)?;

            base.parts.insert(option_id, input);
            group.inputs.push(input);
            group.rows.push(built.root);
            group.labels.push(option.clone());
        }
        Ok(group)
    }

    pub(crate) fn checked_flags(&self, doc: &Document) -> Result<Vec<bool>> {
        self.inputs.iter().map(|input| doc.checked(*input)).collect()
    }

    pub(crate) fn checked_indices(&self, doc: &Document) -> Result<Vec<usize>> {
        Ok(self
            .checked_flags(doc)?
            .into_iter()
            .enumerate()
            .filter_map(|(index, checked)| checked.then_some(index))
            .collect())
    }
}

/// Radio group or multi-select group. Both render a description, an error
/// slot and one control per option; they differ only in control type.
#[derive(Debug)]
pub struct ChoiceField {
    base: FieldBase,
    group: OptionGroup,
    multiple: bool,
}

impl ChoiceField {
    pub fn build_radio(cx: &mut FieldBuilder<'_>, descriptor: &FieldDescriptor) -> Result<Box<dyn Field>> {
        Ok(Box::new(Self::render(cx, descriptor, false)?))
    }

    pub fn build_multiselect(cx: &mut FieldBuilder<'_>, descriptor: &FieldDescriptor) -> Result<Box<dyn Field>> {
        Ok(Box::new(Self::render(cx, descriptor, true)?))
    }

    fn render(cx: &mut FieldBuilder<'_>, descriptor: &FieldDescriptor, multiple: bool) -> Result<Self> {
        let built = build(
            cx.doc,
            r#"<p></p><span id="error" class="error"></span><div id="options"></div>"#,
            Mount::Tag("div"),
        )?;
        let text = slot(cx.doc, built.root, 0)?;
        build(cx.doc, unset(&descriptor.description), Mount::Existing(text))?;
        cx.mount(built.root)?;
        let options = built
            .child("options")
            .ok_or_else(|| Error::Dom("option group markup lost its container".into()))?;

        let mut base = FieldBase::new(descriptor, built.root);
        base.parts = built.children;
        let input_type = if multiple { "checkbox" } else { "radio" };
        let group = OptionGroup::render(cx, &mut base, options, descriptor, input_type)?;
        Ok(Self {
            base,
            group,
            multiple,
        })
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn group_name(&self) -> &str {
        &self.group.name
    }

    pub fn options(&self) -> &[NodeId] {
        &self.group.inputs
    }

    fn target<'a>(&'a self, checked: &'a [bool]) -> ValidationTarget<'a> {
        ValidationTarget {
            kind: &self.base.descriptor.kind,
            name: self.base.descriptor.name_or_empty(),
            value: "",
            checked,
            required: self.base.descriptor.required,
        }
    }
}

impl Field for ChoiceField {
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
                let checked = self.group.checked_flags(cx.doc)?;
                cx.validate_and_mark(&self.target(&checked), self.base.root)?;
                Ok(None)
            }
            FieldHook::FocusGained | FieldHook::FocusLost | FieldHook::Search => Ok(None),
        }
    }

    fn value(&self, doc: &Document) -> Result<FieldValue> {
        Ok(FieldValue::Choices(self.group.checked_indices(doc)?))
    }

    fn is_valid(&self, doc: &Document, validators: &Validators) -> Result<bool> {
        let checked = self.group.checked_flags(doc)?;
        Ok(validators.validate(&self.target(&checked)))
    }
}
