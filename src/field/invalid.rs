use super::{Field, FieldBase, FieldBuilder};
use crate::builder::{Mount, build};
use crate::descriptor::FieldDescriptor;
use crate::Result;

/// Placeholder for descriptors whose type tag has no factory.
#[derive(Debug)]
pub struct InvalidField {
    base: FieldBase,
}

impl InvalidField {
    pub fn build(cx: &mut FieldBuilder<'_>, descriptor: &FieldDescriptor) -> Result<Box<dyn Field>> {
        // Set as text, so a tag that is itself broken markup still renders.
        let built = build(cx.doc, "", Mount::Tag("p"))?;
        cx.doc.dom.set_text_content(
            built.root,
            &format!("Invalid form type :({})", descriptor.kind),
        )?;
        cx.mount(built.root)?;
        Ok(Box::new(Self {
            base: FieldBase::new(descriptor, built.root),
        }))
    }
}

impl Field for InvalidField {
    fn base(&self) -> &FieldBase {
        &self.base
    }
}
