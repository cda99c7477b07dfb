use super::{Field, FieldBase, FieldBuilder, unset};
use crate::builder::{Mount, build};
use crate::descriptor::FieldDescriptor;
use crate::Result;

/// Static paragraph text.
#[derive(Debug)]
pub struct TextField {
    base: FieldBase,
}

impl TextField {
    pub fn build(cx: &mut FieldBuilder<'_>, descriptor: &FieldDescriptor) -> Result<Box<dyn Field>> {
        let built = build(cx.doc, unset(&descriptor.text), Mount::Tag("p"))?;
        cx.mount(built.root)?;
        let mut base = FieldBase::new(descriptor, built.root);
        base.parts = built.children;
        Ok(Box::new(Self { base }))
    }
}

impl Field for TextField {
    fn base(&self) -> &FieldBase {
        &self.base
    }
}
