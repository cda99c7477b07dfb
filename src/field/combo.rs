use std::borrow::Cow;

use fancy_regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::choice::OptionGroup;
use super::{Field, FieldBase, FieldBuilder, FieldContext, FieldValue, slot, unset};
use crate::builder::{Mount, build, set_attributes};
use crate::descriptor::{FieldDescriptor, NavAction};
use crate::document::Document;
use crate::dom::NodeId;
use crate::events::{EventState, EventType, FieldHook};
use crate::scheduler::TimerTask;
use crate::validate::{ValidationTarget, Validators};
use crate::{Error, Result};

/// Searchable single-select: a text box that filters a dropdown of radio
/// options.
///
/// `focus` is true while the search box, the menu or any option holds focus.
/// Losing focus schedules a check that closes the menu only if focus has not
/// come back by the time it fires; nothing cancels that check.
#[derive(Debug)]
pub struct ComboField {
    base: FieldBase,
    search: NodeId,
    menu: NodeId,
    group: OptionGroup,
    focus: bool,
}

impl ComboField {
    pub fn build(cx: &mut FieldBuilder<'_>, descriptor: &FieldDescriptor) -> Result<Box<dyn Field>> {
        let searchbox = build(
            cx.doc,
            r#"<input id="search" type="text"/><span id="search_button"></span>"#,
            Mount::Tag("div"),
        )?;
        set_attributes(cx.doc, searchbox.root, &[("class", "combo-search")])?;
        let search = searchbox
            .child("search")
            .ok_or_else(|| Error::Dom("combo markup lost its search box".into()))?;
        set_attributes(cx.doc, search, &[("placeholder", unset(&descriptor.placeholder))])?;
        let button = slot(cx.doc, searchbox.root, 1)?;
        build(cx.doc, unset(&descriptor.search), Mount::Existing(button))?;

        let body = build(
            cx.doc,
            r#"<p></p><span id="error" class="error"></span>"#,
            Mount::Tag("div"),
        )?;
        set_attributes(cx.doc, body.root, &[("class", "combo")])?;
        let text = slot(cx.doc, body.root, 0)?;
        build(
            cx.doc,
            &format!("{}:", unset(&descriptor.description)),
            Mount::Existing(text),
        )?;

        let menu = build(cx.doc, "", Mount::Tag("div"))?.root;
        let menu_class = format!("combo-menu {}", cx.config.hidden_class);
        set_attributes(cx.doc, menu, &[("class", &menu_class)])?;

        cx.doc.append_child(body.root, searchbox.root)?;
        cx.doc.append_child(body.root, menu)?;
        cx.mount(body.root)?;

        for node in [menu, search] {
            cx.listen(node, EventType::Focus, FieldHook::FocusGained);
            cx.listen(node, EventType::Blur, FieldHook::FocusLost);
        }
        cx.listen(search, EventType::Input, FieldHook::Search);

        let mut base = FieldBase::new(descriptor, body.root);
        base.parts = body.children;
        base.parts.extend(searchbox.children);
        base.parts.insert("menu".into(), menu);

        let group = OptionGroup::render(cx, &mut base, menu, descriptor, "radio")?;
        for input in &group.inputs {
            cx.listen(*input, EventType::Focus, FieldHook::FocusGained);
            cx.listen(*input, EventType::Blur, FieldHook::FocusLost);
        }

        Ok(Box::new(Self {
            base,
            search,
            menu,
            group,
            focus: false,
        }))
    }

    pub fn search_box(&self) -> NodeId {
        self.search
    }

    pub fn menu(&self) -> NodeId {
        self.menu
    }

    pub fn option_rows(&self) -> &[NodeId] {
        &self.group.rows
    }

    pub fn has_focus(&self) -> bool {
        self.focus
    }

    fn gain_focus(&mut self, cx: &mut FieldContext<'_>) -> Result<()> {
        self.focus = true;
        cx.doc.remove_class(self.menu, &cx.config.hidden_class)
    }

    fn lose_focus(&mut self, cx: &mut FieldContext<'_>) {
        self.focus = false;
        cx.schedule_menu_check();
    }

    /// Closes the menu and drops every trace of filtering.
    fn hide_menu(&self, cx: &mut FieldContext<'_>) -> Result<()> {
        let hidden = &cx.config.hidden_class;
        cx.doc.add_class(self.menu, hidden)?;
        for (row, input) in self.group.rows.iter().zip(&self.group.inputs) {
            cx.doc.remove_class(*row, hidden)?;
            cx.doc.remove_attr(*row, "disabled")?;
            cx.doc.remove_attr(*input, "tabindex")?;
        }
        Ok(())
    }

    fn handle_search(&self, cx: &mut FieldContext<'_>) -> Result<()> {
        let term = cx.doc.value(self.search)?;
        let pattern = search_pattern(&term)?;
        let hidden = &cx.config.hidden_class;
        for (index, label) in self.group.labels.iter().enumerate() {
            let (row, input) = (self.group.rows[index], self.group.inputs[index]);
            if label_matches(&pattern, label)? {
                cx.doc.remove_class(row, hidden)?;
                cx.doc.remove_attr(input, "tabindex")?;
            } else {
                cx.doc.add_class(row, hidden)?;
                cx.doc.set_attr(input, "tabindex", "-1")?;
            }
        }
        Ok(())
    }

    fn validation_target<'a>(&'a self, value: &'a str, checked: &'a [bool]) -> ValidationTarget<'a> {
        ValidationTarget {
            kind: &self.base.descriptor.kind,
            name: self.base.descriptor.name_or_empty(),
            value,
            checked,
            required: self.base.descriptor.required,
        }
    }
}

/// Copies the label of a checked option into the search box.
fn commit_selection(doc: &mut Document, option: NodeId, search: NodeId, label: &str) -> Result<()> {
    if doc.checked(option)? {
        doc.set_value(search, label)?;
    }
    Ok(())
}

fn normalized(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.nfc().collect())
    }
}

/// Case-insensitive `.*term.*`. The term is matched literally.
fn search_pattern(term: &str) -> Result<Regex> {
    let escaped = fancy_regex::escape(&normalized(term)).into_owned();
    Regex::new(&format!("(?i).*{escaped}.*"))
        .map_err(|err| Error::Pattern(format!("search term {term:?}: {err}")))
}

fn label_matches(pattern: &Regex, label: &str) -> Result<bool> {
    pattern
        .is_match(&normalized(label))
        .map_err(|err| Error::Pattern(format!("option label {label:?}: {err}")))
}

impl Field for ComboField {
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
            FieldHook::FocusGained => self.gain_focus(cx)?,
            FieldHook::FocusLost => self.lose_focus(cx),
            FieldHook::Search => self.handle_search(cx)?,
            FieldHook::Input(index) => {
                if let (Some(option), Some(label)) =
                    (self.group.inputs.get(index), self.group.labels.get(index))
                {
                    commit_selection(cx.doc, *option, self.search, label)?;
                }
            }
            FieldHook::Keydown(index) => {
                let search = self.search;
                let label = self.group.labels.get(index).cloned().unwrap_or_default();
                let mut commit = |doc: &mut Document, event: &mut EventState| -> Result<()> {
                    commit_selection(doc, event.target(), search, &label)
                };
                return cx.ctrl_enter(event, Some(&mut commit));
            }
        }
        Ok(None)
    }

    fn on_timer(&mut self, cx: &mut FieldContext<'_>, task: TimerTask) -> Result<()> {
        match task {
            TimerTask::MenuCloseCheck { .. } if !self.focus => self.hide_menu(cx),
            TimerTask::MenuCloseCheck { .. } => Ok(()),
        }
    }

    fn value(&self, doc: &Document) -> Result<FieldValue> {
        Ok(FieldValue::Text(doc.value(self.search)?))
    }

    fn is_valid(&self, doc: &Document, validators: &Validators) -> Result<bool> {
        let value = doc.value(self.search)?;
        let checked = self.group.checked_flags(doc)?;
        Ok(validators.validate(&self.validation_target(&value, &checked)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matching<'a>(term: &str, labels: &[&'a str]) -> Result<Vec<&'a str>> {
        let pattern = search_pattern(term)?;
        let mut out = Vec::new();
        for label in labels {
            if label_matches(&pattern, label)? {
                out.push(*label);
            }
        }
        Ok(out)
    }

    #[test]
    fn filter_is_a_case_insensitive_substring_test() -> Result<()> {
        let labels = ["Apple", "Banana", "Avocado"];
        assert_eq!(matching("a", &labels)?, labels.to_vec());
        assert_eq!(matching("Av", &labels)?, vec!["Avocado"]);
        assert_eq!(matching("NAN", &labels)?, vec!["Banana"]);
        assert_eq!(matching("", &labels)?, labels.to_vec());
        Ok(())
    }

    #[test]
    fn metacharacters_in_the_term_match_literally() -> Result<()> {
        let labels = ["C++", "C#", "Cobol", "a.b"];
        assert_eq!(matching("c+", &labels)?, vec!["C++"]);
        assert_eq!(matching(".", &labels)?, vec!["a.b"]);
        assert_eq!(matching("(", &labels)?, Vec::<&str>::new());
        Ok(())
    }

    #[test]
    fn composed_and_decomposed_forms_match_each_other() -> Result<()> {
        let composed = "Caf\u{e9}";
        let decomposed = "Cafe\u{301}";
        assert_eq!(matching(decomposed, &[composed])?, vec![composed]);
        assert_eq!(matching("\u{c9}", &[decomposed])?, vec![decomposed]);
        Ok(())
    }
}
