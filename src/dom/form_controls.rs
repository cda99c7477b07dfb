use super::{Dom, NodeId};
use crate::Result;

fn is_input_of_type(dom: &Dom, node_id: NodeId, kind: &str) -> bool {
    if !dom.has_tag(node_id, "input") {
        return false;
    }
    dom.attr(node_id, "type")
        .map(|value| value.eq_ignore_ascii_case(kind))
        .unwrap_or(false)
}

pub(crate) fn is_checkbox_input(dom: &Dom, node_id: NodeId) -> bool {
    is_input_of_type(dom, node_id, "checkbox")
}

pub(crate) fn is_radio_input(dom: &Dom, node_id: NodeId) -> bool {
    is_input_of_type(dom, node_id, "radio")
}

pub(crate) fn is_checkable_input(dom: &Dom, node_id: NodeId) -> bool {
    is_checkbox_input(dom, node_id) || is_radio_input(dom, node_id)
}

pub(crate) fn is_text_control(dom: &Dom, node_id: NodeId) -> bool {
    if dom.has_tag(node_id, "textarea") {
        return true;
    }
    if !dom.has_tag(node_id, "input") {
        return false;
    }
    let kind = dom
        .attr(node_id, "type")
        .unwrap_or_else(|| "text".to_string())
        .to_ascii_lowercase();
    !matches!(
        kind.as_str(),
        "checkbox" | "radio" | "submit" | "button" | "reset" | "image" | "hidden" | "file"
    )
}

pub(crate) fn is_submit_control(dom: &Dom, node_id: NodeId) -> bool {
    if dom.has_tag(node_id, "button") {
        return dom
            .attr(node_id, "type")
            .map(|kind| kind.eq_ignore_ascii_case("submit"))
            .unwrap_or(true);
    }
    is_input_of_type(dom, node_id, "submit")
}

/// Navigation elements the keyboard shortcut handler leaves alone.
pub(crate) fn is_link_or_button(dom: &Dom, node_id: NodeId) -> bool {
    dom.has_tag(node_id, "a") || dom.has_tag(node_id, "button")
}

impl Dom {
    pub(crate) fn checked(&self, node_id: NodeId) -> Result<bool> {
        Ok(self.require_element(node_id, "checked")?.checked)
    }

    pub(crate) fn set_checked(&mut self, node_id: NodeId, checked: bool) -> Result<()> {
        if checked && is_radio_input(self, node_id) {
            self.uncheck_other_radios_in_group(node_id);
        }
        self.require_element_mut(node_id, "checked")?.checked = checked;
        Ok(())
    }

    fn uncheck_other_radios_in_group(&mut self, target: NodeId) {
        let target_name = self.attr(target, "name").unwrap_or_default();
        if target_name.is_empty() {
            return;
        }
        let target_form = self.find_ancestor_by_tag(target, "form");

        for node in self.all_element_nodes() {
            if node == target || !is_radio_input(self, node) {
                continue;
            }
            if self.attr(node, "name").unwrap_or_default() != target_name {
                continue;
            }
            if self.find_ancestor_by_tag(node, "form") != target_form {
                continue;
            }
            if let Some(element) = self.element_mut(node) {
                element.checked = false;
            }
        }
    }

    /// The control a `<label>` activates: its `for` target, else its first
    /// descendant input.
    pub(crate) fn label_control(&self, label: NodeId) -> Option<NodeId> {
        if !self.has_tag(label, "label") {
            return None;
        }
        if let Some(target_id) = self.attr(label, "for") {
            if let Some(node) = self.by_id(&target_id) {
                return Some(node);
            }
        }
        let mut descendants = Vec::new();
        self.collect_elements_dfs(label, &mut descendants);
        descendants
            .into_iter()
            .find(|node| self.has_tag(*node, "input"))
    }

    /// Name/value pairs a native submission of `form` would carry.
    pub(crate) fn form_entries(&self, form: NodeId) -> Result<Vec<(String, String)>> {
        let mut controls = Vec::new();
        self.collect_elements_dfs(form, &mut controls);

        let mut entries = Vec::new();
        for node in controls {
            if !(self.has_tag(node, "input") || self.has_tag(node, "textarea")) {
                continue;
            }
            let Some(name) = self.attr(node, "name").filter(|name| !name.is_empty()) else {
                continue;
            };
            if self.has_attr(node, "disabled") {
                continue;
            }
            if is_checkable_input(self, node) {
                if self.checked(node)? {
                    let value = self.attr(node, "value").unwrap_or_else(|| "on".into());
                    entries.push((name, value));
                }
                continue;
            }
            if is_text_control(self, node) {
                entries.push((name, self.value(node)?));
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::Error;

    fn fixture(html: &str) -> Result<(Dom, NodeId)> {
        let mut dom = Dom::new();
        let form = dom.create_element(dom.root, "form".into(), HashMap::new());
        dom.set_inner_html(form, html)?;
        Ok((dom, form))
    }

    fn by_id(dom: &Dom, id: &str) -> Result<NodeId> {
        dom.by_id(id).ok_or_else(|| Error::SelectorNotFound(id.into()))
    }

    #[test]
    fn checking_radio_unchecks_same_named_peers() -> Result<()> {
        let (mut dom, _) = fixture(
            r#"<input type="radio" id="a" name="g" checked>
               <input type="radio" id="b" name="g">
               <input type="radio" id="c" name="other" checked>"#,
        )?;
        let (a, b, c) = (by_id(&dom, "a")?, by_id(&dom, "b")?, by_id(&dom, "c")?);
        dom.set_checked(b, true)?;
        assert!(!dom.checked(a)?);
        assert!(dom.checked(b)?);
        assert!(dom.checked(c)?);
        Ok(())
    }

    #[test]
    fn checkboxes_do_not_exclude_each_other() -> Result<()> {
        let (mut dom, _) = fixture(
            r#"<input type="checkbox" id="a" name="g"><input type="checkbox" id="b" name="g">"#,
        )?;
        let (a, b) = (by_id(&dom, "a")?, by_id(&dom, "b")?);
        dom.set_checked(a, true)?;
        dom.set_checked(b, true)?;
        assert!(dom.checked(a)? && dom.checked(b)?);
        Ok(())
    }

    #[test]
    fn label_resolves_for_target() -> Result<()> {
        let (dom, _) = fixture(r#"<input type="radio" id="x_0"><label id="l" for="x_0">A</label>"#)?;
        assert_eq!(dom.label_control(by_id(&dom, "l")?), Some(by_id(&dom, "x_0")?));
        Ok(())
    }

    #[test]
    fn form_entries_skip_unchecked_and_unnamed_controls() -> Result<()> {
        let (mut dom, form) = fixture(
            r#"<input id="n" name="nick" value="kit">
               <input id="anon" value="ignored">
               <input type="checkbox" id="a" name="pets" value="0">
               <input type="checkbox" id="b" name="pets" value="1">"#,
        )?;
        let b = by_id(&dom, "b")?;
        dom.set_checked(b, true)?;
        assert_eq!(
            dom.form_entries(form)?,
            vec![
                ("nick".to_string(), "kit".to_string()),
                ("pets".to_string(), "1".to_string())
            ]
        );
        Ok(())
    }

    #[test]
    fn submit_control_detection_defaults_buttons_to_submit() -> Result<()> {
        let (dom, _) = fixture(
            r##"<button id="plain">go</button><button id="btn" type="button">no</button><a id="link" href="#">x</a>"##,
        )?;
        assert!(is_submit_control(&dom, by_id(&dom, "plain")?));
        assert!(!is_submit_control(&dom, by_id(&dom, "btn")?));
        assert!(is_link_or_button(&dom, by_id(&dom, "link")?));
        Ok(())
    }
}
