use crate::dom::form_controls::is_checkable_input;
use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorAttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<SelectorAttrCondition>,
    pub(crate) checked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectorCombinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) step: SelectorStep,
    // Relation to previous (left) selector part.
    pub(crate) combinator: Option<SelectorCombinator>,
}

pub(crate) fn parse_selector_groups(selector: &str) -> Result<Vec<Vec<SelectorPart>>> {
    let groups = split_outside_brackets(selector, |ch| ch == ',');
    let mut parsed = Vec::with_capacity(groups.len());
    for group in groups {
        parsed.push(parse_selector_chain(&group, selector)?);
    }
    Ok(parsed)
}

fn parse_selector_chain(group: &str, full: &str) -> Result<Vec<SelectorPart>> {
    let spaced = group.replace('>', " > ");
    let mut parts: Vec<SelectorPart> = Vec::new();
    let mut pending: Option<SelectorCombinator> = None;

    for token in split_outside_brackets(&spaced, char::is_whitespace) {
        if token.is_empty() {
            continue;
        }
        if token == ">" {
            if pending.is_some() || parts.is_empty() {
                return Err(Error::UnsupportedSelector(full.into()));
            }
            pending = Some(SelectorCombinator::Child);
            continue;
        }
        let step = parse_selector_step(&token, full)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(SelectorCombinator::Descendant))
        };
        parts.push(SelectorPart { step, combinator });
    }

    if parts.is_empty() || pending.is_some() {
        return Err(Error::UnsupportedSelector(full.into()));
    }
    Ok(parts)
}

fn split_outside_brackets(src: &str, is_separator: impl Fn(char) -> bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in src.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(ch);
            }
            (Some(_), _) => current.push(ch),
            (None, '\'' | '"') if bracket_depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '[') => {
                bracket_depth += 1;
                current.push(ch);
            }
            (None, ']') => {
                bracket_depth = bracket_depth.saturating_sub(1);
                current.push(ch);
            }
            (None, c) if bracket_depth == 0 && is_separator(c) => {
                parts.push(std::mem::take(&mut current).trim().to_string());
            }
            _ => current.push(ch),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

fn parse_selector_step(part: &str, full: &str) -> Result<SelectorStep> {
    let unsupported = || Error::UnsupportedSelector(full.into());
    let mut step = SelectorStep::default();
    let mut rest = part;

    if let Some(after) = rest.strip_prefix('*') {
        rest = after;
    } else {
        let (tag, after) = take_ident(rest);
        if !tag.is_empty() {
            step.tag = Some(tag.to_ascii_lowercase());
        }
        rest = after;
    }

    while let Some(marker) = rest.chars().next() {
        match marker {
            '#' => {
                let (id, after) = take_ident(&rest[1..]);
                if id.is_empty() {
                    return Err(unsupported());
                }
                step.id = Some(id.to_string());
                rest = after;
            }
            '.' => {
                let (class, after) = take_ident(&rest[1..]);
                if class.is_empty() {
                    return Err(unsupported());
                }
                step.classes.push(class.to_string());
                rest = after;
            }
            '[' => {
                let close = rest.find(']').ok_or_else(unsupported)?;
                step.attrs.push(parse_attr_condition(&rest[1..close], full)?);
                rest = &rest[close + 1..];
            }
            ':' => {
                let (pseudo, after) = take_ident(&rest[1..]);
                if pseudo != "checked" {
                    return Err(unsupported());
                }
                step.checked = true;
                rest = after;
            }
            _ => return Err(unsupported()),
        }
    }

    Ok(step)
}

fn take_ident(src: &str) -> (&str, &str) {
    let end = src
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_'))
        .map(|(idx, _)| idx)
        .unwrap_or(src.len());
    (&src[..end], &src[end..])
}

fn parse_attr_condition(body: &str, full: &str) -> Result<SelectorAttrCondition> {
    let body = body.trim();
    let Some((key, value)) = body.split_once('=') else {
        let (key, rest) = take_ident(body);
        if key.is_empty() || !rest.is_empty() {
            return Err(Error::UnsupportedSelector(full.into()));
        }
        return Ok(SelectorAttrCondition::Exists {
            key: key.to_ascii_lowercase(),
        });
    };
    let key = key.trim();
    if key.is_empty() || key.ends_with(['^', '$', '*', '~', '|']) {
        return Err(Error::UnsupportedSelector(full.into()));
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .or_else(|| {
            value
                .strip_prefix('\'')
                .and_then(|inner| inner.strip_suffix('\''))
        })
        .unwrap_or(value);
    Ok(SelectorAttrCondition::Eq {
        key: key.to_ascii_lowercase(),
        value: value.to_string(),
    })
}

impl Dom {
    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        Ok(self
            .all_element_nodes()
            .into_iter()
            .filter(|candidate| {
                groups
                    .iter()
                    .any(|steps| self.matches_selector_chain(*candidate, steps))
            })
            .collect())
    }

    fn matches_selector_chain(&self, node_id: NodeId, steps: &[SelectorPart]) -> bool {
        let Some((last, ancestors)) = steps.split_last() else {
            return false;
        };
        if !self.matches_step(node_id, &last.step) {
            return false;
        }
        let Some(combinator) = last.combinator else {
            return true;
        };
        match combinator {
            SelectorCombinator::Child => self
                .parent(node_id)
                .is_some_and(|parent| self.matches_selector_chain(parent, ancestors)),
            SelectorCombinator::Descendant => {
                let mut cursor = self.parent(node_id);
                while let Some(current) = cursor {
                    if self.matches_selector_chain(current, ancestors) {
                        return true;
                    }
                    cursor = self.parent(current);
                }
                false
            }
        }
    }

    fn matches_step(&self, node_id: NodeId, step: &SelectorStep) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };
        if let Some(tag) = &step.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &step.id {
            if element.attrs.get("id") != Some(id) {
                return false;
            }
        }
        if !step
            .classes
            .iter()
            .all(|class| crate::dom::has_class(element, class))
        {
            return false;
        }
        let attrs_match = step.attrs.iter().all(|condition| match condition {
            SelectorAttrCondition::Exists { key } => element.attrs.contains_key(key),
            SelectorAttrCondition::Eq { key, value } => element.attrs.get(key) == Some(value),
        });
        if !attrs_match {
            return false;
        }
        if step.checked && !(is_checkable_input(self, node_id) && element.checked) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom_with(html: &str) -> Result<Dom> {
        let mut dom = Dom::new();
        let host = dom.create_element(dom.root, "main".into(), Default::default());
        dom.set_inner_html(host, html)?;
        Ok(dom)
    }

    #[test]
    fn compound_and_descendant_selectors_match() -> Result<()> {
        let dom = dom_with(
            r#"<fieldset class="page hide"><div class="combo"><input id="search" type="text"></div></fieldset>"#,
        )?;
        assert!(dom.query_selector("fieldset.page.hide #search")?.is_some());
        assert!(dom.query_selector("fieldset > input")?.is_none());
        assert!(dom.query_selector("div.combo > input[type=text]")?.is_some());
        assert!(dom.query_selector("fieldset.visible")?.is_none());
        Ok(())
    }

    #[test]
    fn groups_and_checked_pseudo_class() -> Result<()> {
        let mut dom = dom_with(
            r#"<input type="radio" id="a" name="g"><input type="radio" id="b" name="g">"#,
        )?;
        let b = dom.by_id("b").ok_or_else(|| Error::SelectorNotFound("b".into()))?;
        dom.set_checked(b, true)?;
        assert_eq!(dom.query_selector_all("input:checked")?, vec![b]);
        assert_eq!(dom.query_selector_all("#a, #b")?.len(), 2);
        assert_eq!(dom.query_selector_all("input[name='g']")?.len(), 2);
        Ok(())
    }

    #[test]
    fn unsupported_syntax_is_reported() {
        assert!(matches!(
            parse_selector_groups("li:nth-child(2)"),
            Err(Error::UnsupportedSelector(_))
        ));
        assert!(matches!(
            parse_selector_groups("a[href^=x]"),
            Err(Error::UnsupportedSelector(_))
        ));
        assert!(matches!(
            parse_selector_groups("> p"),
            Err(Error::UnsupportedSelector(_))
        ));
    }
}
