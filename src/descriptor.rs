use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavAction {
    Next,
    Prev,
    Submit,
}

impl NavAction {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "next" => Some(Self::Next),
            "prev" => Some(Self::Prev),
            "submit" => Some(Self::Submit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Prev => "prev",
            Self::Submit => "submit",
        }
    }
}

/// Declarative description of a single field. Every key is optional; a
/// missing `type` selects the invalid-field placeholder.
///
/// Values of the wrong JSON type never reject the form: scalars render as
/// their JSON text, a non-array `options` is empty and `required` follows
/// truthiness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldDescriptor {
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: String,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub label: Option<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub placeholder: Option<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub value: Option<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::text_list")]
    pub options: Vec<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub text: Option<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub search: Option<String>,
    #[serde(deserialize_with = "lenient::truthy")]
    pub required: bool,
}

impl FieldDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new("text")
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub(crate) fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// Navigation buttons in declaration order. Keys other than `next`, `prev`
/// and `submit` are kept but never rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct NavigationSpec {
    entries: Vec<(String, String)>,
}

impl From<Map<String, Value>> for NavigationSpec {
    fn from(map: Map<String, Value>) -> Self {
        let entries = map
            .into_iter()
            .map(|(key, value)| (key, lenient::stringify(value)))
            .collect();
        Self { entries }
    }
}

impl NavigationSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.entries.push((key.into(), label.into()));
        self
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Recognized buttons in declaration order.
    pub fn buttons(&self) -> impl Iterator<Item = (NavAction, &str)> {
        self.entries
            .iter()
            .filter_map(|(key, label)| NavAction::from_key(key).map(|action| (action, label.as_str())))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageDescriptor {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub navigation: Option<NavigationSpec>,
}

impl PageDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_navigation(mut self, navigation: NavigationSpec) -> Self {
        self.navigation = Some(navigation);
        self
    }
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn stringify(value: Value) -> String {
        match value {
            Value::String(text) => text,
            other => other.to_string(),
        }
    }

    pub(super) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(optional_text(deserializer)?.unwrap_or_default())
    }

    pub(super) fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            other => Some(stringify(other)),
        })
    }

    pub(super) fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items.into_iter().map(stringify).collect(),
            _ => Vec::new(),
        })
    }

    pub(super) fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => false,
            Value::Bool(flag) => flag,
            Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
            Value::String(text) => !text.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FormSpec {
    pub pages: Vec<PageDescriptor>,
}

impl FormSpec {
    pub fn new(pages: Vec<PageDescriptor>) -> Self {
        Self { pages }
    }

    pub fn from_json(src: &str) -> Result<Self> {
        serde_json::from_str(src).map_err(|err| Error::Descriptor(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_keeps_declaration_order_and_skips_unknown_keys() -> Result<()> {
        let spec = FormSpec::from_json(
            r#"[{"name": "p", "navigation": {"submit": "Send", "help": "?", "prev": "Back"}}]"#,
        )?;
        let nav = spec.pages[0]
            .navigation
            .as_ref()
            .ok_or_else(|| Error::Descriptor("navigation missing".into()))?;
        assert_eq!(nav.entries().len(), 3);
        assert_eq!(
            nav.buttons().collect::<Vec<_>>(),
            vec![(NavAction::Submit, "Send"), (NavAction::Prev, "Back")]
        );
        Ok(())
    }

    #[test]
    fn missing_properties_deserialize_to_empty() -> Result<()> {
        let spec = FormSpec::from_json(r#"[{"fields": [{}, {"type": "radio", "options": ["A"]}]}]"#)?;
        let page = &spec.pages[0];
        assert_eq!(page.name, "");
        assert!(page.navigation.is_none());
        assert_eq!(page.fields[0].kind, "");
        assert_eq!(page.fields[1].options, vec!["A"]);
        assert!(page.fields[1].description.is_none());
        assert!(!page.fields[1].required);
        Ok(())
    }

    #[test]
    fn mistyped_properties_degrade_instead_of_failing() -> Result<()> {
        let spec = FormSpec::from_json(
            r#"[{"name": 2, "fields": [
                {"type": "input", "value": 42, "label": true, "name": null, "required": "yes"},
                {"type": "radio", "options": [1, "B", null], "required": 0},
                {"type": 7, "options": 3, "text": {"a": 1}}
            ]}]"#,
        )?;
        let page = &spec.pages[0];
        assert_eq!(page.name, "2");
        let [input, radio, odd] = &page.fields[..] else {
            return Err(Error::Descriptor("expected three fields".into()));
        };
        assert_eq!(input.value.as_deref(), Some("42"));
        assert_eq!(input.label.as_deref(), Some("true"));
        assert!(input.name.is_none());
        assert!(input.required);
        assert_eq!(radio.options, vec!["1", "B", "null"]);
        assert!(!radio.required);
        assert_eq!(odd.kind, "7");
        assert!(odd.options.is_empty());
        assert_eq!(odd.text.as_deref(), Some(r#"{"a":1}"#));
        Ok(())
    }

    #[test]
    fn structural_errors_are_descriptor_errors() {
        assert!(matches!(
            FormSpec::from_json(r#"{"pages": []}"#),
            Err(Error::Descriptor(_))
        ));
        assert!(matches!(
            FormSpec::from_json(r#"[{"fields": {}}]"#),
            Err(Error::Descriptor(_))
        ));
    }

    #[test]
    fn builders_match_json_shape() -> Result<()> {
        let built = PageDescriptor::new("About you")
            .with_field(FieldDescriptor::new("input").with_label("Name").with_name("name").required())
            .with_navigation(NavigationSpec::new().with("next", "Next"));
        let parsed = FormSpec::from_json(
            r#"[{"name": "About you",
                 "fields": [{"type": "input", "label": "Name", "name": "name", "required": true}],
                 "navigation": {"next": "Next"}}]"#,
        )?;
        assert_eq!(parsed.pages, vec![built]);
        Ok(())
    }
}
