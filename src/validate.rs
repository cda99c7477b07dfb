use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use fancy_regex::Regex;

use crate::field::FieldValue;

/// What a validator sees of a field at the moment it is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTarget<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub value: &'a str,
    /// Per-option checked flags; empty for single controls.
    pub checked: &'a [bool],
    pub required: bool,
}

pub trait Validator: fmt::Debug {
    fn validate(&self, target: &ValidationTarget<'_>) -> bool;
}

/// Required text must be non-empty; required groups need a checked option.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl Validator for Required {
    fn validate(&self, target: &ValidationTarget<'_>) -> bool {
        if !target.required {
            return true;
        }
        if target.checked.is_empty() {
            !target.value.is_empty()
        } else {
            target.checked.iter().any(|checked| *checked)
        }
    }
}

/// At least one option checked, regardless of `required`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnySelected;

impl Validator for AnySelected {
    fn validate(&self, target: &ValidationTarget<'_>) -> bool {
        target.checked.iter().any(|checked| *checked)
    }
}

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

/// `local@domain` shape check. An empty optional value passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailShape;

impl EmailShape {
    fn pattern() -> Option<&'static Regex> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        PATTERN
            .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
            .as_ref()
    }
}

impl Validator for EmailShape {
    fn validate(&self, target: &ValidationTarget<'_>) -> bool {
        if target.value.is_empty() && !target.required {
            return true;
        }
        Self::pattern().is_some_and(|pattern| pattern.is_match(target.value).unwrap_or(false))
    }
}

/// Validators keyed by field type tag and by descriptor name. A field is
/// valid when every applicable validator accepts it.
#[derive(Debug, Default)]
pub struct Validators {
    by_kind: HashMap<String, Vec<Box<dyn Validator>>>,
    by_name: HashMap<String, Vec<Box<dyn Validator>>>,
}

impl Validators {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Required` on every input and group kind.
    pub fn standard() -> Self {
        Self::new()
            .for_kind("input", Required)
            .for_kind("radio", Required)
            .for_kind("multiselect", Required)
            .for_kind("combobox", Required)
    }

    pub fn for_kind(mut self, kind: impl Into<String>, validator: impl Validator + 'static) -> Self {
        self.by_kind
            .entry(kind.into())
            .or_default()
            .push(Box::new(validator));
        self
    }

    pub fn for_name(mut self, name: impl Into<String>, validator: impl Validator + 'static) -> Self {
        self.by_name
            .entry(name.into())
            .or_default()
            .push(Box::new(validator));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty() && self.by_name.is_empty()
    }

    pub fn validate(&self, target: &ValidationTarget<'_>) -> bool {
        let by_kind = self.by_kind.get(target.kind).into_iter().flatten();
        let by_name = self
            .by_name
            .get(target.name)
            .filter(|_| !target.name.is_empty())
            .into_iter()
            .flatten();
        by_kind
            .chain(by_name)
            .all(|validator| validator.validate(target))
    }
}

/// Everything a [`SubmitGate`] may consult before the form submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCheck<'a> {
    pub values: &'a [(usize, usize, FieldValue)],
    /// `(page, field)` of every field its validators reject.
    pub invalid: &'a [(usize, usize)],
}

pub trait SubmitGate: fmt::Debug {
    fn allow(&self, check: &SubmitCheck<'_>) -> bool;
}

/// The default gate: submission always proceeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSubmit;

impl SubmitGate for AlwaysSubmit {
    fn allow(&self, _check: &SubmitCheck<'_>) -> bool {
        true
    }
}

/// Blocks submission while any field fails validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireValid;

impl SubmitGate for RequireValid {
    fn allow(&self, check: &SubmitCheck<'_>) -> bool {
        check.invalid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text<'a>(kind: &'a str, name: &'a str, value: &'a str, required: bool) -> ValidationTarget<'a> {
        ValidationTarget {
            kind,
            name,
            value,
            checked: &[],
            required,
        }
    }

    #[test]
    fn required_applies_only_when_flagged() {
        assert!(Required.validate(&text("input", "n", "", false)));
        assert!(!Required.validate(&text("input", "n", "", true)));
        assert!(Required.validate(&text("input", "n", "x", true)));

        let group = ValidationTarget {
            checked: &[false, false],
            ..text("radio", "g", "", true)
        };
        assert!(!Required.validate(&group));
        assert!(Required.validate(&ValidationTarget {
            checked: &[false, true],
            ..group
        }));
    }

    #[test]
    fn email_shape_accepts_plausible_addresses() {
        assert!(EmailShape.validate(&text("input", "email", "taro@example.co.jp", true)));
        assert!(EmailShape.validate(&text("input", "email", "", false)));
        assert!(!EmailShape.validate(&text("input", "email", "", true)));
        assert!(!EmailShape.validate(&text("input", "email", "taro@", true)));
        assert!(!EmailShape.validate(&text("input", "email", "no-at-sign", false)));
        assert!(!EmailShape.validate(&text("input", "email", "a@-bad.com", false)));
    }

    #[test]
    fn registry_combines_kind_and_name_validators() {
        let validators = Validators::standard().for_name("email", EmailShape);
        assert!(!validators.validate(&text("input", "email", "bad", false)));
        assert!(validators.validate(&text("input", "email", "a@b.c", true)));
        assert!(!validators.validate(&text("input", "nick", "", true)));
        assert!(validators.validate(&text("text", "", "", true)));
        assert!(Validators::new().is_empty());
    }

    #[test]
    fn gates() {
        let check = SubmitCheck {
            values: &[],
            invalid: &[(0, 1)],
        };
        assert!(AlwaysSubmit.allow(&check));
        assert!(!RequireValid.allow(&check));
        assert!(RequireValid.allow(&SubmitCheck {
            invalid: &[],
            ..check
        }));
        assert!(AnySelected.validate(&ValidationTarget {
            checked: &[true],
            ..text("multiselect", "", "", false)
        }));
    }
}
