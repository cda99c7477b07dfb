use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How a plain Enter on a checkbox or radio changes its `checked` state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckToggle {
    /// Always ends up checked, whatever the prior state.
    #[default]
    Legacy,
    /// Flips the current state.
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormConfig {
    pub hidden_class: String,
    pub error_class: String,
    pub menu_close_delay_ms: i64,
    pub check_toggle: CheckToggle,
    /// Seed for auto-generated option group names. Unset means entropy.
    pub random_seed: Option<u64>,
    pub trace: bool,
    pub trace_log_limit: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            hidden_class: "hide".into(),
            error_class: "error".into(),
            menu_close_delay_ms: 100,
            check_toggle: CheckToggle::Legacy,
            random_seed: None,
            trace: false,
            trace_log_limit: 10_000,
        }
    }
}

impl FormConfig {
    pub fn from_json(src: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(src).map_err(|err| Error::Config(err.to_string()))?;
        config.validated()
    }

    /// Rejects class names that are not a single token and out-of-range
    /// limits.
    pub fn validated(self) -> Result<Self> {
        if self.hidden_class.trim().is_empty() || self.hidden_class.contains(char::is_whitespace) {
            return Err(Error::Config(format!(
                "hidden_class must be a single class token, got {:?}",
                self.hidden_class
            )));
        }
        if self.error_class.trim().is_empty() || self.error_class.contains(char::is_whitespace) {
            return Err(Error::Config(format!(
                "error_class must be a single class token, got {:?}",
                self.error_class
            )));
        }
        if self.menu_close_delay_ms < 0 {
            return Err(Error::Config(
                "menu_close_delay_ms must be non-negative".into(),
            ));
        }
        if self.trace_log_limit == 0 {
            return Err(Error::Config("trace_log_limit must be at least 1".into()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() -> Result<()> {
        assert_eq!(FormConfig::from_json("{}")?, FormConfig::default());
        Ok(())
    }

    #[test]
    fn partial_overrides_keep_remaining_defaults() -> Result<()> {
        let config = FormConfig::from_json(
            r#"{"check_toggle": "boolean", "random_seed": 7, "menu_close_delay_ms": 250}"#,
        )?;
        assert_eq!(config.check_toggle, CheckToggle::Boolean);
        assert_eq!(config.random_seed, Some(7));
        assert_eq!(config.menu_close_delay_ms, 250);
        assert_eq!(config.hidden_class, "hide");
        Ok(())
    }

    #[test]
    fn malformed_input_is_a_config_error() {
        for src in [
            "{",
            r#"{"check_toggle": "sometimes"}"#,
            r#"{"hidden_klass": "x"}"#,
            r#"{"hidden_class": "two words"}"#,
            r#"{"menu_close_delay_ms": -5}"#,
            r#"{"trace_log_limit": 0}"#,
        ] {
            assert!(
                matches!(FormConfig::from_json(src), Err(Error::Config(_))),
                "{src} should be rejected"
            );
        }
    }
}
