#![deny(missing_docs)]

//! # Text Formats
//!
//! The text layer is chosen by the caller for each call; the model itself
//! only sees generic [`serde_json::Value`]s.

use crate::error::AppResult;
use serde_json::Value;

/// A text encoding of the generic document form.
pub trait TextFormat {
    /// Parses text into a generic value.
    fn parse(&self, text: &str) -> AppResult<Value>;

    /// Renders a generic value as text.
    fn render(&self, value: &Value) -> AppResult<String>;
}

/// JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json {
    /// Indent output.
    pub pretty: bool,
}

impl Json {
    /// Compact output.
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    /// Indented output.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl TextFormat for Json {
    fn parse(&self, text: &str) -> AppResult<Value> {
        Ok(serde_json::from_str(text)?)
    }

    fn render(&self, value: &Value) -> AppResult<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(text)
    }
}

/// YAML via `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Yaml;

impl TextFormat for Yaml {
    fn parse(&self, text: &str) -> AppResult<Value> {
        Ok(serde_yaml::from_str(text)?)
    }

    fn render(&self, value: &Value) -> AppResult<String> {
        Ok(serde_yaml::to_string(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    #[test]
    fn test_json_compact_and_pretty() {
        let value = json!({"b": 1, "a": [true]});
        assert_eq!(Json::compact().render(&value).unwrap(), r#"{"b":1,"a":[true]}"#);
        assert!(Json::pretty().render(&value).unwrap().contains('\n'));
    }

    #[test]
    fn test_yaml_keeps_key_order() {
        let yaml = r#"
title: Pet
type: object
required:
  - id
"#;
        let value = Yaml.parse(yaml).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["title", "type", "required"]);
        assert!(Yaml.render(&value).unwrap().starts_with("title: Pet"));
    }

    #[test]
    fn test_parse_errors_are_wrapped() {
        assert!(matches!(Json::compact().parse("{").unwrap_err(), AppError::Json(_)));
        assert!(matches!(Yaml.parse("a: [").unwrap_err(), AppError::Yaml(_)));
    }
}
