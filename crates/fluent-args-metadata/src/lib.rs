//! Shared help metadata model for fluent-args parsers.
//!
//! This crate intentionally does **not** depend on the parser itself.
//! The data types here describe every declared argument the way a help sink
//! sees it, and are used for:
//! - feeding help renderers (`fluent_args::help`)
//! - dumping a parser's interface as JSON (`HelpFormat::Json`)

use serde::{Deserialize, Serialize};

/// Version of the JSON payload produced by [`HelpMetadata::to_json_bytes`].
pub const HELP_METADATA_FORMAT_VERSION: u32 = 1;

/// What kind of step an argument is matched by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterKind {
    Flag,
    #[default]
    Parameter,
    ListParameter,
    Positional,
    RemainingArguments,
}

/// Whether an argument must be present, and what it falls back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Optionality {
    #[default]
    Required,
    Optional,
    OptionalWithDefault { default: String },
}

impl Optionality {
    pub fn is_optional(&self) -> bool {
        !matches!(self, Self::Required)
    }

    pub fn default_value(&self) -> Option<&str> {
        match self {
            Self::OptionalWithDefault { default } => Some(default.as_str()),
            Self::Required | Self::Optional => None,
        }
    }
}

/// Help-only note that an argument is only reachable inside a branch.
///
/// `aliases` are the aliases of the argument that opens the branch and
/// `description` completes the sentence, e.g. `is set` or `is 'fast'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct GivenHint {
    pub aliases: Vec<String>,
    pub description: String,
}

impl GivenHint {
    pub fn new(aliases: Vec<String>, description: impl Into<String>) -> Self {
        Self {
            aliases,
            description: description.into(),
        }
    }

    /// The shortest alias, which reads best inside a sentence.
    pub fn shortest_alias(&self) -> &str {
        self.aliases
            .iter()
            .min_by_key(|a| a.len())
            .map(|a| a.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ParameterInfo {
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub type_name: String,
    #[serde(default)]
    pub optionality: Optionality,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub separators: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given_hints: Vec<GivenHint>,
}

/// JSON payload describing a whole parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HelpMetadata {
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Default for HelpMetadata {
    fn default() -> Self {
        Self {
            format_version: HELP_METADATA_FORMAT_VERSION,
            description: None,
            parameters: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl HelpMetadata {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.parameters.is_empty() && self.errors.is_empty()
    }

    /// Encode as pretty-printed JSON bytes.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_vec_pretty(self).unwrap_or_default()
    }

    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_kebab_case_and_skips_empty_fields() {
        let meta = HelpMetadata {
            description: Some("demo".to_string()),
            parameters: vec![ParameterInfo {
                kind: ParameterKind::ListParameter,
                aliases: vec!["--tags".to_string()],
                type_name: "String".to_string(),
                optionality: Optionality::OptionalWithDefault {
                    default: "a".to_string(),
                },
                separators: vec![",".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        };

        let json: serde_json::Value = serde_json::from_slice(&meta.to_json_bytes()).unwrap();
        assert_eq!(json["format-version"], 1);
        let param = &json["parameters"][0];
        assert_eq!(param["kind"], "list-parameter");
        assert_eq!(param["type-name"], "String");
        assert_eq!(param["optionality"]["kind"], "optional-with-default");
        assert_eq!(param["optionality"]["default"], "a");
        assert!(param.get("examples").is_none());
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn decodes_payload_without_optional_fields() {
        let raw = br#"{"format-version":1,"parameters":[{"kind":"flag","type-name":"bool"}]}"#;
        let meta = HelpMetadata::from_json_slice(raw).unwrap();
        assert_eq!(meta.parameters.len(), 1);
        assert_eq!(meta.parameters[0].kind, ParameterKind::Flag);
        assert_eq!(meta.parameters[0].optionality, Optionality::Required);
        assert!(meta.description.is_none());
    }

    #[test]
    fn shortest_alias_prefers_short_form() {
        let hint = GivenHint::new(vec!["--verbose".to_string(), "-v".to_string()], "is set");
        assert_eq!(hint.shortest_alias(), "-v");
        assert!(!Optionality::Required.is_optional());
        assert_eq!(
            Optionality::OptionalWithDefault {
                default: "7".to_string()
            }
            .default_value(),
            Some("7")
        );
    }
}
