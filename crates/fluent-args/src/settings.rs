use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::help::{DEFAULT_LINE_WIDTH, DisabledHelp, HelpSink, JsonHelp, SimpleHelp};

/// How help output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HelpFormat {
    Disabled,
    #[default]
    Simple,
    Json,
}

/// What the blocking and async entry points render when parsing fails.
/// The error is returned to the caller in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorReporting {
    Silent,
    #[default]
    Errors,
    ErrorsWithHelp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ParserSettings {
    pub application_description: Option<String>,
    /// Aliases recognized by the built-in help step. Empty disables it.
    pub help_aliases: Vec<String>,
    pub help_format: HelpFormat,
    pub error_reporting: ErrorReporting,
    /// Report tokens that no step consumed as errors.
    pub reject_unknown_arguments: bool,
    pub line_width: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            application_description: None,
            help_aliases: vec!["-h".to_string(), "--help".to_string()],
            help_format: HelpFormat::default(),
            error_reporting: ErrorReporting::default(),
            reject_unknown_arguments: false,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

impl ParserSettings {
    /// Parse settings from JSON; missing fields keep their defaults.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Build the sink configured by `help_format` on top of `out`.
    pub fn sink<'w, W: Write + 'w>(&self, out: W) -> Box<dyn HelpSink + 'w> {
        match self.help_format {
            HelpFormat::Disabled => Box::new(DisabledHelp),
            HelpFormat::Simple => {
                let mut sink = SimpleHelp::new(out).with_width(self.line_width);
                if let Some(alias) = self.help_aliases.iter().max_by_key(|a| a.len()) {
                    sink = sink.with_help_hint(alias.clone());
                }
                Box::new(sink)
            }
            HelpFormat::Json => Box::new(JsonHelp::new(out)),
        }
    }
}
