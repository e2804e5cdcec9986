//! Matching steps: one per declared argument, walked in chain order.

use std::io;

use fluent_args_metadata::{GivenHint, Optionality, ParameterInfo, ParameterKind};

use crate::convert::Converter;
use crate::descriptor::{ArgDescriptor, Validator, Value, first_rejection};
use crate::error::ArgError;
use crate::help::HelpSink;
use crate::state::{AliasedValue, ParseState};

/// What the driver does after a step ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Hand the rest of the walk to the branch chain with this index.
    Divert(usize),
}

pub trait Step: Send + Sync {
    fn execute(&self, state: &mut ParseState) -> Flow;

    fn describe(&self, sink: &mut dyn HelpSink) -> io::Result<()>;

    /// Branch index for steps that may divert the walk.
    fn branch(&self) -> Option<usize> {
        None
    }
}

/// Value used when an optional argument is absent.
#[derive(Debug, Clone)]
pub enum Fallback<T> {
    Required,
    Optional(T),
}

impl<T: Value> Fallback<T> {
    fn apply(&self, desc: &ArgDescriptor, state: &mut ParseState) {
        match self {
            Self::Required => state.push_error(ArgError::MissingRequiredArgument(desc.id.clone())),
            Self::Optional(value) => state.bind(desc.id.slot(), value.clone()),
        }
    }
}

/// Recognizes the help aliases anywhere in the input.
pub struct HelpStep {
    aliases: Vec<String>,
}

impl HelpStep {
    pub fn new(aliases: Vec<String>) -> Self {
        Self { aliases }
    }
}

impl Step for HelpStep {
    fn execute(&self, state: &mut ParseState) -> Flow {
        if state.take_flag(&self.aliases) {
            tracing::debug!("help requested");
            state.request_help();
        }
        Flow::Continue
    }

    fn describe(&self, sink: &mut dyn HelpSink) -> io::Result<()> {
        sink.parameter(&ParameterInfo {
            kind: ParameterKind::Flag,
            aliases: self.aliases.clone(),
            description: Some("Show help information".to_string()),
            type_name: "bool".to_string(),
            optionality: Optionality::Optional,
            ..Default::default()
        })
    }
}

pub struct FlagStep {
    desc: ArgDescriptor,
}

impl FlagStep {
    pub fn new(desc: ArgDescriptor) -> Self {
        Self { desc }
    }
}

impl Step for FlagStep {
    fn execute(&self, state: &mut ParseState) -> Flow {
        let present = state.take_flag(&self.desc.aliases);
        state.bind(self.desc.id.slot(), present);
        Flow::Continue
    }

    fn describe(&self, sink: &mut dyn HelpSink) -> io::Result<()> {
        sink.parameter(&self.desc.info)
    }
}

/// Converts and validates one token, recording a failure on `state`.
fn convert_token<T: Value>(
    desc: &ArgDescriptor,
    converter: &Converter<T>,
    validators: &[Validator<T>],
    token: String,
    state: &mut ParseState,
) -> Option<T> {
    let value = match converter.convert(&token) {
        Ok(value) => value,
        Err(e) => {
            state.push_error(ArgError::MalformedValue {
                identity: desc.id.clone(),
                token: Some(token),
                reason: e.reason().to_string(),
            });
            return None;
        }
    };
    if let Some(reason) = first_rejection(validators, &value) {
        state.push_error(ArgError::InvalidValue {
            identity: desc.id.clone(),
            token,
            reason: reason.to_string(),
        });
        return None;
    }
    Some(value)
}

/// Converts every piece, stopping at the first failure, which is reported
/// as a single list element error for the argument.
fn convert_elements<T: Value>(
    desc: &ArgDescriptor,
    converter: &Converter<T>,
    validators: &[Validator<T>],
    pieces: Vec<String>,
    state: &mut ParseState,
) -> Option<Vec<T>> {
    let mut values = Vec::with_capacity(pieces.len());
    for (index, piece) in pieces.into_iter().enumerate() {
        let value = match converter.convert(&piece) {
            Ok(value) => value,
            Err(e) => {
                state.push_error(ArgError::MalformedListElement {
                    identity: desc.id.clone(),
                    token: piece,
                    index,
                    reason: e.reason().to_string(),
                });
                return None;
            }
        };
        if let Some(reason) = first_rejection(validators, &value) {
            state.push_error(ArgError::InvalidValue {
                identity: desc.id.clone(),
                token: piece,
                reason: reason.to_string(),
            });
            return None;
        }
        values.push(value);
    }
    Some(values)
}

fn missing_value(desc: &ArgDescriptor) -> ArgError {
    ArgError::MalformedValue {
        identity: desc.id.clone(),
        token: None,
        reason: "expected a value after the alias".to_string(),
    }
}

pub struct ParameterStep<T> {
    pub(crate) desc: ArgDescriptor,
    pub(crate) converter: Converter<T>,
    pub(crate) fallback: Fallback<T>,
    pub(crate) validators: Vec<Validator<T>>,
}

impl<T: Value> Step for ParameterStep<T> {
    fn execute(&self, state: &mut ParseState) -> Flow {
        match state.take_aliased_value(&self.desc.aliases) {
            AliasedValue::Absent => self.fallback.apply(&self.desc, state),
            AliasedValue::MissingValue => state.push_error(missing_value(&self.desc)),
            AliasedValue::Present(token) => {
                if let Some(value) =
                    convert_token(&self.desc, &self.converter, &self.validators, token, state)
                {
                    state.bind(self.desc.id.slot(), value);
                }
            }
        }
        Flow::Continue
    }

    fn describe(&self, sink: &mut dyn HelpSink) -> io::Result<()> {
        sink.parameter(&self.desc.info)
    }
}

pub struct ListParameterStep<T> {
    pub(crate) desc: ArgDescriptor,
    pub(crate) converter: Converter<T>,
    pub(crate) separators: Vec<String>,
    pub(crate) fallback: Fallback<Vec<T>>,
    pub(crate) validators: Vec<Validator<T>>,
}

impl<T: Value> Step for ListParameterStep<T> {
    fn execute(&self, state: &mut ParseState) -> Flow {
        match state.take_aliased_value(&self.desc.aliases) {
            AliasedValue::Absent => self.fallback.apply(&self.desc, state),
            AliasedValue::MissingValue => state.push_error(missing_value(&self.desc)),
            AliasedValue::Present(token) => {
                let pieces = split_any(&token, &self.separators);
                if let Some(values) =
                    convert_elements(&self.desc, &self.converter, &self.validators, pieces, state)
                {
                    state.bind(self.desc.id.slot(), values);
                }
            }
        }
        Flow::Continue
    }

    fn describe(&self, sink: &mut dyn HelpSink) -> io::Result<()> {
        sink.parameter(&self.desc.info)
    }
}

pub struct PositionalStep<T> {
    pub(crate) desc: ArgDescriptor,
    pub(crate) converter: Converter<T>,
    pub(crate) fallback: Fallback<T>,
    pub(crate) validators: Vec<Validator<T>>,
}

impl<T: Value> Step for PositionalStep<T> {
    fn execute(&self, state: &mut ParseState) -> Flow {
        match state.take_next() {
            None => self.fallback.apply(&self.desc, state),
            Some(token) => {
                if let Some(value) =
                    convert_token(&self.desc, &self.converter, &self.validators, token, state)
                {
                    state.bind(self.desc.id.slot(), value);
                }
            }
        }
        Flow::Continue
    }

    fn describe(&self, sink: &mut dyn HelpSink) -> io::Result<()> {
        sink.parameter(&self.desc.info)
    }
}

pub struct RemainingStep<T> {
    pub(crate) desc: ArgDescriptor,
    pub(crate) converter: Converter<T>,
    pub(crate) validators: Vec<Validator<T>>,
}

impl<T: Value> Step for RemainingStep<T> {
    fn execute(&self, state: &mut ParseState) -> Flow {
        let tokens = state.drain_remaining();
        if let Some(values) =
            convert_elements(&self.desc, &self.converter, &self.validators, tokens, state)
        {
            state.bind(self.desc.id.slot(), values);
        }
        Flow::Continue
    }

    fn describe(&self, sink: &mut dyn HelpSink) -> io::Result<()> {
        sink.parameter(&self.desc.info)
    }
}

/// Condition that opens a branch.
#[derive(Debug, Clone)]
pub enum GivenCondition {
    Flag { aliases: Vec<String> },
    ParameterIs { aliases: Vec<String>, value: String },
}

impl GivenCondition {
    pub(crate) fn hint(&self) -> GivenHint {
        match self {
            Self::Flag { aliases } => GivenHint::new(aliases.clone(), "is set"),
            Self::ParameterIs { aliases, value } => {
                GivenHint::new(aliases.clone(), format!("is '{value}'"))
            }
        }
    }
}

pub struct GivenStep {
    condition: GivenCondition,
    branch: usize,
}

impl GivenStep {
    pub fn new(condition: GivenCondition, branch: usize) -> Self {
        Self { condition, branch }
    }
}

impl Step for GivenStep {
    fn execute(&self, state: &mut ParseState) -> Flow {
        let matched = match &self.condition {
            GivenCondition::Flag { aliases } => state.take_flag(aliases),
            GivenCondition::ParameterIs { aliases, value } => {
                state.take_alias_with_value(aliases, value)
            }
        };
        if matched {
            Flow::Divert(self.branch)
        } else {
            Flow::Continue
        }
    }

    // Branch arguments are described by the driver, which owns the branch.
    fn describe(&self, _sink: &mut dyn HelpSink) -> io::Result<()> {
        Ok(())
    }

    fn branch(&self) -> Option<usize> {
        Some(self.branch)
    }
}

/// Split on any of `separators`. At each position the longest matching
/// separator wins.
fn split_any(value: &str, separators: &[String]) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut idx = 0;
    while idx < value.len() {
        let matched = separators
            .iter()
            .filter(|s| !s.is_empty() && value[idx..].starts_with(s.as_str()))
            .map(String::len)
            .max();
        match matched {
            Some(len) => {
                pieces.push(value[start..idx].to_string());
                idx += len;
                start = idx;
            }
            None => {
                idx += value[idx..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }
    pieces.push(value[start..].to_string());
    pieces
}
