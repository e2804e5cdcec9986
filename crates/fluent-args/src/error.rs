use std::fmt;
use std::io;

use thiserror::Error;

use crate::descriptor::ArgId;

/// A problem with one argument in one parse call.
///
/// These are collected while the chain is walked and never stop it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("missing required argument: {0}")]
    MissingRequiredArgument(ArgId),

    #[error("malformed value for {identity}: {reason}")]
    MalformedValue {
        identity: ArgId,
        token: Option<String>,
        reason: String,
    },

    #[error("malformed element #{index} '{token}' for {identity}: {reason}")]
    MalformedListElement {
        identity: ArgId,
        token: String,
        index: usize,
        reason: String,
    },

    #[error("invalid value '{token}' for {identity}: {reason}")]
    InvalidValue {
        identity: ArgId,
        token: String,
        reason: String,
    },

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

impl ArgError {
    /// The argument this error belongs to, if any.
    pub fn identity(&self) -> Option<&ArgId> {
        match self {
            Self::MissingRequiredArgument(id) => Some(id),
            Self::MalformedValue { identity, .. }
            | Self::MalformedListElement { identity, .. }
            | Self::InvalidValue { identity, .. } => Some(identity),
            Self::UnexpectedArgument(_) => None,
        }
    }
}

/// Every argument error of one parse call, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgErrors(Vec<ArgError>);

impl ArgErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArgError> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ArgError] {
        self.0.as_slice()
    }

    pub fn into_vec(self) -> Vec<ArgError> {
        self.0
    }
}

impl From<Vec<ArgError>> for ArgErrors {
    fn from(errors: Vec<ArgError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ArgErrors {
    type Item = ArgError;
    type IntoIter = std::vec::IntoIter<ArgError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ArgErrors {
    type Item = &'a ArgError;
    type IntoIter = std::slice::Iter<'a, ArgError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ArgErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "no argument errors"),
            [only] => write!(f, "{only}"),
            all => {
                write!(f, "{} argument errors:", all.len())?;
                for err in all {
                    write!(f, "\n  {err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ArgErrors {}

/// A defect in how the parser was declared. Raised while building, never
/// while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("alias '{0}' is registered more than once")]
    DuplicateAlias(String),

    #[error("an argument was registered without any aliases")]
    EmptyAliases,

    #[error("list parameter {0} has no separators")]
    EmptySeparators(String),

    #[error("no converter registered for type {type_name}")]
    MissingConverter { type_name: &'static str },

    #[error("the argument chain has no steps")]
    EmptyChain,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Invalid(ArgErrors),

    #[error("failed to write parser output: {0}")]
    Io(#[from] io::Error),

    #[error("cannot block on an async callback inside a tokio runtime; use parse_async instead")]
    BlockingInsideRuntime,

    #[error("argument slot {0} was not bound before the callback")]
    UnboundArgument(usize),
}

impl ParseError {
    /// The collected argument errors, when this is an input failure.
    pub fn arg_errors(&self) -> Option<&ArgErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            Self::Io(_) | Self::BlockingInsideRuntime | Self::UnboundArgument(_) => None,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
