//! Fluent command-line argument binding.
//!
//! Arguments are declared with [`FluentArgsBuilder`], which assembles a
//! chain of matching steps and ends in a callback. Each parse walks the
//! chain once over a fresh [`ParseState`], converts and validates every
//! value, and then either invokes the callback with one tuple element per
//! declared argument, renders help, or reports every problem at once:
//!
//! ```no_run
//! use fluent_args::FluentArgsBuilder;
//!
//! let mut parser = FluentArgsBuilder::new()
//!     .parameter::<String>(["-n", "--name"])
//!     .with_description("Who to greet.")
//!     .is_required()
//!     .parameter::<u32>("--age")
//!     .is_optional()
//!     .call(|(name, age): (String, u32)| format!("{name} is {age}"))?;
//!
//! let outcome = parser.parse(["--name", "beni", "--age", "28"])?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Modules:
//! - `convert`: `TypeId`-keyed converter registry
//! - `state`: the mutable parse state shared by all steps
//! - `step`: one matching step per declared argument
//! - `chain`: the driver and the reusable [`Parser`]
//! - `help`: help sinks (disabled, simple text, JSON)
//! - `builder`: the typestate builder

pub mod builder;
pub mod chain;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod help;
pub mod settings;
pub mod state;
pub mod step;

pub use builder::{
    FinalStage, FlagBuilder, FluentArgsBuilder, ListParameterBuilder, ParameterBuilder,
    PositionalBuilder, PositionalStage, RemainingBuilder,
};
pub use chain::{Append, Bind, Outcome, Parser};
pub use convert::{ArgEnum, ConversionError, Converter, ConverterRegistry};
pub use descriptor::{ArgId, IntoAliases, Validator, Value};
pub use error::{ArgError, ArgErrors, ConfigError, ParseError, ParseResult};
pub use help::{DisabledHelp, HelpSink, JsonHelp, SimpleHelp};
pub use settings::{ErrorReporting, HelpFormat, ParserSettings};
pub use state::{BoundValues, ParseState};

pub use fluent_args_metadata::{GivenHint, HelpMetadata, Optionality, ParameterInfo, ParameterKind};
