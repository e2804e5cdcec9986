//! Typestate builder that assembles the step chain.
//!
//! Named arguments come first, then positionals, then the remaining
//! arguments; each stage only offers the calls that are legal from it.
//! Every argument builder must be finished with `is_required()`,
//! `is_optional()` or `is_optional_with_default(..)` before the next one
//! can be declared.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use fluent_args_metadata::{GivenHint, Optionality, ParameterInfo, ParameterKind};

use crate::chain::{Append, AsyncTerminal, Bind, Chain, Parser, SyncTerminal, Terminal};
use crate::convert::{ArgEnum, ConversionError, Converter, ConverterRegistry, short_type_name};
use crate::descriptor::{ArgDescriptor, ArgId, IntoAliases, Validator, Value, alias_display_name};
use crate::error::ConfigError;
use crate::settings::{ErrorReporting, HelpFormat, ParserSettings};
use crate::step::{
    Fallback, FlagStep, GivenCondition, GivenStep, HelpStep, ListParameterStep, ParameterStep,
    PositionalStep, RemainingStep, Step,
};

const DEFAULT_SEPARATOR: &str = ",";

/// State shared by every stage: settings, converters, the steps declared so
/// far and the first configuration error.
struct BuilderCore<R> {
    settings: ParserSettings,
    registry: ConverterRegistry,
    steps: Vec<Box<dyn Step>>,
    branches: Vec<Chain<R>>,
    claimed: HashSet<String>,
    next_slot: usize,
    positionals: usize,
    hints: Vec<GivenHint>,
    is_branch: bool,
    error: Option<ConfigError>,
}

impl<R> BuilderCore<R> {
    fn new() -> Self {
        let settings = ParserSettings::default();
        let claimed = settings.help_aliases.iter().cloned().collect();
        Self {
            settings,
            registry: ConverterRegistry::with_builtins(),
            steps: Vec::new(),
            branches: Vec::new(),
            claimed,
            next_slot: 0,
            positionals: 0,
            hints: Vec::new(),
            is_branch: false,
            error: None,
        }
    }

    /// Core for a branch: inherits converters, claimed aliases and slot
    /// numbering, and tags every argument with `hint`.
    fn branch(&self, hint: GivenHint) -> Self {
        let mut hints = self.hints.clone();
        hints.push(hint);
        Self {
            settings: self.settings.clone(),
            registry: self.registry.clone(),
            steps: Vec::new(),
            branches: Vec::new(),
            claimed: self.claimed.clone(),
            next_slot: self.next_slot,
            positionals: self.positionals,
            hints,
            is_branch: true,
            error: None,
        }
    }

    /// Only the first error is kept.
    fn fail(&mut self, error: ConfigError) {
        if self.error.is_none() {
            tracing::debug!(%error, "invalid parser configuration");
            self.error = Some(error);
        }
    }

    fn claim(&mut self, aliases: &[String]) {
        if aliases.is_empty() {
            self.fail(ConfigError::EmptyAliases);
            return;
        }
        for alias in aliases {
            if !self.claimed.insert(alias.clone()) {
                self.fail(ConfigError::DuplicateAlias(alias.clone()));
            }
        }
    }

    fn set_help_aliases(&mut self, aliases: Vec<String>) {
        for alias in &self.settings.help_aliases {
            self.claimed.remove(alias);
        }
        if !aliases.is_empty() {
            self.claim(&aliases);
        }
        self.settings.help_aliases = aliases;
    }

    fn resolve<T: Value>(&mut self, custom: Option<Converter<T>>) -> Option<Converter<T>> {
        let converter = custom.or_else(|| self.registry.get::<T>());
        if converter.is_none() {
            self.fail(ConfigError::MissingConverter {
                type_name: short_type_name::<T>(),
            });
        }
        converter
    }

    fn descriptor<T>(
        &mut self,
        name: String,
        kind: ParameterKind,
        draft: &Draft<T>,
        converter: &Converter<T>,
        optionality: Optionality,
        separators: Vec<String>,
    ) -> ArgDescriptor {
        let id = ArgId::new(self.next_slot, name);
        self.next_slot += 1;
        ArgDescriptor {
            id,
            aliases: draft.aliases.clone(),
            info: ParameterInfo {
                kind,
                aliases: draft.aliases.clone(),
                description: draft.description.clone(),
                type_name: converter.type_name().to_string(),
                optionality,
                separators,
                examples: draft.examples.clone(),
                possible_values: converter.possible_values().to_vec(),
                given_hints: self.hints.clone(),
            },
        }
    }

    fn positional_name(&mut self) -> String {
        self.positionals += 1;
        format!("positional argument #{}", self.positionals)
    }

    fn finish(mut self, terminal: Box<dyn Terminal<R>>) -> Result<Parser<R>, ConfigError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if !self.is_branch {
            if self.steps.is_empty() && self.branches.is_empty() {
                return Err(ConfigError::EmptyChain);
            }
            if !self.settings.help_aliases.is_empty() {
                let help = HelpStep::new(self.settings.help_aliases.clone());
                self.steps.insert(0, Box::new(help));
            }
        }
        tracing::debug!(
            steps = self.steps.len(),
            branches = self.branches.len(),
            branch = self.is_branch,
            "argument chain assembled"
        );
        let mut chain = Chain {
            steps: self.steps,
            branches: self.branches,
            terminal,
            reject_unknown: self.settings.reject_unknown_arguments,
        };
        if !self.is_branch {
            chain.set_reject_unknown(self.settings.reject_unknown_arguments);
        }
        Ok(Parser {
            chain,
            settings: self.settings,
            claimed: self.claimed,
        })
    }
}

/// Per-argument options collected before the argument is finished.
struct Draft<T> {
    aliases: Vec<String>,
    description: Option<String>,
    examples: Vec<String>,
    validators: Vec<Validator<T>>,
    converter: Option<Converter<T>>,
}

impl<T> Draft<T> {
    fn new(aliases: Vec<String>) -> Self {
        Self {
            aliases,
            description: None,
            examples: Vec::new(),
            validators: Vec::new(),
            converter: None,
        }
    }
}

/// Entry stage: settings, named arguments and given branches.
pub struct FluentArgsBuilder<A = (), R = ()> {
    core: BuilderCore<R>,
    marker: PhantomData<fn() -> A>,
}

/// Reached after the first positional; only positionals, the remaining
/// arguments and the terminal call are available.
pub struct PositionalStage<A, R> {
    core: BuilderCore<R>,
    marker: PhantomData<fn() -> A>,
}

/// Reached after the remaining arguments; only the terminal call is left.
pub struct FinalStage<A, R> {
    core: BuilderCore<R>,
    marker: PhantomData<fn() -> A>,
}

trait Stage<R> {
    fn from_core(core: BuilderCore<R>) -> Self;
}

macro_rules! stages {
    ($($stage:ident),*) => {$(
        impl<A, R> Stage<R> for $stage<A, R> {
            fn from_core(core: BuilderCore<R>) -> Self {
                Self {
                    core,
                    marker: PhantomData,
                }
            }
        }
    )*};
}

stages!(FluentArgsBuilder, PositionalStage, FinalStage);

impl<R> FluentArgsBuilder<(), R> {
    pub fn new() -> Self {
        Self::from_core(BuilderCore::new())
    }
}

impl<R> Default for FluentArgsBuilder<(), R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> FluentArgsBuilder<A, R> {
    pub fn with_application_description(mut self, description: impl Into<String>) -> Self {
        self.core.settings.application_description = Some(description.into());
        self
    }

    /// Replace the default `-h`/`--help` aliases.
    pub fn register_help_flag(mut self, aliases: impl IntoAliases) -> Self {
        let aliases = aliases.into_aliases();
        if aliases.is_empty() {
            self.core.fail(ConfigError::EmptyAliases);
            return self;
        }
        self.core.set_help_aliases(aliases);
        self
    }

    pub fn disable_help_flag(mut self) -> Self {
        self.core.set_help_aliases(Vec::new());
        self
    }

    pub fn with_help_format(mut self, format: HelpFormat) -> Self {
        self.core.settings.help_format = format;
        self
    }

    pub fn with_error_reporting(mut self, reporting: ErrorReporting) -> Self {
        self.core.settings.error_reporting = reporting;
        self
    }

    /// Report every token no step consumed as `UnexpectedArgument`.
    pub fn reject_unknown_arguments(mut self) -> Self {
        self.core.settings.reject_unknown_arguments = true;
        self
    }

    pub fn with_line_width(mut self, width: usize) -> Self {
        self.core.settings.line_width = width;
        self
    }

    /// Replace all settings at once, e.g. ones loaded from JSON.
    pub fn with_settings(mut self, settings: ParserSettings) -> Self {
        self.core.set_help_aliases(settings.help_aliases.clone());
        self.core.settings = settings;
        self
    }

    /// Add or replace the registry converter for `T`.
    pub fn register_converter<T, F>(mut self, func: F) -> Self
    where
        T: 'static,
        F: Fn(&str) -> Result<T, ConversionError> + Send + Sync + 'static,
    {
        self.core.registry.register::<T, F>(func);
        self
    }

    pub fn register_enum<E: ArgEnum>(mut self) -> Self {
        self.core.registry.register_enum::<E>();
        self
    }

    /// A value-taking argument: `--alias value` or `--alias=value`.
    pub fn parameter<T: Value>(mut self, aliases: impl IntoAliases) -> ParameterBuilder<A, R, T> {
        let aliases = aliases.into_aliases();
        self.core.claim(&aliases);
        ParameterBuilder {
            core: self.core,
            draft: Draft::new(aliases),
            marker: PhantomData,
        }
    }

    /// A parameter whose value is split into a `Vec<T>`.
    pub fn list_parameter<T: Value>(
        mut self,
        aliases: impl IntoAliases,
    ) -> ListParameterBuilder<A, R, T> {
        let aliases = aliases.into_aliases();
        self.core.claim(&aliases);
        ListParameterBuilder {
            core: self.core,
            draft: Draft::new(aliases),
            separators: vec![DEFAULT_SEPARATOR.to_string()],
            marker: PhantomData,
        }
    }

    /// A boolean switch, `true` when any alias is present.
    pub fn flag(mut self, aliases: impl IntoAliases) -> FlagBuilder<A, R> {
        let aliases = aliases.into_aliases();
        self.core.claim(&aliases);
        FlagBuilder {
            core: self.core,
            aliases,
            description: None,
            marker: PhantomData,
        }
    }

    pub fn positional<T: Value>(mut self) -> PositionalBuilder<A, R, T> {
        let name = self.core.positional_name();
        PositionalBuilder {
            core: self.core,
            draft: Draft::new(Vec::new()),
            name,
            marker: PhantomData,
        }
    }

    pub fn remaining_arguments<T: Value>(self) -> RemainingBuilder<A, R, T> {
        RemainingBuilder::new(self.core)
    }

    /// Continue in a branch when the flag is present.
    ///
    /// The branch callback receives every value declared so far followed by
    /// the branch's own arguments. Arguments declared after this call are
    /// not parsed when the branch is taken.
    pub fn given_flag<F>(mut self, aliases: impl IntoAliases, then: F) -> Self
    where
        F: FnOnce(FluentArgsBuilder<A, R>) -> Result<Parser<R>, ConfigError>,
    {
        let aliases = aliases.into_aliases();
        self.core.claim(&aliases);
        self.given(GivenCondition::Flag { aliases }, then)
    }

    /// Continue in a branch when the alias is followed by exactly `value`.
    ///
    /// The same alias may open several branches with different values.
    pub fn given_parameter_is<F>(
        mut self,
        aliases: impl IntoAliases,
        value: impl Into<String>,
        then: F,
    ) -> Self
    where
        F: FnOnce(FluentArgsBuilder<A, R>) -> Result<Parser<R>, ConfigError>,
    {
        let aliases = aliases.into_aliases();
        if aliases.is_empty() {
            self.core.fail(ConfigError::EmptyAliases);
        }
        let condition = GivenCondition::ParameterIs {
            aliases,
            value: value.into(),
        };
        self.given(condition, then)
    }

    fn given<F>(mut self, condition: GivenCondition, then: F) -> Self
    where
        F: FnOnce(FluentArgsBuilder<A, R>) -> Result<Parser<R>, ConfigError>,
    {
        let branch = FluentArgsBuilder::from_core(self.core.branch(condition.hint()));
        match then(branch) {
            Ok(Parser { chain, claimed, .. }) => {
                // Aliases declared inside the branch stay taken for the rest
                // of the root chain.
                self.core.claimed.extend(claimed);
                let idx = self.core.branches.len();
                self.core.branches.push(chain);
                self.core.steps.push(Box::new(GivenStep::new(condition, idx)));
            }
            Err(error) => self.core.fail(error),
        }
        self
    }
}

impl<A, R> PositionalStage<A, R> {
    pub fn positional<T: Value>(mut self) -> PositionalBuilder<A, R, T> {
        let name = self.core.positional_name();
        PositionalBuilder {
            core: self.core,
            draft: Draft::new(Vec::new()),
            name,
            marker: PhantomData,
        }
    }

    pub fn remaining_arguments<T: Value>(self) -> RemainingBuilder<A, R, T> {
        RemainingBuilder::new(self.core)
    }
}

macro_rules! terminal_calls {
    ($($stage:ident),*) => {$(
        impl<A: Bind, R> $stage<A, R> {
            /// Finish the chain with a synchronous callback.
            ///
            /// A root chain must declare at least one argument or `given`
            /// branch; otherwise this returns [`ConfigError::EmptyChain`].
            /// Branch chains may be empty.
            pub fn call<F>(self, callback: F) -> Result<Parser<R>, ConfigError>
            where
                F: FnMut(A) -> R + Send + 'static,
            {
                self.core.finish(Box::new(SyncTerminal::new(callback)))
            }

            /// Finish the chain with a callback returning a future.
            ///
            /// Fails with [`ConfigError::EmptyChain`] under the same rule as
            /// `call`.
            pub fn call_async<F, Fut>(self, callback: F) -> Result<Parser<R>, ConfigError>
            where
                F: FnMut(A) -> Fut + Send + 'static,
                Fut: Future<Output = R> + Send + 'static,
            {
                self.core.finish(Box::new(AsyncTerminal::new(callback)))
            }
        }
    )*};
}

terminal_calls!(FluentArgsBuilder, PositionalStage, FinalStage);

pub struct ParameterBuilder<A, R, T> {
    core: BuilderCore<R>,
    draft: Draft<T>,
    marker: PhantomData<fn() -> A>,
}

pub struct ListParameterBuilder<A, R, T> {
    core: BuilderCore<R>,
    draft: Draft<T>,
    separators: Vec<String>,
    marker: PhantomData<fn() -> A>,
}

pub struct PositionalBuilder<A, R, T> {
    core: BuilderCore<R>,
    draft: Draft<T>,
    name: String,
    marker: PhantomData<fn() -> A>,
}

pub struct RemainingBuilder<A, R, T> {
    core: BuilderCore<R>,
    draft: Draft<T>,
    marker: PhantomData<fn() -> A>,
}

macro_rules! descriptor_options {
    ($($builder:ident),*) => {$(
        impl<A, R, T: Value> $builder<A, R, T> {
            pub fn with_description(mut self, description: impl Into<String>) -> Self {
                self.draft.description = Some(description.into());
                self
            }

            /// Example values listed in help.
            pub fn with_examples<I, S>(mut self, examples: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.draft.examples = examples.into_iter().map(Into::into).collect();
                self
            }

            /// Reject converted values for which `check` returns `false`.
            /// Validators run in registration order.
            pub fn with_validation<F>(mut self, check: F, message: impl Into<String>) -> Self
            where
                F: Fn(&T) -> bool + Send + Sync + 'static,
            {
                self.draft.validators.push(Validator::new(check, message));
                self
            }

            /// Convert this argument with `func` instead of the registry.
            pub fn with_converter<F>(mut self, func: F) -> Self
            where
                F: Fn(&str) -> Result<T, ConversionError> + Send + Sync + 'static,
            {
                self.draft.converter = Some(Converter::new(short_type_name::<T>(), func));
                self
            }
        }
    )*};
}

descriptor_options!(
    ParameterBuilder,
    ListParameterBuilder,
    PositionalBuilder,
    RemainingBuilder
);

impl<A, R, T> ParameterBuilder<A, R, T>
where
    A: Append<T>,
    T: Value,
{
    pub fn is_required(self) -> FluentArgsBuilder<A::Output, R> {
        self.finish(Fallback::Required, Optionality::Required)
    }

    /// Bind `T::default()` when absent.
    pub fn is_optional(self) -> FluentArgsBuilder<A::Output, R>
    where
        T: Default,
    {
        self.finish(Fallback::Optional(T::default()), Optionality::Optional)
    }

    pub fn is_optional_with_default(self, default: T) -> FluentArgsBuilder<A::Output, R>
    where
        T: fmt::Display,
    {
        let shown = default.to_string();
        self.finish(
            Fallback::Optional(default),
            Optionality::OptionalWithDefault { default: shown },
        )
    }

    fn finish(self, fallback: Fallback<T>, optionality: Optionality) -> FluentArgsBuilder<A::Output, R> {
        let Self { mut core, mut draft, .. } = self;
        if let Some(converter) = core.resolve(draft.converter.take()) {
            let name = alias_display_name(&draft.aliases);
            let desc = core.descriptor(
                name,
                ParameterKind::Parameter,
                &draft,
                &converter,
                optionality,
                Vec::new(),
            );
            core.steps.push(Box::new(ParameterStep {
                desc,
                converter,
                fallback,
                validators: draft.validators,
            }));
        }
        FluentArgsBuilder::from_core(core)
    }
}

impl<A, R, T: Value> ListParameterBuilder<A, R, T> {
    /// Split the value on any of `separators`, replacing the default `,`.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }
}

impl<A, R, T> ListParameterBuilder<A, R, T>
where
    A: Append<Vec<T>>,
    T: Value,
{
    pub fn is_required(self) -> FluentArgsBuilder<A::Output, R> {
        self.finish(Fallback::Required, Optionality::Required)
    }

    /// Bind an empty list when absent.
    pub fn is_optional(self) -> FluentArgsBuilder<A::Output, R> {
        self.finish(Fallback::Optional(Vec::new()), Optionality::Optional)
    }

    /// The default is shown in help joined with the first separator.
    pub fn is_optional_with_default(self, default: Vec<T>) -> FluentArgsBuilder<A::Output, R>
    where
        T: fmt::Display,
    {
        let joiner = self
            .separators
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_SEPARATOR);
        let shown = default
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(joiner);
        self.finish(
            Fallback::Optional(default),
            Optionality::OptionalWithDefault { default: shown },
        )
    }

    fn finish(
        self,
        fallback: Fallback<Vec<T>>,
        optionality: Optionality,
    ) -> FluentArgsBuilder<A::Output, R> {
        let Self {
            mut core,
            mut draft,
            separators,
            ..
        } = self;
        let name = alias_display_name(&draft.aliases);
        if separators.is_empty() {
            core.fail(ConfigError::EmptySeparators(name));
            return FluentArgsBuilder::from_core(core);
        }
        if let Some(converter) = core.resolve(draft.converter.take()) {
            let desc = core.descriptor(
                name,
                ParameterKind::ListParameter,
                &draft,
                &converter,
                optionality,
                separators.clone(),
            );
            core.steps.push(Box::new(ListParameterStep {
                desc,
                converter,
                separators,
                fallback,
                validators: draft.validators,
            }));
        }
        FluentArgsBuilder::from_core(core)
    }
}

impl<A, R, T> PositionalBuilder<A, R, T>
where
    A: Append<T>,
    T: Value,
{
    pub fn is_required(self) -> PositionalStage<A::Output, R> {
        self.finish(Fallback::Required, Optionality::Required)
    }

    pub fn is_optional(self) -> PositionalStage<A::Output, R>
    where
        T: Default,
    {
        self.finish(Fallback::Optional(T::default()), Optionality::Optional)
    }

    pub fn is_optional_with_default(self, default: T) -> PositionalStage<A::Output, R>
    where
        T: fmt::Display,
    {
        let shown = default.to_string();
        self.finish(
            Fallback::Optional(default),
            Optionality::OptionalWithDefault { default: shown },
        )
    }

    fn finish(self, fallback: Fallback<T>, optionality: Optionality) -> PositionalStage<A::Output, R> {
        let Self {
            mut core,
            mut draft,
            name,
            ..
        } = self;
        if let Some(converter) = core.resolve(draft.converter.take()) {
            let desc = core.descriptor(
                name,
                ParameterKind::Positional,
                &draft,
                &converter,
                optionality,
                Vec::new(),
            );
            core.steps.push(Box::new(PositionalStep {
                desc,
                converter,
                fallback,
                validators: draft.validators,
            }));
        }
        PositionalStage::from_core(core)
    }
}

impl<A, R, T: Value> RemainingBuilder<A, R, T> {
    fn new(core: BuilderCore<R>) -> Self {
        Self {
            core,
            draft: Draft::new(Vec::new()),
            marker: PhantomData,
        }
    }
}

impl<A, R, T> RemainingBuilder<A, R, T>
where
    A: Append<Vec<T>>,
    T: Value,
{
    /// Remaining arguments are always optional and bind an empty list when
    /// nothing is left.
    pub fn is_optional(self) -> FinalStage<A::Output, R> {
        let Self {
            mut core,
            mut draft,
            ..
        } = self;
        if let Some(converter) = core.resolve(draft.converter.take()) {
            let desc = core.descriptor(
                "remaining arguments".to_string(),
                ParameterKind::RemainingArguments,
                &draft,
                &converter,
                Optionality::Optional,
                Vec::new(),
            );
            core.steps.push(Box::new(RemainingStep {
                desc,
                converter,
                validators: draft.validators,
            }));
        }
        FinalStage::from_core(core)
    }
}

pub struct FlagBuilder<A, R> {
    core: BuilderCore<R>,
    aliases: Vec<String>,
    description: Option<String>,
    marker: PhantomData<fn() -> A>,
}

impl<A, R> FlagBuilder<A, R>
where
    A: Append<bool>,
{
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Flags are always optional: absent binds `false`.
    pub fn is_optional(self) -> FluentArgsBuilder<A::Output, R> {
        let Self {
            mut core,
            aliases,
            description,
            ..
        } = self;
        let id = ArgId::new(core.next_slot, alias_display_name(&aliases));
        core.next_slot += 1;
        let info = ParameterInfo {
            kind: ParameterKind::Flag,
            aliases: aliases.clone(),
            description,
            type_name: "bool".to_string(),
            optionality: Optionality::Optional,
            given_hints: core.hints.clone(),
            ..Default::default()
        };
        core.steps
            .push(Box::new(FlagStep::new(ArgDescriptor { id, aliases, info })));
        FluentArgsBuilder::from_core(core)
    }
}
