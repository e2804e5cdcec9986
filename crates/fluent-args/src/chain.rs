//! The chain driver: walks the steps once per parse and decides between
//! invoking the callback, rendering help, and reporting failure.

use std::collections::HashSet;
use std::io;
use std::marker::PhantomData;

use futures_util::future::BoxFuture;

use crate::descriptor::Value;
use crate::error::{ArgError, ArgErrors, ParseError, ParseResult};
use crate::help::HelpSink;
use crate::settings::{ErrorReporting, ParserSettings};
use crate::state::{BoundValues, ParseState};
use crate::step::{Flow, Step};

/// Typed view of the bound values: one tuple element per slot, in
/// declaration order.
pub trait Bind: Sized + 'static {
    fn bind(values: &mut BoundValues) -> Result<Self, usize>;
}

/// Type-level `push` used by the builder to grow the callback tuple.
pub trait Append<T> {
    type Output;
}

macro_rules! tuple_impls {
    ($( ($($name:ident $idx:tt),*) )*) => {$(
        impl<$($name: Value),*> Bind for ($($name,)*) {
            #[allow(unused_variables)]
            fn bind(values: &mut BoundValues) -> Result<Self, usize> {
                Ok(($(values.take::<$name>($idx).ok_or($idx as usize)?,)*))
            }
        }
    )*};
}

macro_rules! append_impls {
    ($( ($($name:ident),*) )*) => {$(
        impl<$($name,)* T> Append<T> for ($($name,)*) {
            type Output = ($($name,)* T,);
        }
    )*};
}

tuple_impls! {
    ()
    (A 0)
    (A 0, B 1)
    (A 0, B 1, C 2)
    (A 0, B 1, C 2, D 3)
    (A 0, B 1, C 2, D 3, E 4)
    (A 0, B 1, C 2, D 3, E 4, F 5)
    (A 0, B 1, C 2, D 3, E 4, F 5, G 6)
    (A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7)
    (A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8)
    (A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9)
    (A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10)
    (A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11)
}

append_impls! {
    ()
    (A)
    (A, B)
    (A, B, C)
    (A, B, C, D)
    (A, B, C, D, E)
    (A, B, C, D, E, F)
    (A, B, C, D, E, F, G)
    (A, B, C, D, E, F, G, H)
    (A, B, C, D, E, F, G, H, I)
    (A, B, C, D, E, F, G, H, I, J)
    (A, B, C, D, E, F, G, H, I, J, K)
}

/// Result of invoking the completion callback.
pub(crate) enum Invocation<R> {
    Ready(R),
    Pending(BoxFuture<'static, R>),
}

pub(crate) trait Terminal<R>: Send {
    /// `Err(slot)` when a slot the callback needs was never bound.
    fn invoke(&mut self, bound: BoundValues) -> Result<Invocation<R>, usize>;
}

pub(crate) struct SyncTerminal<A, F> {
    callback: F,
    marker: PhantomData<fn(A)>,
}

impl<A, F> SyncTerminal<A, F> {
    pub(crate) fn new(callback: F) -> Self {
        Self {
            callback,
            marker: PhantomData,
        }
    }
}

impl<A, F, R> Terminal<R> for SyncTerminal<A, F>
where
    A: Bind,
    F: FnMut(A) -> R + Send,
{
    fn invoke(&mut self, mut bound: BoundValues) -> Result<Invocation<R>, usize> {
        let args = A::bind(&mut bound)?;
        Ok(Invocation::Ready((self.callback)(args)))
    }
}

pub(crate) struct AsyncTerminal<A, F> {
    callback: F,
    marker: PhantomData<fn(A)>,
}

impl<A, F> AsyncTerminal<A, F> {
    pub(crate) fn new(callback: F) -> Self {
        Self {
            callback,
            marker: PhantomData,
        }
    }
}

impl<A, F, Fut, R> Terminal<R> for AsyncTerminal<A, F>
where
    A: Bind,
    F: FnMut(A) -> Fut + Send,
    Fut: Future<Output = R> + Send + 'static,
{
    fn invoke(&mut self, mut bound: BoundValues) -> Result<Invocation<R>, usize> {
        use futures_util::FutureExt;

        let args = A::bind(&mut bound)?;
        Ok(Invocation::Pending((self.callback)(args).boxed()))
    }
}

/// How one walk of a chain ended.
pub(crate) enum Finished<R> {
    Invoked(Invocation<R>),
    Help,
    Failed(Vec<ArgError>),
}

pub(crate) struct Chain<R> {
    pub(crate) steps: Vec<Box<dyn Step>>,
    pub(crate) branches: Vec<Chain<R>>,
    pub(crate) terminal: Box<dyn Terminal<R>>,
    pub(crate) reject_unknown: bool,
}

impl<R> Chain<R> {
    fn run(&mut self, state: &mut ParseState) -> ParseResult<Finished<R>> {
        for step in &self.steps {
            tracing::trace!(remaining = state.remaining().len(), "executing step");
            if let Flow::Divert(idx) = step.execute(state) {
                match self.branches.get_mut(idx) {
                    Some(branch) => {
                        tracing::debug!(branch = idx, "walk diverted into branch");
                        return branch.run(state);
                    }
                    None => tracing::warn!(branch = idx, "step diverted to an unknown branch"),
                }
            }
        }

        if self.reject_unknown {
            for token in state.drain_remaining() {
                state.push_error(ArgError::UnexpectedArgument(token));
            }
        }

        if state.help_requested() {
            return Ok(Finished::Help);
        }
        if state.has_errors() {
            return Ok(Finished::Failed(state.take_errors()));
        }

        self.terminal
            .invoke(state.take_bound())
            .map(Finished::Invoked)
            .map_err(ParseError::UnboundArgument)
    }

    /// Strictness is a whole-parser setting; branches follow their root.
    pub(crate) fn set_reject_unknown(&mut self, reject: bool) {
        self.reject_unknown = reject;
        for branch in &mut self.branches {
            branch.set_reject_unknown(reject);
        }
    }

    fn describe(&self, sink: &mut dyn HelpSink) -> io::Result<()> {
        for step in &self.steps {
            step.describe(sink)?;
            if let Some(branch) = step.branch().and_then(|idx| self.branches.get(idx)) {
                branch.describe(sink)?;
            }
        }
        Ok(())
    }
}

/// Outcome of a parse that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    /// The callback ran and returned this value.
    Completed(R),
    /// Help was requested and rendered; the callback did not run.
    HelpShown,
}

impl<R> Outcome<R> {
    pub fn completed(self) -> Option<R> {
        match self {
            Self::Completed(value) => Some(value),
            Self::HelpShown => None,
        }
    }

    pub fn is_help(&self) -> bool {
        matches!(self, Self::HelpShown)
    }
}

/// A fully configured argument parser.
///
/// Built once by [`crate::FluentArgsBuilder`] and reusable for any number
/// of parse calls; every call gets a fresh [`ParseState`].
pub struct Parser<R> {
    pub(crate) chain: Chain<R>,
    pub(crate) settings: ParserSettings,
    /// Aliases taken by this parser, its branches included.
    pub(crate) claimed: HashSet<String>,
}

enum Evaluated<R> {
    Invoked(Invocation<R>),
    Help,
}

impl<R> Parser<R> {
    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Report the application description and every argument to `sink`,
    /// then finalize it.
    pub fn write_help(&self, sink: &mut dyn HelpSink) -> io::Result<()> {
        if let Some(description) = &self.settings.application_description {
            sink.application_description(description)?;
        }
        self.chain.describe(sink)?;
        sink.finalize()
    }

    /// Parse `args` and run the callback, blocking until it completes.
    ///
    /// Help goes to stdout and errors to stderr, as configured by the
    /// parser settings. An async callback is driven on a private
    /// current-thread runtime, so this must not be called from inside a
    /// tokio runtime.
    pub fn parse<I, S>(&mut self, args: I) -> ParseResult<Outcome<R>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let evaluated = self.evaluate(args, None)?;
        finish_blocking(evaluated)
    }

    /// Like [`Parser::parse`], rendering help and errors into `sink`.
    pub fn parse_with<I, S>(&mut self, args: I, sink: &mut dyn HelpSink) -> ParseResult<Outcome<R>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let evaluated = self.evaluate(args, Some(sink))?;
        finish_blocking(evaluated)
    }

    /// Parse the process arguments, skipping the program name.
    pub fn parse_env(&mut self) -> ParseResult<Outcome<R>> {
        self.parse(std::env::args().skip(1))
    }

    /// Parse `args` and await the callback.
    pub async fn parse_async<I, S>(&mut self, args: I) -> ParseResult<Outcome<R>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let evaluated = self.evaluate(args, None)?;
        finish_async(evaluated).await
    }

    /// Like [`Parser::parse_async`], rendering help and errors into `sink`.
    pub async fn parse_async_with<I, S>(
        &mut self,
        args: I,
        sink: &mut (dyn HelpSink + Send),
    ) -> ParseResult<Outcome<R>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let evaluated = self.evaluate(args, Some(sink as &mut dyn HelpSink))?;
        finish_async(evaluated).await
    }

    pub async fn parse_env_async(&mut self) -> ParseResult<Outcome<R>> {
        // `std::env::Args` is not `Send`; collect before the first await.
        let args: Vec<String> = std::env::args().skip(1).collect();
        self.parse_async(args).await
    }

    /// Walk the chain once and render whatever the result calls for.
    fn evaluate<I, S>(&mut self, args: I, sink: Option<&mut dyn HelpSink>) -> ParseResult<Evaluated<R>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = ParseState::new(args);
        tracing::debug!(
            tokens = state.remaining().len(),
            steps = self.chain.steps.len(),
            "walking argument chain"
        );

        match self.chain.run(&mut state)? {
            Finished::Invoked(invocation) => {
                tracing::debug!("arguments bound; invoking callback");
                Ok(Evaluated::Invoked(invocation))
            }
            Finished::Help => {
                match sink {
                    Some(sink) => self.write_help(sink)?,
                    None => self.write_help(&mut *self.settings.sink(io::stdout().lock()))?,
                }
                Ok(Evaluated::Help)
            }
            Finished::Failed(errors) => {
                tracing::debug!(errors = errors.len(), "argument parsing failed");
                match sink {
                    Some(sink) => self.report(&errors, sink)?,
                    None => self.report(&errors, &mut *self.settings.sink(io::stderr().lock()))?,
                }
                Err(ParseError::Invalid(ArgErrors::from(errors)))
            }
        }
    }

    fn report(&self, errors: &[ArgError], sink: &mut dyn HelpSink) -> io::Result<()> {
        match self.settings.error_reporting {
            ErrorReporting::Silent => Ok(()),
            ErrorReporting::Errors => {
                sink.parsing_errors(errors)?;
                sink.finalize()
            }
            ErrorReporting::ErrorsWithHelp => {
                sink.parsing_errors(errors)?;
                self.write_help(sink)
            }
        }
    }
}

fn finish_blocking<R>(evaluated: Evaluated<R>) -> ParseResult<Outcome<R>> {
    match evaluated {
        Evaluated::Help => Ok(Outcome::HelpShown),
        Evaluated::Invoked(Invocation::Ready(value)) => Ok(Outcome::Completed(value)),
        Evaluated::Invoked(Invocation::Pending(future)) => {
            if tokio::runtime::Handle::try_current().is_ok() {
                return Err(ParseError::BlockingInsideRuntime);
            }
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            Ok(Outcome::Completed(runtime.block_on(future)))
        }
    }
}

async fn finish_async<R>(evaluated: Evaluated<R>) -> ParseResult<Outcome<R>> {
    match evaluated {
        Evaluated::Help => Ok(Outcome::HelpShown),
        Evaluated::Invoked(Invocation::Ready(value)) => Ok(Outcome::Completed(value)),
        Evaluated::Invoked(Invocation::Pending(future)) => Ok(Outcome::Completed(future.await)),
    }
}
