//! Help and error output sinks.
//!
//! Steps report their [`ParameterInfo`] to a [`HelpSink`]; the sink decides
//! how (and whether) to render it once [`HelpSink::finalize`] is called.

use std::io::{self, Write};

use fluent_args_metadata::{GivenHint, HelpMetadata, Optionality, ParameterInfo, ParameterKind};

use crate::error::ArgError;

pub const DEFAULT_LINE_WIDTH: usize = 80;

/// Alias columns longer than this switch the simple layout to one alias
/// column per line.
const MAX_ALIGNED_NAME_WIDTH: usize = 25;
const INDENT: &str = "    ";

pub trait HelpSink {
    fn application_description(&mut self, description: &str) -> io::Result<()>;

    fn parameter(&mut self, info: &ParameterInfo) -> io::Result<()>;

    fn parsing_errors(&mut self, errors: &[ArgError]) -> io::Result<()>;

    fn finalize(&mut self) -> io::Result<()>;
}

/// Renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledHelp;

impl HelpSink for DisabledHelp {
    fn application_description(&mut self, _description: &str) -> io::Result<()> {
        Ok(())
    }

    fn parameter(&mut self, _info: &ParameterInfo) -> io::Result<()> {
        Ok(())
    }

    fn parsing_errors(&mut self, _errors: &[ArgError]) -> io::Result<()> {
        Ok(())
    }

    fn finalize(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Plain-text renderer that wraps descriptions at a fixed width.
pub struct SimpleHelp<W> {
    out: W,
    width: usize,
    help_hint: Option<String>,
    rows: Vec<(String, String)>,
}

impl<W: Write> SimpleHelp<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            width: DEFAULT_LINE_WIDTH,
            help_hint: None,
            rows: Vec::new(),
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(INDENT.len() + 1);
        self
    }

    /// Alias suggested after parsing errors, e.g. `--help`.
    pub fn with_help_hint(mut self, alias: impl Into<String>) -> Self {
        self.help_hint = Some(alias.into());
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines<I, S>(&mut self, lines: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            writeln!(self.out, "{}", line.as_ref())?;
        }
        Ok(())
    }
}

impl<W: Write> HelpSink for SimpleHelp<W> {
    fn application_description(&mut self, description: &str) -> io::Result<()> {
        let lines = split_line(description, self.width);
        self.write_lines(lines)?;
        writeln!(self.out)
    }

    fn parameter(&mut self, info: &ParameterInfo) -> io::Result<()> {
        self.rows.push((alias_column(info), describe(info)));
        Ok(())
    }

    fn parsing_errors(&mut self, errors: &[ArgError]) -> io::Result<()> {
        for err in errors {
            writeln!(self.out, "error: {err}")?;
        }
        if let Some(alias) = &self.help_hint {
            writeln!(self.out, "Run with {alias} to see available arguments.")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> io::Result<()> {
        let rows = std::mem::take(&mut self.rows);
        let Some(max_name) = rows.iter().map(|(name, _)| name.chars().count()).max() else {
            return self.out.flush();
        };

        if max_name > MAX_ALIGNED_NAME_WIDTH {
            for (name, description) in &rows {
                let names = split_line(name, self.width);
                let descriptions: Vec<String> = split_line(description, self.width - INDENT.len())
                    .into_iter()
                    .map(|l| format!("{INDENT}{l}"))
                    .collect();
                self.write_lines(names)?;
                self.write_lines(descriptions)?;
            }
        } else {
            let separator = " ";
            let description_width = self
                .width
                .saturating_sub(max_name + separator.len())
                .max(1);
            let prefix = " ".repeat(max_name + separator.len());
            for (name, description) in &rows {
                let lines = split_line(description, description_width);
                let mut lines = lines.iter();
                let first = lines.next().map(String::as_str).unwrap_or_default();
                let head = format!("{name:max_name$}{separator}{first}");
                writeln!(self.out, "{}", head.trim_end())?;
                for line in lines {
                    writeln!(self.out, "{prefix}{line}")?;
                }
            }
        }
        self.out.flush()
    }
}

/// Collects everything into [`HelpMetadata`] and writes it as JSON.
pub struct JsonHelp<W> {
    out: W,
    metadata: HelpMetadata,
}

impl<W: Write> JsonHelp<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            metadata: HelpMetadata::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> HelpSink for JsonHelp<W> {
    fn application_description(&mut self, description: &str) -> io::Result<()> {
        self.metadata.description = Some(description.to_string());
        Ok(())
    }

    fn parameter(&mut self, info: &ParameterInfo) -> io::Result<()> {
        self.metadata.parameters.push(info.clone());
        Ok(())
    }

    fn parsing_errors(&mut self, errors: &[ArgError]) -> io::Result<()> {
        self.metadata
            .errors
            .extend(errors.iter().map(ToString::to_string));
        Ok(())
    }

    fn finalize(&mut self) -> io::Result<()> {
        let metadata = std::mem::take(&mut self.metadata);
        if metadata.is_empty() {
            return Ok(());
        }
        self.out.write_all(&metadata.to_json_bytes())?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// Aliases ordered short to long, e.g. `-n, --name`.
fn stringify_aliases(aliases: &[String]) -> String {
    let mut sorted: Vec<&str> = aliases.iter().map(String::as_str).collect();
    sorted.sort_by_key(|a| a.len());
    sorted.join(", ")
}

fn alias_column(info: &ParameterInfo) -> String {
    match info.kind {
        ParameterKind::Positional => "[ARG]".to_string(),
        ParameterKind::RemainingArguments => "[...]".to_string(),
        ParameterKind::Flag | ParameterKind::Parameter | ParameterKind::ListParameter => {
            stringify_aliases(&info.aliases)
        }
    }
}

fn given_hints_sentence(hints: &[GivenHint]) -> String {
    let parts: Vec<String> = hints
        .iter()
        .rev()
        .map(|h| format!("{} {}", h.shortest_alias(), h.description))
        .collect();
    match parts.split_last() {
        None => String::new(),
        Some((last, [])) => format!("Only available if {last}. "),
        Some((last, rest)) => format!("Only available if {} and {last}. ", rest.join(", ")),
    }
}

fn optionality_prefix(optionality: &Optionality) -> String {
    match optionality {
        Optionality::Required => String::new(),
        Optionality::Optional => "Optional. ".to_string(),
        Optionality::OptionalWithDefault { default } => {
            format!("Optional with default '{default}'. ")
        }
    }
}

/// The description column for one argument.
fn describe(info: &ParameterInfo) -> String {
    let mut out = String::new();

    if info.kind == ParameterKind::Flag {
        out.push_str(&given_hints_sentence(&info.given_hints));
        out.push_str(info.description.as_deref().unwrap_or("A flag"));
        return out;
    }

    if info.kind == ParameterKind::Positional && !info.optionality.is_optional() {
        out.push_str("Positional argument. ");
    }
    out.push_str(&optionality_prefix(&info.optionality));
    out.push_str(&given_hints_sentence(&info.given_hints));

    match &info.description {
        Some(description) => {
            out.push_str(description);
            out.push(' ');
        }
        None if info.kind == ParameterKind::RemainingArguments => {
            out.push_str(&format!(
                "All remaining arguments are parsed. Type: {} ",
                info.type_name
            ));
        }
        None => out.push_str(&format!("Type: {} ", info.type_name)),
    }

    if !info.examples.is_empty() {
        out.push_str(&format!("Examples: {}. ", info.examples.join(", ")));
    } else if !info.possible_values.is_empty() {
        out.push_str(&format!(
            "Possible values: {}. ",
            info.possible_values.join(", ")
        ));
    }

    if info.kind == ParameterKind::ListParameter {
        match info.separators.as_slice() {
            [] => {}
            [only] => out.push_str(&format!(
                "Multiple values can be used by joining them with the separator '{only}'."
            )),
            many => out.push_str(&format!(
                "Multiple values can be used by joining them with any of the following separators: {}",
                many.join(" ")
            )),
        }
    }

    out.trim_end().to_string()
}

/// Break `line` into chunks of at most `width` characters, preferring to
/// break after a space.
fn split_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rest: Vec<char> = line.chars().collect();
    let mut out = Vec::new();
    while rest.len() > width {
        let take = rest[..width]
            .iter()
            .rposition(|c| *c == ' ')
            .map_or(width, |idx| idx + 1);
        let chunk: String = rest.drain(..take).collect();
        out.push(chunk.trim_end().to_string());
    }
    if !rest.is_empty() {
        out.push(rest.into_iter().collect());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ArgId;

    fn param(aliases: &[&str], description: &str) -> ParameterInfo {
        ParameterInfo {
            kind: ParameterKind::Parameter,
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            description: Some(description.to_string()),
            type_name: "String".to_string(),
            ..Default::default()
        }
    }

    fn render(infos: &[ParameterInfo]) -> String {
        let mut sink = SimpleHelp::new(Vec::new());
        for info in infos {
            sink.parameter(info).unwrap();
        }
        sink.finalize().unwrap();
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn split_line_prefers_spaces() {
        assert_eq!(split_line("aaa bbb ccc", 8), ["aaa bbb", "ccc"]);
        assert_eq!(split_line("abcdefghij", 4), ["abcd", "efgh", "ij"]);
        assert!(split_line("", 10).is_empty());
    }

    #[test]
    fn short_aliases_are_aligned_in_one_column() {
        let text = render(&[
            param(&["--name", "-n"], "The name."),
            param(&["--age"], "The age."),
        ]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["-n, --name The name.", "--age      The age."]);
    }

    #[test]
    fn long_descriptions_wrap_under_the_description_column() {
        let long = "word ".repeat(30);
        let text = render(&[param(&["--x"], long.trim_end())]);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= DEFAULT_LINE_WIDTH));
        assert!(lines[1].starts_with("    word"));
    }

    #[test]
    fn long_alias_columns_fall_back_to_indented_layout() {
        let text = render(&[
            param(&["--a-really-long-parameter-name"], "Long."),
            param(&["-s"], "Short."),
        ]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            ["--a-really-long-parameter-name", "    Long.", "-s", "    Short."]
        );
    }

    #[test]
    fn zero_parameters_finalize_to_nothing() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn descriptions_include_optionality_hints_and_examples() {
        let info = ParameterInfo {
            kind: ParameterKind::Parameter,
            aliases: vec!["--age".to_string()],
            type_name: "i32".to_string(),
            optionality: Optionality::OptionalWithDefault {
                default: "1729".to_string(),
            },
            examples: vec!["28".to_string(), "42".to_string()],
            given_hints: vec![
                GivenHint::new(vec!["--mode".to_string()], "is 'fast'"),
                GivenHint::new(vec!["-v".to_string(), "--verbose".to_string()], "is set"),
            ],
            ..Default::default()
        };
        assert_eq!(
            describe(&info),
            "Optional with default '1729'. Only available if -v is set and --mode is 'fast'. \
             Type: i32 Examples: 28, 42."
        );
    }

    #[test]
    fn list_and_flag_descriptions() {
        let list = ParameterInfo {
            kind: ParameterKind::ListParameter,
            aliases: vec!["--ids".to_string()],
            type_name: "u32".to_string(),
            optionality: Optionality::Optional,
            separators: vec![",".to_string()],
            ..Default::default()
        };
        assert_eq!(
            describe(&list),
            "Optional. Type: u32 Multiple values can be used by joining them with the separator ','."
        );

        let flag = ParameterInfo {
            kind: ParameterKind::Flag,
            aliases: vec!["-v".to_string()],
            type_name: "bool".to_string(),
            ..Default::default()
        };
        assert_eq!(describe(&flag), "A flag");
    }

    #[test]
    fn parsing_errors_are_listed_with_hint() {
        let mut sink = SimpleHelp::new(Vec::new()).with_help_hint("--help");
        sink.parsing_errors(&[ArgError::MissingRequiredArgument(ArgId::new(0, "--name"))])
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "error: missing required argument: --name\nRun with --help to see available arguments.\n"
        );
    }

    #[test]
    fn json_sink_writes_metadata() {
        let mut sink = JsonHelp::new(Vec::new());
        sink.application_description("demo").unwrap();
        sink.parameter(&param(&["--name"], "The name.")).unwrap();
        sink.finalize().unwrap();
        let meta = HelpMetadata::from_json_slice(&sink.into_inner()).unwrap();
        assert_eq!(meta.description.as_deref(), Some("demo"));
        assert_eq!(meta.parameters[0].aliases, ["--name"]);
    }
}
