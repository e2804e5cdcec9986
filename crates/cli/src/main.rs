use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use fluent_args::{
    ArgEnum, ConfigError, FluentArgsBuilder, Outcome, ParseError, Parser, ParserSettings,
};
use tracing_subscriber::{EnvFilter, fmt as subscriber_fmt};

/// JSON-encoded `ParserSettings` overriding the built-in defaults.
const SETTINGS_ENV: &str = "FLUENTARGS_SETTINGS";
const DESCRIPTION: &str = "Greets people from the command line.";
/// Exit code for rejected arguments.
const EXIT_USAGE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Plain,
    Json,
}

impl ArgEnum for Format {
    fn variants() -> &'static [Self] {
        &[Format::Plain, Format::Json]
    }

    fn name(&self) -> &'static str {
        match self {
            Format::Plain => "plain",
            Format::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct Request {
    name: String,
    age: u32,
    greeting: String,
    verbose: bool,
    tags: Vec<String>,
    format: Format,
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = load_settings()?;
    let mut parser = build_parser(settings).context("invalid argument declaration")?;

    let outcome = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(parser.parse_env_async());

    match outcome {
        Ok(Outcome::Completed(result)) => result,
        Ok(Outcome::HelpShown) => Ok(()),
        Err(ParseError::Invalid(errors)) => {
            tracing::debug!(errors = errors.len(), "arguments rejected");
            std::process::exit(EXIT_USAGE);
        }
        Err(err) => Err(err).context("failed to parse arguments"),
    }
}

fn load_settings() -> Result<ParserSettings> {
    let mut settings = match std::env::var(SETTINGS_ENV) {
        Ok(raw) => ParserSettings::from_json(&raw)
            .with_context(|| format!("{SETTINGS_ENV} is not valid settings JSON"))?,
        Err(_) => ParserSettings::default(),
    };
    if settings.application_description.is_none() {
        settings.application_description = Some(DESCRIPTION.to_string());
    }
    Ok(settings)
}

fn build_parser(settings: ParserSettings) -> Result<Parser<Result<()>>, ConfigError> {
    FluentArgsBuilder::new()
        .with_settings(settings)
        .register_enum::<Format>()
        .given_flag("--version", |branch| {
            branch.call_async(|()| async {
                println!("fluentargs {}", env!("CARGO_PKG_VERSION"));
                Ok::<_, anyhow::Error>(())
            })
        })
        .parameter::<String>(["-n", "--name"])
        .with_description("Who to greet.")
        .with_examples(["beni", "Ada"])
        .is_required()
        .parameter::<u32>(["-a", "--age"])
        .with_description("Age of the person, mentioned when given.")
        .with_validation(|age| *age < 150, "must be below 150")
        .is_optional()
        .parameter::<String>(["-g", "--greeting"])
        .is_optional_with_default("Hello".to_string())
        .flag(["-v", "--verbose"])
        .with_description("Print what was parsed.")
        .is_optional()
        .list_parameter::<String>(["-t", "--tags"])
        .with_description("Tags attached to the greeting.")
        .with_separators([",", ";"])
        .is_optional()
        .parameter::<Format>(["-f", "--format"])
        .is_optional_with_default(Format::Plain)
        .remaining_arguments::<PathBuf>()
        .with_description("Files mentioned after the greeting.")
        .is_optional()
        .call_async(|(name, age, greeting, verbose, tags, format, files)| {
            greet(Request {
                name,
                age,
                greeting,
                verbose,
                tags,
                format,
                files,
            })
        })
}

async fn greet(request: Request) -> Result<()> {
    if request.verbose {
        tracing::info!(
            name = %request.name,
            tags = request.tags.len(),
            files = request.files.len(),
            "arguments parsed"
        );
    }

    match request.format {
        Format::Plain => {
            let mut line = format!("{}, {}!", request.greeting, request.name);
            if request.age > 0 {
                line.push_str(&format!(" You are {}.", request.age));
            }
            println!("{line}");
            if !request.tags.is_empty() {
                println!("tags: {}", request.tags.join(", "));
            }
            for file in &request.files {
                println!("file: {}", file.display());
            }
        }
        Format::Json => {
            let files: Vec<String> = request
                .files
                .iter()
                .map(|f| f.display().to_string())
                .collect();
            let doc = serde_json::json!({
                "greeting": request.greeting,
                "name": request.name,
                "age": request.age,
                "tags": request.tags,
                "files": files,
            });
            let text = serde_json::to_string_pretty(&doc).context("failed to encode output")?;
            println!("{text}");
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    subscriber_fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
