use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use yt::config::Config;
use yt::file::loader::load_documents;
use yt::projector::Projector;
use yt::yamlpath::{self, Evaluator};

/// yt, a YAML Tool - extract data from YAML documents using JSONPath
#[derive(Parser)]
#[command(name = "yt")]
#[command(version)]
#[command(about = "yt, a YAML Tool - extract data from YAML documents using JSONPath", long_about = None)]
#[command(override_usage = "yt [OPTIONS] [<path/to/yaml/doc>] <JSONPATH expression>")]
#[command(after_help = "Examples:\n  $ yt foo.yml '$.bar'\n  $ yt '$.bar' < foo.yml | yt '$.*.baz'")]
struct Cli {
    /// YAML file to read (`-` or omitted for stdin), or the expression when
    /// it is the only argument
    #[arg(value_name = "FILE")]
    first: String,

    /// JSONPath expression
    #[arg(value_name = "EXPRESSION")]
    second: Option<String>,

    /// Verbose, enable debug messages on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Config file (default: ~/.config/yt/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Spaces per indentation level in the output
    #[arg(long, value_name = "N")]
    indent: Option<usize>,

    /// How deep a recursive descent (`..`) may go
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Refuse inputs larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    max_input_bytes: Option<u64>,

    /// Query every document of a multi-document stream
    #[arg(long)]
    all_documents: bool,

    /// Skip re-parsing each printed match
    #[arg(long)]
    no_validate: bool,
}

impl Cli {
    /// Splits the positional arguments into (file, expression).
    fn input_and_expression(&self) -> (Option<&str>, &str) {
        match &self.second {
            Some(expr) => (Some(self.first.as_str()), expr.as_str()),
            None => (None, self.first.as_str()),
        }
    }

    /// Loads the config file and applies command-line overrides.
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load(),
        };
        if self.verbose {
            config.verbose = true;
        }
        if let Some(indent) = self.indent {
            config.indent_size = indent;
        }
        if self.max_depth.is_some() {
            config.max_depth = self.max_depth;
        }
        if self.max_input_bytes.is_some() {
            config.max_input_bytes = self.max_input_bytes;
        }
        if self.all_documents {
            config.all_documents = true;
        }
        if self.no_validate {
            config.validate_output = false;
        }
        Ok(config)
    }
}

/// Installs the stderr logger. `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;
    init_logging(config.verbose);
    debug!(?config, "effective configuration");

    let (input, expression) = cli.input_and_expression();

    debug!(expression, "compiling path expression");
    let path = yamlpath::Parser::parse(expression)
        .with_context(|| format!("Invalid path expression '{}'", expression))?;

    debug!(input = input.unwrap_or("-"), "reading input");
    let documents = load_documents(input, config.max_input_bytes)?;
    let selected = if config.all_documents {
        documents.len()
    } else {
        documents.len().min(1)
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (index, doc) in documents.iter().take(selected).enumerate() {
        let matches = Evaluator::new(doc)
            .with_max_depth(config.max_depth)
            .evaluate(&path);
        debug!(document = index, matches = matches.len(), "evaluated path");

        let projector = Projector::new(doc)
            .with_indent(config.indent_size)
            .with_validation(config.validate_output);
        for m in &matches {
            match projector.project(m) {
                Ok(text) => out
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout")?,
                Err(err) => error!(path = %m.path, "Encoding error: {}", err),
            }
        }
    }
    out.flush().context("Failed to write to stdout")?;
    Ok(())
}
