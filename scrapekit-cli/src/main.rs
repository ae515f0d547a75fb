//! scrapekit: adapt scraped records into typed items.
//!
//! Reads one JSON object per line, runs every key through the configured
//! adaptor class and prints the finished item's fields as one JSON line.
//!
//! Usage:
//!   scrapekit --config product.toml < raw.jsonl > items.jsonl

use anyhow::{Context, Result, bail};
use clap::Parser;
use scrapekit_adaptor::{AdaptorClass, AdaptorConfig, ItemAdaptor, StepRegistry};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "scrapekit")]
#[command(about = "Adapt JSON-lines scraped records into typed items")]
struct Args {
    /// Adaptor configuration (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Input file with one JSON object per line (defaults to stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Stop at the first record that fails instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default)]
struct Summary {
    adapted: usize,
    skipped: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    let config = AdaptorConfig::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    let class = config
        .build(&StepRegistry::with_builtins())
        .context("failed to build adaptor class")?;

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let mut out = BufWriter::new(io::stdout().lock());

    let summary = run(&class, reader, &mut out, args.strict)?;
    out.flush()?;

    info!(
        adapted = summary.adapted,
        skipped = summary.skipped,
        "Done"
    );
    Ok(())
}

fn run(
    class: &Arc<AdaptorClass>,
    reader: impl BufRead,
    out: &mut impl Write,
    strict: bool,
) -> Result<Summary> {
    let mut summary = Summary::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.context("failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        match adapt_line(class, &line) {
            Ok(item) => {
                serde_json::to_writer(&mut *out, &item)?;
                out.write_all(b"\n")?;
                summary.adapted += 1;
            }
            Err(e) if strict => bail!("line {line_no}: {e:#}"),
            Err(e) => {
                warn!(line = line_no, error = %format!("{e:#}"), "Skipping record");
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

fn adapt_line(class: &Arc<AdaptorClass>, line: &str) -> Result<Value> {
    let record = match serde_json::from_str::<Value>(line).context("invalid JSON")? {
        Value::Object(map) => map,
        other => bail!("expected a JSON object, got {other}"),
    };
    let item = ItemAdaptor::adapt_record(class, &record)?;
    Ok(item.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrapekit_item::{FieldDef, ItemSchema};

    fn class() -> Arc<AdaptorClass> {
        let schema = ItemSchema::builder("page")
            .field(FieldDef::text("title"))
            .field(FieldDef::integer("views"))
            .build()
            .unwrap();
        AdaptorClass::builder("PageAdaptor")
            .item_schema(schema)
            .field_step("title", scrapekit_adaptor::steps::title_case())
            .field_step("views", scrapekit_adaptor::steps::to_integer())
            .build()
            .unwrap()
    }

    #[test]
    fn adapts_each_line() {
        let input = "{\"title\": \"hello\", \"views\": \"3\"}\n\n{\"title\": \"bye\"}\n";
        let mut out = Vec::new();
        let summary = run(&class(), input.as_bytes(), &mut out, false).unwrap();

        assert_eq!(summary.adapted, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"title\":\"Hello\",\"views\":3}\n{\"title\":\"Bye\"}\n"
        );
    }

    #[test]
    fn skips_bad_records_unless_strict() {
        let input = "{\"views\": \"many\"}\nnot json\n[1]\n{\"title\": \"ok\"}\n";

        let mut out = Vec::new();
        let summary = run(&class(), input.as_bytes(), &mut out, false).unwrap();
        assert_eq!(summary.adapted, 1);
        assert_eq!(summary.skipped, 3);

        let mut out = Vec::new();
        let err = run(&class(), input.as_bytes(), &mut out, true).unwrap_err();
        assert!(err.to_string().starts_with("line 1:"));
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_field_fails_record() {
        assert!(adapt_line(&class(), "{\"author\": \"x\"}").is_err());
    }
}
