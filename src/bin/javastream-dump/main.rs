//! `javastream-dump`: a thin external collaborator around the library's
//! `Decoder` (§6). Contains no decoding logic of its own — it opens a file,
//! calls into `javastream`, and renders the result either as JSON or as a
//! `comfy-table` table of the top-level fields.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Table};
use javastream::{CountingReader, Decoder, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Table,
}

/// Decode a JVM object-serialization stream and print its contents.
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// The serialized stream to read.
    file: PathBuf,

    /// Output format.
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    format: Format,

    /// Recursion depth guard; defaults to the library's own default (§5).
    #[arg(long = "max-depth")]
    max_depth: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let app = App::parse();

    let file = File::open(&app.file).with_context(|| format!("opening {}", app.file.display()))?;
    let source = CountingReader::new(BufReader::new(file));
    let mut decoder = match app.max_depth {
        Some(limit) => Decoder::with_depth_limit(source, limit),
        None => Decoder::new(source),
    };
    let value = decoder
        .decode()
        .with_context(|| format!("decoding {}", app.file.display()))?;

    match app.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        Format::Table => print_table(&value),
    }
    Ok(())
}

/// Renders the top-level fields of an object value as a table; any other
/// shape (a bare array, a wrapper value, …) falls back to one row holding
/// its JSON rendering, since there are no named fields to tabulate.
fn print_table(value: &Value) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["field", "value"]);
    match value {
        Value::Object { fields, .. } => {
            for (name, field_value) in fields {
                table.add_row(vec![name.to_string(), render_cell(field_value)]);
            }
        }
        other => {
            table.add_row(vec!["value".to_string(), render_cell(other)]);
        }
    }
    println!("{table}");
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.to_string(),
        Value::Ref(handle) => format!("<ref {handle:#x}>"),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unrepresentable>".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::App;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        App::command().debug_assert();
    }
}
