//! CLI: get / set / merge / fmt over JSON documents
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::{debug, info};
use rayon::prelude::*;

use dynjson::{JsonValue, PathKey};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// read, write, merge and normalize JSON documents
#[derive(Parser, Debug)]
#[command(name = "dynjson", version)]
pub struct CommandLineInterface {
    /// debug logging (same as RUST_LOG=debug)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the value at a path
    Get(GetArgs),
    /// write a value at a path and print the updated document
    Set(SetArgs),
    /// deep-merge documents left to right
    Merge(MergeArgs),
    /// re-emit documents with sorted keys
    Fmt(FmtArgs),
}

#[derive(Args, Debug, Clone)]
struct PathSettings {
    /// dot-separated path; all-digit segments index arrays (e.g. users.0.name)
    #[arg(long, short, default_value = "")]
    path: String,

    /// match object keys case-insensitively
    #[arg(long, default_value_t = false)]
    ignore_case: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    Bool,
    Int,
    Float,
    String,
}

#[derive(clap::Parser, Debug)]
struct GetArgs {
    /// input document
    input: PathBuf,

    #[command(flatten)]
    path_settings: PathSettings,

    /// coerce the result to a scalar type
    #[arg(long = "as", value_enum)]
    as_type: Option<ScalarType>,

    /// descend into string elements that hold an embedded JSON document
    #[arg(long, default_value_t = false)]
    parse_embedded: bool,

    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(clap::Parser, Debug)]
struct SetArgs {
    /// input document
    input: PathBuf,

    #[command(flatten)]
    path_settings: PathSettings,

    /// new value as JSON text; anything that is not valid JSON is taken as a string
    #[arg(long)]
    value: String,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(clap::Parser, Debug)]
struct MergeArgs {
    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(clap::Parser, Debug)]
struct FmtArgs {
    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// report files that are not formatted instead of printing them
    #[arg(long, default_value_t = false)]
    check: bool,

    /// rewrite each file in place
    #[arg(long, default_value_t = false, conflicts_with = "check")]
    write: bool,

    #[arg(long, default_value_t = false)]
    pretty: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn init_logging(&self) {
        let default_filter = if self.verbose { "debug" } else { "warn" };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
            .init();
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Get(target) => target.run(),
            Command::Set(target) => target.run(),
            Command::Merge(target) => target.run(),
            Command::Fmt(target) => target.run(),
        }
    }
}

impl GetArgs {
    fn run(&self) -> anyhow::Result<()> {
        let doc = load_document(&self.input)?;
        let value = lookup(&doc, &self.path_settings, self.parse_embedded);
        let path = &self.path_settings.path;
        if let Some(kind) = value.error() {
            bail!("no value at '{path}': {kind}");
        }
        let rendered = match self.as_type {
            None if value.is_array() || value.is_object() => value.to_json_string(self.pretty)?,
            None => value.to_string(),
            Some(as_type) => coerce_to_text(&value, as_type)
                .with_context(|| format!("value at '{path}' is not a valid {as_type:?}"))?,
        };
        println!("{rendered}");
        Ok(())
    }
}

impl SetArgs {
    fn run(&self) -> anyhow::Result<()> {
        let mut doc = load_document(&self.input)?;
        let path = parse_path(&self.path_settings.path);
        let new = parse_value_arg(&self.value);
        let written = match path.as_slice() {
            [PathKey::Key(key)] if self.path_settings.ignore_case => doc.set_ignore_case(key, new),
            _ => doc.set_path(&path, new),
        };
        if !written {
            bail!("cannot write at '{}' in {}", self.path_settings.path, self.input.display());
        }
        write_output(self.out.as_deref(), &doc.to_json_string(self.pretty)?)
    }
}

impl MergeArgs {
    fn run(&self) -> anyhow::Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let documents = source_paths
            .par_iter()
            .map(|source_path| load_document(source_path))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut documents = source_paths.iter().zip(documents);
        let Some((_, mut merged)) = documents.next() else {
            bail!("nothing to merge");
        };
        for (source_path, overlay) in documents {
            info!("merging {}", source_path.display());
            merged
                .merge(&overlay)
                .with_context(|| format!("failed to merge {}", source_path.display()))?;
        }
        write_output(self.out.as_deref(), &merged.to_json_string(self.pretty)?)
    }
}

enum FmtOutcome {
    Formatted,
    Changed(String),
}

impl FmtArgs {
    fn run(&self) -> anyhow::Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let outcomes = source_paths
            .par_iter()
            .map(|source_path| self.format_one(source_path))
            .collect::<Vec<_>>();

        let mut failures = 0usize;
        for (source_path, outcome) in source_paths.iter().zip(outcomes) {
            let shown = source_path.display();
            match outcome {
                Err(error) => {
                    failures += 1;
                    eprintln!("{} {shown}: {error:#}", "error".red().bold());
                }
                Ok(FmtOutcome::Formatted) if self.check => {
                    eprintln!("{} {shown}", "ok".green());
                }
                Ok(FmtOutcome::Changed(_)) if self.check => {
                    failures += 1;
                    eprintln!("{} {shown}", "would reformat".yellow());
                }
                Ok(FmtOutcome::Formatted) if self.write => {}
                Ok(FmtOutcome::Changed(formatted)) if self.write => {
                    std::fs::write(source_path, formatted)
                        .with_context(|| format!("failed to write {shown}"))?;
                    eprintln!("{} {shown}", "reformatted".cyan());
                }
                Ok(FmtOutcome::Formatted) => {
                    print!("{}", std::fs::read_to_string(source_path)?);
                }
                Ok(FmtOutcome::Changed(formatted)) => print!("{formatted}"),
            }
        }
        if failures > 0 {
            bail!("{failures} of {} file(s) failed", source_paths.len());
        }
        Ok(())
    }

    fn format_one(&self, source_path: &Path) -> anyhow::Result<FmtOutcome> {
        let source = std::fs::read(source_path)
            .with_context(|| format!("failed to read {}", source_path.display()))?;
        let doc = JsonValue::parse(&source).into_result()?;
        let mut formatted = doc.to_json_string(self.pretty)?;
        formatted.push('\n');
        debug!("formatted {} ({} bytes)", source_path.display(), formatted.len());
        if source == formatted.as_bytes() {
            Ok(FmtOutcome::Formatted)
        } else {
            Ok(FmtOutcome::Changed(formatted))
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// `users.0.name` → `[Key("users"), Index(0), Key("name")]`; the empty string is the root.
fn parse_path(raw: &str) -> Vec<PathKey> {
    raw.split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment.bytes().all(|b| b.is_ascii_digit()) {
                segment
                    .parse::<usize>()
                    .map(PathKey::Index)
                    .unwrap_or_else(|_| PathKey::from(segment))
            } else {
                PathKey::from(segment)
            }
        })
        .collect()
}

/// JSON text (scalars included) or, failing that, the raw string.
fn parse_value_arg(raw: &str) -> JsonValue {
    serde_json::from_str::<JsonValue>(raw).unwrap_or_else(|_| JsonValue::from(raw))
}

fn lookup(doc: &JsonValue, settings: &PathSettings, parse_embedded: bool) -> JsonValue {
    let path = parse_path(&settings.path);
    if !settings.ignore_case && !parse_embedded {
        return doc.at_path(&path).clone();
    }
    path.into_iter().fold(doc.clone(), |current, key| match key {
        PathKey::Key(k) if settings.ignore_case => {
            let next = current.get_ignore_case(&k).clone();
            match &next {
                JsonValue::String(text) if parse_embedded => {
                    let parsed = JsonValue::parse_str(text);
                    if parsed.is_valid() { parsed } else { next }
                }
                _ => next,
            }
        }
        key if parse_embedded => current.get_parsed(key),
        key => current.get(key).clone(),
    })
}

fn coerce_to_text(value: &JsonValue, as_type: ScalarType) -> Option<String> {
    match as_type {
        ScalarType::Bool => value.as_bool().map(|b| b.to_string()),
        ScalarType::Int => value.as_i64().map(|i| i.to_string()),
        ScalarType::Float => value.as_f64().map(|f| f.to_string()),
        ScalarType::String => value.as_string(),
    }
}

fn load_document(source_path: &Path) -> anyhow::Result<JsonValue> {
    let source = std::fs::read(source_path)
        .with_context(|| format!("failed to read source file {}", source_path.display()))?;
    JsonValue::parse(&source)
        .into_result()
        .with_context(|| format!("failed to parse JSON source file ({})", source_path.display()))
}

fn write_output(out: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, format!("{contents}\n"))?;
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(path: &str, ignore_case: bool) -> PathSettings {
        PathSettings { path: path.to_string(), ignore_case }
    }

    #[test]
    fn dotted_paths_split_into_keys_and_indices() {
        assert_eq!(parse_path("users.0.name"), dynjson::path!["users", 0, "name"]);
        assert_eq!(parse_path(""), Vec::<PathKey>::new());
        assert_eq!(parse_path("a..b"), dynjson::path!["a", "b"]);
        assert_eq!(
            parse_path("99999999999999999999999"),
            vec![PathKey::from("99999999999999999999999")]
        );
    }

    #[test]
    fn value_arguments_fall_back_to_strings() {
        assert_eq!(parse_value_arg("42"), JsonValue::from(42));
        assert_eq!(parse_value_arg("true"), JsonValue::from(true));
        assert_eq!(parse_value_arg("[1]"), JsonValue::from(json!([1])));
        assert_eq!(parse_value_arg("hello"), JsonValue::from("hello"));
    }

    #[test]
    fn lookup_follows_flags() {
        let doc = JsonValue::from(json!({"Meta": {"inner": "{\"x\": [7]}"}}));
        assert!(lookup(&doc, &settings("meta.inner", false), false).is_error());
        assert_eq!(
            lookup(&doc, &settings("meta.inner", true), false),
            JsonValue::from("{\"x\": [7]}")
        );
        assert_eq!(
            lookup(&doc, &settings("meta.inner.x.0", true), true),
            JsonValue::from(7)
        );
        assert_eq!(
            lookup(&doc, &settings("Meta.inner.x", false), true),
            JsonValue::from(json!([7]))
        );
    }

    #[test]
    fn coercion_flags_render_scalars() {
        let yes = JsonValue::from("YES");
        assert_eq!(coerce_to_text(&yes, ScalarType::Bool).as_deref(), Some("true"));
        assert_eq!(coerce_to_text(&JsonValue::from(3.9), ScalarType::Int).as_deref(), Some("3"));
        let truth = JsonValue::from(true);
        assert_eq!(coerce_to_text(&truth, ScalarType::String).as_deref(), Some("true"));
        assert_eq!(coerce_to_text(&JsonValue::from("banana"), ScalarType::Float), None);
    }

    #[test]
    fn literal_paths_pass_through_pattern_resolution() {
        let resolved = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(resolved, vec![PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
        assert!(resolve_file_path_patterns(["/nonexistent-dir-for-tests/*.json"]).is_err());
    }

    #[test]
    fn arguments_parse() {
        let cli = CommandLineInterface::try_parse_from([
            "dynjson", "get", "doc.json", "--path", "a.0", "--as", "int", "--ignore-case",
        ])
        .unwrap();
        match cli.cmd {
            Command::Get(args) => {
                assert_eq!(args.path_settings.path, "a.0");
                assert!(args.path_settings.ignore_case);
                assert_eq!(args.as_type, Some(ScalarType::Int));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        let conflicting = ["dynjson", "fmt", "-i", "x", "--check", "--write"];
        assert!(CommandLineInterface::try_parse_from(conflicting).is_err());
    }
}
