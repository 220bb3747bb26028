//! Minimal CLI: infer → (schema | summary)
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use crate::registry::{Grouping, Registry, RegistryConfig};
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// infer the distinct object shapes of JSON/NDJSON documents
#[derive(Parser, Debug)]
#[command(name = "json-shapes", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// infer and print the shapes as a JSON-schema-ish document
    Schema(SchemaOut),
    /// infer and print one compact line per shape
    Summary(SummaryOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is registered.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct RegistrySettings {
    /// attribute whose value keeps shapes apart (repeatable), e.g. `--discriminator otype`
    #[arg(long = "discriminator")]
    discriminators: Vec<String>,

    /// merge every object of a partition into one shape instead of grouping
    /// objects that share attribute names
    #[arg(long, default_value_t = false)]
    merge_all: bool,

    /// infer each input on the thread pool and fold the partial results
    #[arg(long, default_value_t = false)]
    parallel: bool,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    registry_settings: RegistrySettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct SummaryOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    registry_settings: RegistrySettings,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Every document of one input, after jq and pointer selection.
    fn load_documents(&self, source_path: &Path) -> Result<Vec<Value>> {
        let source_path_str = source_path.to_string_lossy().to_string();
        let source = read_source(source_path)
            .with_context(|| format!("failed to read source file ({source_path_str})"))?;

        let documents = self
            .parse_source(&source)
            .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;

        let documents = match self.jq_expr.as_ref() {
            None => documents,
            Some(jq_expr) => {
                let mut out = Vec::new();
                for document in &documents {
                    // jaq sees a serde_json map, which would drop repeated keys
                    document
                        .ensure_unique_keys()
                        .with_context(|| format!("invalid document in {source_path_str}"))?;
                    let result = crate::jq_exec::run_jaq(jq_expr, serde_json::Value::from(document))
                        .with_context(|| {
                            format!("failed to apply jq expression to source file ({source_path_str})")
                        })?;
                    out.extend(result);
                }
                out
            }
        };

        let documents = match self.json_pointer.as_deref() {
            None => documents,
            Some(pointer) => documents
                .iter()
                .filter_map(|doc| {
                    let selected = doc.pointer(pointer).cloned();
                    if selected.is_none() {
                        tracing::warn!(%pointer, file = %source_path_str, "JSON pointer selected nothing; document skipped");
                    }
                    selected
                })
                .collect(),
        };
        tracing::info!(file = %source_path_str, documents = documents.len(), "loaded input");
        Ok(documents)
    }

    fn parse_source(&self, source: &str) -> Result<Vec<Value>, crate::error::ParseError> {
        if self.ndjson {
            crate::parse::parse_ndjson(source).collect()
        } else {
            crate::parse::parse_document(source).map(|v| vec![v])
        }
    }
}

impl RegistrySettings {
    fn config(&self) -> RegistryConfig {
        let grouping = if self.merge_all { Grouping::Merged } else { Grouping::SharedAttribute };
        self.discriminators
            .iter()
            .fold(RegistryConfig::default().with_grouping(grouping), |config, d| {
                config.with_discriminator(d.clone())
            })
    }

    fn build(&self, inputs: &InputSettings) -> Result<Registry> {
        let source_paths = resolve_file_path_patterns(&inputs.input)
            .context("failed to resolve input file paths")?;
        let config = self.config();

        let registry = if self.parallel {
            let batches = source_paths
                .par_iter()
                .map(|p| inputs.load_documents(p))
                .collect::<Result<Vec<_>>>()?;
            crate::shard::infer_sharded(batches, &config)?
        } else {
            let mut registry = Registry::new(config);
            for source_path in &source_paths {
                let documents = inputs.load_documents(source_path)?;
                registry.register_all(&documents).with_context(|| {
                    format!("invalid document in {}", source_path.to_string_lossy())
                })?;
            }
            registry
        };
        tracing::info!(documents = registry.documents(), shapes = registry.len(), "inference finished");
        Ok(registry)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let registry = target.registry_settings.build(&target.input_settings)?;
                let schema = crate::schema::emit_document(&registry);
                let schema_src = serde_json::to_string_pretty(&schema)?;
                write_output(target.out.as_deref(), &schema_src)
            }
            Command::Summary(target) => {
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let registry = target.registry_settings.build(&target.input_settings)?;
                println!("{}", render_summary(&registry));
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_source(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

fn write_output(out: Option<&Path>, src: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.to_string_lossy()))?;
            }
            std::fs::write(out, src).with_context(|| format!("failed to write {}", out.to_string_lossy()))
        }
        None => {
            println!("{src}");
            Ok(())
        }
    }
}

fn render_summary(registry: &Registry) -> String {
    let mut lines = Vec::new();
    for (shape, name) in crate::schema::shape_names(registry) {
        let count = format!("({} observed)", shape.observations);
        lines.push(format!("{} {} {}", name.bold(), count.dimmed(), shape.ty));
    }
    if !registry.root().is_unknown() {
        lines.push(format!("{} {}", "root".bold(), registry.root()));
    }
    if lines.is_empty() {
        lines.push(format!("{}", "no shapes".dimmed()));
    }
    lines.join("\n")
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
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
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                anyhow::bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            // Treat as a literal path ('-' is stdin)
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeType, TypeNode};

    fn parse(args: &[&str]) -> CommandLineInterface {
        CommandLineInterface::try_parse_from(args).unwrap()
    }

    #[test]
    fn registry_flags_map_to_config() {
        let cli = parse(&["json-shapes", "schema", "-i", "a.json", "--discriminator", "otype", "--discriminator", "snippet", "--merge-all"]);
        let Command::Schema(target) = cli.cmd else { panic!("expected schema") };
        let config = target.registry_settings.config();
        assert_eq!(config.discriminators, vec!["otype".to_string(), "snippet".to_string()]);
        assert_eq!(config.grouping, Grouping::Merged);
    }

    #[test]
    fn input_is_required() {
        assert!(CommandLineInterface::try_parse_from(["json-shapes", "summary"]).is_err());
    }

    /// Write `contents` to a fresh per-test directory; returns (dir, file).
    fn fixture(test: &str, contents: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("json-shapes-cli-{}-{test}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("docs.json");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn build(args: &[&str]) -> Result<Registry> {
        let Command::Summary(target) = parse(args).cmd else { panic!("expected summary") };
        target.registry_settings.build(&target.input_settings)
    }

    #[test]
    fn loads_ndjson_with_pointer_selection() {
        let (dir, path) = fixture(
            "pointer",
            "{\"data\": {\"a\": 1}}\n\n{\"other\": 2}\n{\"data\": {\"a\": null}}\n",
        );
        let registry = build(&["json-shapes", "summary", "--ndjson", "--json-pointer", "/data", "-i", path.to_str().unwrap()]).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(registry.documents(), 2);
        let shapes: Vec<_> = registry.shapes().collect();
        assert_eq!(shapes.len(), 1);
        assert_eq!(
            shapes[0].ty.get("a"),
            Some(&AttributeType::nullable(TypeNode::NUMBER))
        );
    }

    #[test]
    fn jq_input_still_rejects_repeated_keys() {
        let (dir, path) = fixture("jq-dup", r#"{"a": 1, "a": null}"#);
        let err = build(&["json-shapes", "summary", "--jq-expr", ".", "-i", path.to_str().unwrap()]).unwrap_err();
        std::fs::remove_dir_all(&dir).ok();
        let chain = format!("{err:#}");
        assert!(chain.contains("duplicate attribute `a`"), "{chain}");
    }

    #[test]
    fn jq_input_reports_ndjson_line_numbers() {
        let (dir, path) = fixture("jq-line", "{\"a\": 1}\n{\"a\": }\n");
        let err = build(&["json-shapes", "summary", "--ndjson", "--jq-expr", ".", "-i", path.to_str().unwrap()]).unwrap_err();
        std::fs::remove_dir_all(&dir).ok();
        let chain = format!("{err:#}");
        assert!(chain.contains("line 2"), "{chain}");
    }

    #[test]
    fn jq_outputs_are_registered() {
        let (dir, path) = fixture("jq-items", r#"{"items": [{"a": 1}, {"a": "s"}]}"#);
        let registry = build(&["json-shapes", "summary", "--jq-expr", ".items[]", "-i", path.to_str().unwrap()]).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(registry.documents(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unmatched_glob_is_an_error() {
        let err = resolve_file_path_patterns(["/definitely/not/here/*.json"]).unwrap_err();
        assert!(err.to_string().contains("matched no files"));
    }
}
