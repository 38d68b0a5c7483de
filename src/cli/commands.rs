use std::fs;
use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use tracing::info;

use crate::app::EstuaryError;
use crate::cli::{Cli, Command};
use crate::manifest::ContentManifest;
use crate::normalizer::{GenericNormalizer, Normalizer};
use crate::schema::SettingsSchema;

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Stats { path } => stats(&path),
        Command::Normalize { path, adapter } => normalize(&path, &adapter),
        Command::CheckSettings { schema, values } => check_settings(&schema, &values),
    }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub(crate) fn stats(path: &Path) -> anyhow::Result<()> {
    let manifest = ContentManifest::from_value(read_json(path)?)?;
    let stats = manifest.stats();

    println!("source:     {}", manifest.source_id());
    println!("items:      {}", stats.total);
    println!("with media: {}", stats.with_media);
    for (content_type, count) in &stats.by_type {
        println!("  {content_type}: {count}");
    }
    let range = manifest.date_range();
    if let (Some(earliest), Some(latest)) = (range.earliest, range.latest) {
        println!("range:      {} .. {}", earliest.date_naive(), latest.date_naive());
    }
    Ok(())
}

pub(crate) fn normalize(path: &Path, adapter: &str) -> anyhow::Result<()> {
    let items = read_json(path)?;
    let items = items
        .as_array()
        .context("input must be a JSON array of raw items")?;

    let normalizer = GenericNormalizer::new(adapter);
    let mut normalized = Vec::with_capacity(items.len());
    let mut failures = 0usize;

    for (index, item) in items.iter().enumerate() {
        let Some(raw) = item.as_object() else {
            failures += 1;
            eprintln!("item {index}: not an object, skipped");
            continue;
        };
        match normalizer.normalize(raw) {
            Ok(item) => normalized.push(item.to_value()),
            Err(e) => {
                failures += 1;
                eprintln!("item {index}: {e}");
            }
        }
    }

    info!(
        total = items.len(),
        normalized = normalized.len(),
        failures,
        "normalization finished"
    );
    println!("{}", serde_json::to_string_pretty(&Value::Array(normalized))?);
    Ok(())
}

pub(crate) fn check_settings(schema_path: &Path, values_path: &Path) -> anyhow::Result<()> {
    let schema = SettingsSchema::from_value(read_json(schema_path)?)?;
    let values = read_json(values_path)?;
    let values = values
        .as_object()
        .context("settings values must be a JSON object")?;

    match schema.validate(values) {
        Ok(clean) => {
            println!("settings valid");
            for (key, value) in &clean {
                println!("  {key} = {value}");
            }
            Ok(())
        }
        Err(errors) => {
            for error in errors.errors() {
                eprintln!("{}: [{}] {}", error.field, error.code, error.message);
            }
            Err(EstuaryError::Validation(errors).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(value: Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{value}").unwrap();
        file
    }

    #[test]
    fn test_stats_reads_manifest_file() {
        let file = json_file(json!({
            "source_id": "twitter",
            "items": {
                "1": {
                    "id": "1",
                    "type": "post",
                    "title": "t",
                    "created_at": "2024-01-15T10:30:00Z"
                }
            }
        }));
        stats(file.path()).unwrap();
    }

    #[test]
    fn test_stats_rejects_missing_file() {
        assert!(stats(Path::new("/nonexistent/manifest.json")).is_err());
    }

    #[test]
    fn test_normalize_skips_bad_items() {
        let file = json_file(json!([
            {"id": "1", "text": "hello", "created_at": "2024-01-15"},
            {"text": "no id"},
            "not an object"
        ]));
        normalize(file.path(), "generic").unwrap();
    }

    #[test]
    fn test_normalize_rejects_non_array_input() {
        let file = json_file(json!({"not": "an array"}));
        assert!(normalize(file.path(), "generic").is_err());
    }

    #[test]
    fn test_check_settings_reports_failures() {
        let schema = json_file(json!({
            "fields": {
                "api_key": {"type": "password", "label": "API Key", "required": true}
            }
        }));
        let bad = json_file(json!({}));
        let err = check_settings(schema.path(), bad.path()).unwrap_err();
        assert!(err
            .downcast_ref::<EstuaryError>()
            .is_some_and(|e| matches!(e, EstuaryError::Validation(errors) if errors.len() == 1)));
        assert!(err.to_string().contains("API Key is required."));

        let good = json_file(json!({"api_key": "k"}));
        check_settings(schema.path(), good.path()).unwrap();
    }
}
