//! Declarative settings schemas for adapter configuration.
//!
//! An adapter describes the settings it needs as a [`SettingsSchema`]; the
//! schema then validates and coerces user-supplied values in one pass,
//! collecting every field error instead of stopping at the first.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};
use url::Url;

use crate::app::{ErrorSet, EstuaryError, FieldError, Result};
use crate::normalizer::DateConverter;

/// Input control and coercion rule for a settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Password,
    Textarea,
    File,
    Select,
    Checkbox,
    Date,
    DateRange,
    Number,
    Url,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Password => "password",
            FieldType::Textarea => "textarea",
            FieldType::File => "file",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::DateRange => "date_range",
            FieldType::Number => "number",
            FieldType::Url => "url",
        }
    }
}

/// Everything the UI and the validator need to know about one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub placeholder: Option<String>,
    /// Allowed values for `select` fields, key to display label.
    #[serde(default)]
    pub options: IndexMap<String, String>,
    /// MIME filter for `file` fields.
    #[serde(default)]
    pub accept: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl FieldConfig {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            label: String::new(),
            description: None,
            required: false,
            default: None,
            placeholder: None,
            options: IndexMap::new(),
            accept: None,
            min: None,
            max: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.insert(key.into(), label.into());
        self
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }
}

/// Ordered collection of field configs with whole-form validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsSchema {
    fields: IndexMap<String, FieldConfig>,
}

impl SettingsSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field. Select fields must carry at least one
    /// option; a missing label defaults to the field key.
    pub fn add_field(&mut self, key: impl Into<String>, mut config: FieldConfig) -> Result<()> {
        let key = key.into();

        if config.field_type == FieldType::Select && config.options.is_empty() {
            return Err(EstuaryError::Configuration(format!(
                "Select field \"{key}\" requires at least one option"
            )));
        }

        if config.label.is_empty() {
            config.label = key.clone();
        }

        self.fields.insert(key, config);
        Ok(())
    }

    /// Remove a field; removing an unknown key is a no-op.
    pub fn remove_field(&mut self, key: &str) {
        self.fields.shift_remove(key);
    }

    pub fn get_field(&self, key: &str) -> Option<&FieldConfig> {
        self.fields.get(key)
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldConfig)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate and coerce a full set of values against the schema.
    ///
    /// All fields are checked; on any failure the collected [`ErrorSet`] is
    /// returned and no partial result escapes. Unknown keys in the input
    /// are ignored.
    pub fn validate(
        &self,
        values: &Map<String, Value>,
    ) -> std::result::Result<IndexMap<String, Value>, ErrorSet> {
        let mut clean = IndexMap::new();
        let mut errors = ErrorSet::new();

        for (key, config) in &self.fields {
            let value = values.get(key);
            let missing = value.map_or(true, is_empty_value);

            if missing {
                if config.required {
                    errors.add(FieldError::new(
                        key,
                        "required",
                        format!("{} is required.", config.label),
                    ));
                } else if let Some(default) = &config.default {
                    clean.insert(key.clone(), default.clone());
                }
                continue;
            }

            let value = value.expect("presence checked above");
            match coerce(key, config, value) {
                Ok(coerced) => {
                    clean.insert(key.clone(), coerced);
                }
                Err(field_errors) => {
                    for error in field_errors.errors() {
                        errors.add(error.clone());
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(clean)
        } else {
            Err(errors)
        }
    }

    pub fn to_value(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|(key, config)| {
                let value = serde_json::to_value(config)
                    .expect("field config serialization cannot fail");
                (key.clone(), value)
            })
            .collect();
        json!({ "fields": fields })
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let fields = value
            .get("fields")
            .and_then(Value::as_object)
            .ok_or_else(|| EstuaryError::MissingField("fields".to_string()))?;

        let mut schema = Self::new();
        for (key, config) in fields {
            let config: FieldConfig = serde_json::from_value(config.clone())?;
            schema.add_field(key, config)?;
        }
        Ok(schema)
    }
}

/// Null, empty string, empty array, and empty object count as absent.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn coerce(key: &str, config: &FieldConfig, value: &Value) -> std::result::Result<Value, ErrorSet> {
    let mut errors = ErrorSet::new();

    let result = match config.field_type {
        FieldType::Text | FieldType::Password => Some(Value::String(clean_text(value, false))),
        FieldType::Textarea => Some(Value::String(clean_text(value, true))),
        FieldType::File => Some(value.clone()),
        FieldType::Url => match value.as_str().and_then(|s| Url::parse(s.trim()).ok()) {
            Some(url) => Some(Value::String(url.to_string())),
            None => {
                errors.add(FieldError::new(
                    key,
                    "invalid_url",
                    format!("{} must be a valid URL.", config.label),
                ));
                None
            }
        },
        FieldType::Number => coerce_number(key, config, value, &mut errors),
        FieldType::Checkbox => Some(Value::Bool(truthy(value))),
        FieldType::Select => {
            let selected = value.as_str().unwrap_or_default();
            if config.options.contains_key(selected) {
                Some(Value::String(selected.to_string()))
            } else {
                errors.add(FieldError::new(
                    key,
                    "invalid_option",
                    format!("{} has an invalid selection.", config.label),
                ));
                None
            }
        }
        FieldType::Date => match coerce_date(value) {
            Some(date) => Some(Value::String(date)),
            None => {
                errors.add(FieldError::new(
                    key,
                    "invalid_date",
                    format!("{} must be a valid date.", config.label),
                ));
                None
            }
        },
        FieldType::DateRange => {
            let range = value.as_object().and_then(|obj| {
                let start = obj.get("start").and_then(coerce_date_value)?;
                let end = obj.get("end").and_then(coerce_date_value)?;
                Some(json!({ "start": start, "end": end }))
            });
            match range {
                Some(range) => Some(range),
                None => {
                    errors.add(FieldError::new(
                        key,
                        "invalid_date_range",
                        format!("{} must be a valid date range.", config.label),
                    ));
                    None
                }
            }
        }
    };

    match result {
        Some(value) if errors.is_empty() => Ok(value),
        _ => Err(errors),
    }
}

/// Stringify, strip control characters, and trim. Textarea fields keep
/// their newlines and tabs.
fn clean_text(value: &Value, keep_newlines: bool) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    raw.chars()
        .filter(|c| {
            !c.is_control() || (keep_newlines && matches!(c, '\n' | '\r' | '\t'))
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn coerce_number(
    key: &str,
    config: &FieldConfig,
    value: &Value,
    errors: &mut ErrorSet,
) -> Option<Value> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    let Some(number) = number else {
        errors.add(FieldError::new(
            key,
            "invalid_number",
            format!("{} must be a number.", config.label),
        ));
        return None;
    };

    if let Some(min) = config.min {
        if number < min {
            errors.add(FieldError::new(
                key,
                "number_too_low",
                format!("{} must be at least {min}.", config.label),
            ));
        }
    }
    if let Some(max) = config.max {
        if number > max {
            errors.add(FieldError::new(
                key,
                "number_too_high",
                format!("{} must be at most {max}.", config.label),
            ));
        }
    }

    if !errors.is_empty() {
        return None;
    }

    // Whole numbers come back as integers.
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Some(Value::Number(Number::from(number as i64)))
    } else {
        Number::from_f64(number).map(Value::Number)
    }
}

/// Boolean cast semantics: zero and "0" are false, any other non-empty
/// value is true. Empty values never reach this point (they count as
/// missing).
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

fn coerce_date(value: &Value) -> Option<String> {
    let text = value.as_str()?;
    let converter = DateConverter::new();
    let parsed = converter.convert(text, None).ok()?;
    Some(parsed.format("%Y-%m-%d").to_string())
}

fn coerce_date_value(value: &Value) -> Option<Value> {
    coerce_date(value).map(Value::String)
}
