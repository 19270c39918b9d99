//! Run configuration: validation of the raw YAML document and expansion of
//! `${VAR}` token references.

use std::fmt;
use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use crate::error::{Result, ToolError};

/// Keys that must be present and non-empty, in reporting order.
pub const REQUIRED_KEYS: [&str; 5] = [
    "csv_path",
    "base_url",
    "api_token",
    "tenant",
    "custom_field_names",
];

/// Validated run configuration. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub csv_path: PathBuf,
    pub base_url: String,
    pub api_token: String,
    pub tenant: String,
    pub custom_field_names: Vec<String>,
    pub num_ids: Option<usize>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("csv_path", &self.csv_path)
            .field("base_url", &self.base_url)
            .field("api_token", &mask_token(&self.api_token))
            .field("tenant", &self.tenant)
            .field("custom_field_names", &self.custom_field_names)
            .field("num_ids", &self.num_ids)
            .finish()
    }
}

/// Validates the raw configuration mapping, resolving `${VAR}` references in
/// `api_token` through `lookup`.
///
/// Checks run in a fixed order: presence of every required key (all missing
/// keys are reported together), scalar types, `${VAR}` expansion,
/// `custom_field_names` shape and finally `num_ids`.
pub fn validate_and_expand<F>(raw: &Mapping, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| raw.get(**key).is_none_or(is_falsy))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ToolError::MissingConfigKeys(missing));
    }

    let csv_path = required_string(raw, "csv_path")?;
    let base_url = required_string(raw, "base_url")?;
    let api_token = required_string(raw, "api_token")?;
    let tenant = required_string(raw, "tenant")?;

    let api_token = expand_env_reference(&api_token, lookup)?;

    let custom_field_names = string_list(raw, "custom_field_names")?;
    let num_ids = positive_count(raw.get("num_ids"))?;

    Ok(Config {
        csv_path: PathBuf::from(csv_path),
        base_url: base_url.trim_end_matches('/').to_string(),
        api_token,
        tenant,
        custom_field_names,
        num_ids,
    })
}

/// Same as [`validate_and_expand`], reading `${VAR}` references from the
/// process environment.
pub fn validate_and_expand_from_env(raw: &Mapping) -> Result<Config> {
    validate_and_expand(raw, |name| std::env::var(name).ok())
}

/// Returns the variable name when `value` is exactly of the form `${NAME}`.
pub fn env_reference(value: &str) -> Option<&str> {
    value.strip_prefix("${")?.strip_suffix('}')
}

/// Resolves a `${NAME}` reference through `lookup`. Values that are not a
/// reference are returned unchanged. An unset or empty variable is an error.
pub fn expand_env_reference<F>(value: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(name) = env_reference(value) else {
        return Ok(value.to_string());
    };
    match lookup(name) {
        Some(resolved) if !resolved.is_empty() => Ok(resolved),
        _ => Err(ToolError::EnvVarNotSet(name.to_string())),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(entries) => entries.is_empty(),
        Value::Tagged(tagged) => is_falsy(&tagged.value),
    }
}

fn required_string(raw: &Mapping, key: &str) -> Result<String> {
    match raw.get(key) {
        Some(Value::String(text)) => Ok(text.clone()),
        _ => Err(ToolError::InvalidConfigValue {
            key: key.to_string(),
            expected: "a string",
        }),
    }
}

fn string_list(raw: &Mapping, key: &str) -> Result<Vec<String>> {
    let invalid = || ToolError::InvalidConfigValue {
        key: key.to_string(),
        expected: "a list of strings",
    };
    let Some(Value::Sequence(items)) = raw.get(key) else {
        return Err(invalid());
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn positive_count(value: Option<&Value>) -> Result<Option<usize>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => match number.as_u64() {
            Some(count) if count >= 1 => usize::try_from(count)
                .map(Some)
                .map_err(|_| ToolError::InvalidNumIds),
            _ => Err(ToolError::InvalidNumIds),
        },
        Some(_) => Err(ToolError::InvalidNumIds),
    }
}

/// Tokens shorter than this are never partially shown.
const MASK_PREFIX_MIN_LEN: usize = 20;
const MASK_PREFIX_LEN: usize = 4;

fn mask_token(value: &str) -> String {
    if value.chars().count() < MASK_PREFIX_MIN_LEN {
        return "<redacted>".to_string();
    }
    let head: String = value.chars().take(MASK_PREFIX_LEN).collect();
    format!("{head}<redacted>")
}
