//! `${VAR}` expansion for string settings.
//!
//! `${VAR:-default}` falls back to `default` when `VAR` is unset. Bare `$VAR`
//! is left alone so literal dollar signs in URLs survive.

use crate::ConfigError;

/// Expand `${VAR}` references in `value` in place, reading the process
/// environment.
///
/// `field` is the dotted config key reported when a variable is missing.
pub(crate) fn expand_env(value: &mut String, field: &str) -> Result<(), ConfigError> {
    expand_with(value, field, |name| std::env::var(name).ok())
}

/// Expand `${VAR}` references in `value` in place using `lookup`.
fn expand_with(
    value: &mut String,
    field: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if !value.contains("${") {
        return Ok(());
    }

    let expanded = shellexpand::env_with_context(value.as_str(), |name| {
        lookup(name).map(Some).ok_or(())
    })
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.var_name),
    })?;
    *value = expanded.into_owned();
    Ok(())
}
