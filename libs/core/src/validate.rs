use crate::error::ReconcileError;

/// Returns the trimmed value, or a validation error naming `field` when it is blank.
///
/// ```
/// use aid_core::require;
///
/// assert_eq!(require("display_name", "  Payroll agent ").unwrap(), "Payroll agent");
/// assert!(require("display_name", "   ").is_err());
/// ```
pub fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ReconcileError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReconcileError::validation(field));
    }
    Ok(trimmed)
}

/// Like [`require`] for item keys, which are matched verbatim: a key padded
/// with whitespace is rejected instead of trimmed.
pub fn require_key<'a>(field: &str, value: &'a str) -> Result<&'a str, ReconcileError> {
    let trimmed = require(field, value)?;
    if trimmed.len() != value.len() {
        return Err(ReconcileError::invalid(
            field,
            "leading or trailing whitespace is not allowed",
        ));
    }
    Ok(value)
}

/// Like [`require`] for optional inputs coming straight from a command line.
pub fn require_some<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ReconcileError> {
    require(field, value.unwrap_or_default())
}

/// Rejects a list that is empty or holds a blank entry.
pub fn require_each<'a, I>(field: &str, values: I) -> Result<Vec<&'a str>, ReconcileError>
where
    I: IntoIterator<Item = &'a str>,
{
    let values = values
        .into_iter()
        .map(|value| require(field, value))
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Err(ReconcileError::validation(field));
    }
    Ok(values)
}
