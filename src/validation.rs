//! Validation of bound values.
//!
//! Checking is a pure query: [`Validate::validation_errors`] and
//! [`Validate::is_valid`] never fail. Only [`Validate::assert_valid`] turns
//! the collected failures into an [`Error::Validation`].

use crate::collection::Collection;
use crate::record::Record;
use crate::value::{FieldValue, NamedValue};
use crate::{Error, Result};
use std::fmt;
use tracing::warn;

/// One failed rule, addressed by its field path (`street`,
/// `address.zip`, `[1].city`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    fn under(self, prefix: &str) -> Self {
        let path = if self.path.is_empty() {
            prefix.to_string()
        } else if self.path.starts_with('[') {
            format!("{}{}", prefix, self.path)
        } else {
            format!("{}.{}", prefix, self.path)
        };
        Self { path, ..self }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validation rules of a bound value.
pub trait Validate {
    /// Every failed rule, in declaration order.
    fn validation_errors(&self) -> Vec<FieldError>;

    /// Whether no rule fails. Failures are logged at warn level.
    fn is_valid(&self) -> bool {
        let errors = self.validation_errors();
        for error in &errors {
            warn!(path = %error.path, "validation -> {}", error.message);
        }
        errors.is_empty()
    }

    /// Fails with every collected failure joined by `; `.
    ///
    /// # Examples
    ///
    /// ```
    /// use restbind::schema::{FieldKind, FieldSpec, Schema};
    /// use restbind::{Record, Validate};
    ///
    /// static NOTE: Schema = Schema {
    ///     name: "Note",
    ///     fields: &[FieldSpec::required("text", FieldKind::Str)],
    ///     content: None,
    /// };
    ///
    /// let err = Record::empty(&NOTE).assert_valid().unwrap_err();
    /// assert!(err.to_string().starts_with("Validation failed"));
    /// assert!(err.to_string().contains("text"));
    /// ```
    fn assert_valid(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            return Ok(());
        }

        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::Validation(joined))
    }
}

impl Validate for Record {
    fn validation_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        for (spec, value) in self.fields() {
            match value {
                None if !spec.nullable => {
                    errors.push(FieldError::new(spec.name, "is required but not initialized"));
                }
                None | Some(FieldValue::Null) => {}
                Some(value) if spec.nullable && value.carries_no_data() => {}
                Some(value) => {
                    if let Some(Err(message)) = spec.check.map(|check| check(value)) {
                        errors.push(FieldError::new(spec.name, message));
                    }
                    errors.extend(
                        nested_errors(value)
                            .into_iter()
                            .map(|error| error.under(spec.name)),
                    );
                }
            }
        }

        errors
    }
}

impl Validate for Collection {
    fn validation_errors(&self) -> Vec<FieldError> {
        self.iter()
            .enumerate()
            .flat_map(|(index, item)| {
                let prefix = format!("[{}]", index);
                nested_errors(item)
                    .into_iter()
                    .map(move |error| error.under(&prefix))
            })
            .collect()
    }
}

impl Validate for NamedValue {
    fn validation_errors(&self) -> Vec<FieldError> {
        if NamedValue::is_valid(self) {
            Vec::new()
        } else {
            vec![FieldError::new(self.entity_name(), "is not a valid value")]
        }
    }
}

// Paths are relative to the value; named values report an empty path that
// `under` turns into the enclosing field.
fn nested_errors(value: &FieldValue) -> Vec<FieldError> {
    match value {
        FieldValue::Entity(record) => record.validation_errors(),
        FieldValue::Collection(collection) => collection.validation_errors(),
        FieldValue::Value(named) if !NamedValue::is_valid(named) => {
            vec![FieldError::new("", format!("is not a valid {}", named.entity_name()))]
        }
        _ => Vec::new(),
    }
}
