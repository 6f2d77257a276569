use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::error::Error;

/// Reserved prefix for generated placeholder names
///
/// Every placeholder this crate generates starts with this prefix, so
/// caller-supplied filter expressions can never collide with generated key
/// conditions as long as callers avoid it.
pub const MAPPED_PREFIX: &str = "AMZN_MAPPED_";

/// A condition or filter expression together with its placeholder bindings
///
/// Immutable value type; composition goes through [`Expression::and`], which
/// rejects a placeholder bound to two different targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl Expression {
    /// Expression from its string form, with no bindings yet
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            names: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Bind a `#placeholder` to a real attribute name
    pub fn with_name(mut self, placeholder: impl Into<String>, name: impl Into<String>) -> Self {
        let _ = self.names.insert(placeholder.into(), name.into());
        self
    }

    /// Bind a `:placeholder` to a value
    pub fn with_value(mut self, placeholder: impl Into<String>, value: AttributeValue) -> Self {
        let _ = self.values.insert(placeholder.into(), value);
        self
    }

    /// Replace the expression string, keeping the bindings
    pub(crate) fn with_expression(mut self, expression: String) -> Self {
        self.expression = expression;
        self
    }

    /// The expression string
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Placeholder-to-attribute-name bindings
    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    /// Placeholder-to-value bindings
    pub fn values(&self) -> &HashMap<String, AttributeValue> {
        &self.values
    }

    /// Conjoin two expressions with `AND`, merging their bindings
    ///
    /// Fails with [`Error::PlaceholderConflict`] when both sides bind the
    /// same placeholder to different targets.
    pub fn and(self, other: Expression) -> Result<Expression, Error> {
        let expression = format!("({}) AND ({})", self.expression, other.expression);
        Ok(Expression {
            expression,
            names: merge_names(self.names, other.names)?,
            values: merge_values(self.values, other.values)?,
        })
    }

    /// Conjoin an expression onto an optional base
    ///
    /// With no base the extra expression is used verbatim, string included.
    pub fn coalesce(base: Option<Expression>, extra: Expression) -> Result<Expression, Error> {
        match base {
            None => Ok(extra),
            Some(base) => base.and(extra),
        }
    }

    /// Name placeholder for an attribute: `#AMZN_MAPPED_<attr>`
    pub fn name_placeholder(attribute: &str) -> String {
        format!("#{}{}", MAPPED_PREFIX, sanitize(attribute))
    }

    /// Value placeholder for an attribute: `:AMZN_MAPPED_<attr>`
    pub fn value_placeholder(attribute: &str) -> String {
        format!(":{}{}", MAPPED_PREFIX, sanitize(attribute))
    }

    /// Name bindings in the form the request builders take, `None` when empty
    ///
    /// DynamoDB rejects requests carrying empty expression maps.
    pub fn names_or_none(&self) -> Option<HashMap<String, String>> {
        if self.names.is_empty() {
            None
        } else {
            Some(self.names.clone())
        }
    }

    /// Value bindings in builder form, `None` when empty
    pub fn values_or_none(&self) -> Option<HashMap<String, AttributeValue>> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.clone())
        }
    }
}

/// Placeholder names must match `[A-Za-z0-9_]+`
fn sanitize(attribute: &str) -> String {
    attribute
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Merge two name-binding maps, rejecting conflicting bindings
pub(crate) fn merge_names(
    mut base: HashMap<String, String>,
    extra: HashMap<String, String>,
) -> Result<HashMap<String, String>, Error> {
    for (placeholder, name) in extra {
        match base.get(&placeholder) {
            Some(existing) if *existing != name => {
                return Err(Error::PlaceholderConflict { placeholder });
            }
            _ => {
                let _ = base.insert(placeholder, name);
            }
        }
    }
    Ok(base)
}

/// Merge two value-binding maps, rejecting conflicting bindings
pub(crate) fn merge_values(
    mut base: HashMap<String, AttributeValue>,
    extra: HashMap<String, AttributeValue>,
) -> Result<HashMap<String, AttributeValue>, Error> {
    for (placeholder, value) in extra {
        match base.get(&placeholder) {
            Some(existing) if *existing != value => {
                return Err(Error::PlaceholderConflict { placeholder });
            }
            _ => {
                let _ = base.insert(placeholder, value);
            }
        }
    }
    Ok(base)
}

/// `Some` when the map is non-empty, for builder `set_` calls
pub(crate) fn map_or_none<V>(map: HashMap<String, V>) -> Option<HashMap<String, V>> {
    if map.is_empty() { None } else { Some(map) }
}
