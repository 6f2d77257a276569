use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};

use crate::error::Error;
use crate::expression::Expression;
use crate::key::Key;
use crate::schema::{IndexMetadata, TableMetadata};

/// A key-condition variant for queries against a table or index
///
/// Each variant is a pure function from a table's key layout to an
/// [`Expression`]; nothing is resolved until [`QueryConditional::expression`]
/// runs against concrete metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryConditional {
    /// Partition equality, plus sort equality when the key carries a sort value
    EqualTo(Key),
    /// Partition equality and `sort > value`
    GreaterThan(Key),
    /// Partition equality and `sort >= value`
    GreaterThanOrEqualTo(Key),
    /// Partition equality and `sort < value`
    LessThan(Key),
    /// Partition equality and `sort <= value`
    LessThanOrEqualTo(Key),
    /// Partition equality and a string/binary prefix match on the sort key
    BeginsWith(Key),
    /// Partition equality and `sort BETWEEN lower AND upper`
    Between(Key, Key),
}

impl QueryConditional {
    /// Resolve the conditional into a key-condition expression for the given
    /// index
    ///
    /// Sort-based variants require the index to declare a sort key and the
    /// key to carry a sort value; `BeginsWith` additionally rejects numeric
    /// sort attributes.
    pub fn expression(
        &self,
        metadata: &TableMetadata,
        index_name: &str,
    ) -> Result<Expression, Error> {
        let index = metadata.index(index_name)?;
        match self {
            QueryConditional::EqualTo(key) => equal_to(key, index),
            QueryConditional::GreaterThan(key) => sort_compare(key, ">", index, index_name),
            QueryConditional::GreaterThanOrEqualTo(key) => {
                sort_compare(key, ">=", index, index_name)
            }
            QueryConditional::LessThan(key) => sort_compare(key, "<", index, index_name),
            QueryConditional::LessThanOrEqualTo(key) => sort_compare(key, "<=", index, index_name),
            QueryConditional::BeginsWith(key) => begins_with(key, index, index_name),
            QueryConditional::Between(lower, upper) => between(lower, upper, index, index_name),
        }
    }
}

/// Partition-equality fragment shared by every variant
fn partition_fragment(key: &Key, index: &IndexMetadata) -> Expression {
    let attribute = index.partition_key().name();
    let name = Expression::name_placeholder(attribute);
    let value = Expression::value_placeholder(attribute);

    Expression::new(format!("{name} = {value}"))
        .with_name(name, attribute)
        .with_value(value, key.partition_value().clone())
}

/// Sort key of the index, or the invalid-argument error for this conditional
fn require_sort_key<'a>(
    index: &'a IndexMetadata,
    index_name: &str,
) -> Result<&'a str, Error> {
    index
        .sort_key()
        .map(|key| key.name())
        .ok_or_else(|| Error::NoIndexSortKey {
            index: index_name.to_string(),
        })
}

fn require_sort_value(key: &Key) -> Result<AttributeValue, Error> {
    key.sort_value().cloned().ok_or(Error::MissingSortValue)
}

fn equal_to(key: &Key, index: &IndexMetadata) -> Result<Expression, Error> {
    let partition = partition_fragment(key, index);

    let (Some(sort_key), Some(sort_value)) = (index.sort_key(), key.sort_value()) else {
        return Ok(partition);
    };

    let attribute = sort_key.name();
    let name = Expression::name_placeholder(attribute);
    let value = Expression::value_placeholder(attribute);
    let expression = format!("{} AND {name} = {value}", partition.expression());

    Ok(partition
        .with_name(name, attribute)
        .with_value(value, sort_value.clone())
        .with_expression(expression))
}

fn sort_compare(
    key: &Key,
    operator: &str,
    index: &IndexMetadata,
    index_name: &str,
) -> Result<Expression, Error> {
    let attribute = require_sort_key(index, index_name)?.to_string();
    let sort_value = require_sort_value(key)?;

    let partition = partition_fragment(key, index);
    let name = Expression::name_placeholder(&attribute);
    let value = Expression::value_placeholder(&attribute);
    let expression = format!("{} AND {name} {operator} {value}", partition.expression());

    Ok(partition
        .with_name(name, attribute)
        .with_value(value, sort_value)
        .with_expression(expression))
}

fn begins_with(key: &Key, index: &IndexMetadata, index_name: &str) -> Result<Expression, Error> {
    let sort_key = index.sort_key().ok_or_else(|| Error::NoIndexSortKey {
        index: index_name.to_string(),
    })?;
    if *sort_key.attribute_type() == ScalarAttributeType::N {
        return Err(Error::BeginsWithNumericSortKey {
            attribute: sort_key.name().to_string(),
        });
    }
    let attribute = sort_key.name().to_string();
    let sort_value = require_sort_value(key)?;

    let partition = partition_fragment(key, index);
    let name = Expression::name_placeholder(&attribute);
    let value = Expression::value_placeholder(&attribute);
    let expression = format!(
        "{} AND begins_with({name}, {value})",
        partition.expression()
    );

    Ok(partition
        .with_name(name, attribute)
        .with_value(value, sort_value)
        .with_expression(expression))
}

fn between(
    lower: &Key,
    upper: &Key,
    index: &IndexMetadata,
    index_name: &str,
) -> Result<Expression, Error> {
    let attribute = require_sort_key(index, index_name)?.to_string();
    let lower_value = require_sort_value(lower)?;
    let upper_value = require_sort_value(upper)?;

    let partition = partition_fragment(lower, index);
    let name = Expression::name_placeholder(&attribute);
    let value_lower = format!("{}1", Expression::value_placeholder(&attribute));
    let value_upper = format!("{}2", Expression::value_placeholder(&attribute));
    let expression = format!(
        "{} AND {name} BETWEEN {value_lower} AND {value_upper}",
        partition.expression()
    );

    Ok(partition
        .with_name(name, attribute)
        .with_value(value_lower, lower_value)
        .with_value(value_upper, upper_value)
        .with_expression(expression))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PRIMARY_INDEX;

    fn metadata() -> TableMetadata {
        TableMetadata::builder("music")
            .partition_key("id", ScalarAttributeType::S)
            .sort_key("sort", ScalarAttributeType::S)
            .secondary_index(
                "year-index",
                ("id", ScalarAttributeType::S),
                Some(("year", ScalarAttributeType::N)),
            )
            .build()
            .unwrap()
    }

    fn metadata_no_sort() -> TableMetadata {
        TableMetadata::builder("users")
            .partition_key("user_id", ScalarAttributeType::S)
            .build()
            .unwrap()
    }

    #[test]
    fn test_equal_to_partition_only() {
        let conditional = QueryConditional::EqualTo(Key::new(AttributeValue::S("A".to_string())));
        let expr = conditional.expression(&metadata(), PRIMARY_INDEX).unwrap();

        assert_eq!(expr.expression(), "#AMZN_MAPPED_id = :AMZN_MAPPED_id");
        assert_eq!(expr.names()["#AMZN_MAPPED_id"], "id");
        assert_eq!(
            expr.values()[":AMZN_MAPPED_id"],
            AttributeValue::S("A".to_string())
        );
        assert_eq!(expr.names().len(), 1);
        assert_eq!(expr.values().len(), 1);
    }

    #[test]
    fn test_equal_to_with_sort_value() {
        let key = Key::new(AttributeValue::S("A".to_string()))
            .with_sort_value(AttributeValue::S("B".to_string()));
        let expr = QueryConditional::EqualTo(key)
            .expression(&metadata(), PRIMARY_INDEX)
            .unwrap();

        assert_eq!(
            expr.expression(),
            "#AMZN_MAPPED_id = :AMZN_MAPPED_id AND #AMZN_MAPPED_sort = :AMZN_MAPPED_sort"
        );
        assert_eq!(expr.names()["#AMZN_MAPPED_sort"], "sort");
    }

    #[test]
    fn test_greater_than() {
        let key = Key::new(AttributeValue::S("A".to_string()))
            .with_sort_value(AttributeValue::S("B".to_string()));
        let expr = QueryConditional::GreaterThan(key)
            .expression(&metadata(), PRIMARY_INDEX)
            .unwrap();

        assert_eq!(
            expr.expression(),
            "#AMZN_MAPPED_id = :AMZN_MAPPED_id AND #AMZN_MAPPED_sort > :AMZN_MAPPED_sort"
        );
    }

    #[test]
    fn test_sort_comparison_without_sort_value_fails() {
        let key = Key::new(AttributeValue::S("A".to_string()));
        let err = QueryConditional::GreaterThan(key)
            .expression(&metadata(), PRIMARY_INDEX)
            .unwrap_err();
        assert!(matches!(err, Error::MissingSortValue));
    }

    #[test]
    fn test_sort_comparison_against_sortless_index_fails() {
        let key = Key::new(AttributeValue::S("A".to_string()))
            .with_sort_value(AttributeValue::S("B".to_string()));
        let err = QueryConditional::LessThan(key)
            .expression(&metadata_no_sort(), PRIMARY_INDEX)
            .unwrap_err();
        assert!(matches!(err, Error::NoIndexSortKey { .. }));
    }

    #[test]
    fn test_between() {
        let lower = Key::new(AttributeValue::S("A".to_string()))
            .with_sort_value(AttributeValue::S("B".to_string()));
        let upper = Key::new(AttributeValue::S("A".to_string()))
            .with_sort_value(AttributeValue::S("D".to_string()));
        let expr = QueryConditional::Between(lower, upper)
            .expression(&metadata(), PRIMARY_INDEX)
            .unwrap();

        assert_eq!(
            expr.expression(),
            "#AMZN_MAPPED_id = :AMZN_MAPPED_id AND #AMZN_MAPPED_sort \
             BETWEEN :AMZN_MAPPED_sort1 AND :AMZN_MAPPED_sort2"
        );
        assert_eq!(
            expr.values()[":AMZN_MAPPED_sort1"],
            AttributeValue::S("B".to_string())
        );
        assert_eq!(
            expr.values()[":AMZN_MAPPED_sort2"],
            AttributeValue::S("D".to_string())
        );
    }

    #[test]
    fn test_between_without_sort_values_fails() {
        let lower = Key::new(AttributeValue::S("A".to_string()));
        let upper = Key::new(AttributeValue::S("A".to_string()));
        let err = QueryConditional::Between(lower, upper)
            .expression(&metadata(), PRIMARY_INDEX)
            .unwrap_err();
        assert!(matches!(err, Error::MissingSortValue));
    }

    #[test]
    fn test_begins_with() {
        let key = Key::new(AttributeValue::S("A".to_string()))
            .with_sort_value(AttributeValue::S("pre".to_string()));
        let expr = QueryConditional::BeginsWith(key)
            .expression(&metadata(), PRIMARY_INDEX)
            .unwrap();

        assert_eq!(
            expr.expression(),
            "#AMZN_MAPPED_id = :AMZN_MAPPED_id AND \
             begins_with(#AMZN_MAPPED_sort, :AMZN_MAPPED_sort)"
        );
    }

    #[test]
    fn test_begins_with_on_numeric_sort_key_fails() {
        let key = Key::new(AttributeValue::S("A".to_string()))
            .with_sort_value(AttributeValue::N("19".to_string()));
        let err = QueryConditional::BeginsWith(key)
            .expression(&metadata(), "year-index")
            .unwrap_err();
        assert!(matches!(err, Error::BeginsWithNumericSortKey { attribute } if attribute == "year"));
    }
}
