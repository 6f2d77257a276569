//! End-to-end request generation through the public surface: conditionals,
//! generated placeholders, filters and the extension chain.

use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};
use dynamo_mapper::operations::{
    GetItemOperation, OperationContext, PutItemOperation, QueryOperation, TableOperation,
};
use dynamo_mapper::{
    AttributeMap, Error, Expression, ExtensionChain, ItemSchema, Key, MapperExtension,
    QueryConditional, TableMetadata, TableSchema, WriteModification,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Song {
    artist: String,
    title: String,
    year: u32,
}

fn songs() -> ItemSchema<Song> {
    ItemSchema::new(
        TableMetadata::builder("songs")
            .partition_key("artist", ScalarAttributeType::S)
            .sort_key("title", ScalarAttributeType::S)
            .secondary_index(
                "year-index",
                ("year", ScalarAttributeType::N),
                Some(("title", ScalarAttributeType::S)),
            )
            .build()
            .unwrap(),
    )
}

fn key(artist: &str) -> Key {
    Key::new(AttributeValue::S(artist.to_string()))
}

#[test]
fn equal_to_generates_the_mapped_placeholder_pair() {
    let operation = QueryOperation::new(QueryConditional::EqualTo(key("Nina")));
    let request = TableOperation::<ItemSchema<Song>>::generate_request(
        &operation,
        &songs(),
        &OperationContext::primary("songs"),
        None,
    )
    .unwrap();

    assert_eq!(
        request.key_condition_expression.as_deref(),
        Some("#AMZN_MAPPED_artist = :AMZN_MAPPED_artist")
    );
    let names = request.expression_attribute_names.unwrap();
    assert_eq!(names["#AMZN_MAPPED_artist"], "artist");
    let values = request.expression_attribute_values.unwrap();
    assert_eq!(
        values[":AMZN_MAPPED_artist"],
        AttributeValue::S("Nina".to_string())
    );
}

#[test]
fn equal_to_with_sort_value_conjoins_both_halves() {
    let conditional = QueryConditional::EqualTo(
        key("Nina").with_sort_value(AttributeValue::S("Feeling Good".to_string())),
    );
    let operation = QueryOperation::new(conditional);
    let request = TableOperation::<ItemSchema<Song>>::generate_request(
        &operation,
        &songs(),
        &OperationContext::primary("songs"),
        None,
    )
    .unwrap();

    assert_eq!(
        request.key_condition_expression.as_deref(),
        Some(
            "#AMZN_MAPPED_artist = :AMZN_MAPPED_artist \
             AND #AMZN_MAPPED_title = :AMZN_MAPPED_title"
        )
    );
}

#[test]
fn between_uses_suffixed_value_placeholders() {
    let conditional = QueryConditional::Between(
        key("Nina").with_sort_value(AttributeValue::S("A".to_string())),
        key("Nina").with_sort_value(AttributeValue::S("M".to_string())),
    );
    let operation = QueryOperation::new(conditional);
    let request = TableOperation::<ItemSchema<Song>>::generate_request(
        &operation,
        &songs(),
        &OperationContext::primary("songs"),
        None,
    )
    .unwrap();

    let expression = request.key_condition_expression.unwrap();
    assert!(expression.contains(
        "#AMZN_MAPPED_title BETWEEN :AMZN_MAPPED_title1 AND :AMZN_MAPPED_title2"
    ));
    let values = request.expression_attribute_values.unwrap();
    assert_eq!(
        values[":AMZN_MAPPED_title1"],
        AttributeValue::S("A".to_string())
    );
    assert_eq!(
        values[":AMZN_MAPPED_title2"],
        AttributeValue::S("M".to_string())
    );
}

#[test]
fn begins_with_rejects_a_numeric_sort_attribute() {
    let conditional = QueryConditional::BeginsWith(
        key("Nina").with_sort_value(AttributeValue::S("19".to_string())),
    );
    let operation = QueryOperation::new(conditional);
    // A table sorted on a numeric attribute; begins_with cannot apply.
    let schema = ItemSchema::<Song>::new(
        TableMetadata::builder("songs")
            .partition_key("artist", ScalarAttributeType::S)
            .sort_key("year", ScalarAttributeType::N)
            .build()
            .unwrap(),
    );
    let err = TableOperation::<ItemSchema<Song>>::generate_request(
        &operation,
        &schema,
        &OperationContext::primary("songs"),
        None,
    )
    .unwrap_err();

    assert!(matches!(err, Error::BeginsWithNumericSortKey { .. }));
    assert!(err.is_invalid_request());
}

#[test]
fn sort_conditional_against_sortless_table_fails_before_io() {
    let sortless = ItemSchema::<Song>::new(
        TableMetadata::builder("songs")
            .partition_key("artist", ScalarAttributeType::S)
            .build()
            .unwrap(),
    );
    let conditional = QueryConditional::LessThan(
        key("Nina").with_sort_value(AttributeValue::S("M".to_string())),
    );
    let operation = QueryOperation::new(conditional);
    let err = TableOperation::<ItemSchema<Song>>::generate_request(
        &operation,
        &sortless,
        &OperationContext::primary("songs"),
        None,
    )
    .unwrap_err();

    assert!(matches!(err, Error::NoIndexSortKey { .. }));
}

#[test]
fn secondary_index_conditional_resolves_index_key_names() {
    let conditional = QueryConditional::GreaterThanOrEqualTo(
        Key::new(AttributeValue::N("1964".to_string()))
            .with_sort_value(AttributeValue::S("F".to_string())),
    );
    let operation = QueryOperation::new(conditional);
    let request = TableOperation::<ItemSchema<Song>>::generate_request(
        &operation,
        &songs(),
        &OperationContext::secondary_index("songs", "year-index"),
        None,
    )
    .unwrap();

    assert_eq!(request.index_name.as_deref(), Some("year-index"));
    let expression = request.key_condition_expression.unwrap();
    assert!(expression.contains("#AMZN_MAPPED_year = :AMZN_MAPPED_year"));
    assert!(expression.contains("#AMZN_MAPPED_title >= :AMZN_MAPPED_title"));
}

#[test]
fn get_item_against_a_secondary_index_is_rejected() {
    let operation = GetItemOperation::new(key("Nina"));
    let err = TableOperation::<ItemSchema<Song>>::generate_request(
        &operation,
        &songs(),
        &OperationContext::secondary_index("songs", "year-index"),
        None,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        Error::PrimaryIndexRequired {
            operation: "GetItem",
            ..
        }
    ));
}

/// Stamps a version attribute and guards against overwriting a newer one.
struct Versioning;

impl MapperExtension for Versioning {
    fn before_write(
        &self,
        item: &AttributeMap,
        _context: &OperationContext,
        _metadata: &TableMetadata,
    ) -> Result<WriteModification, Error> {
        let mut item = item.clone();
        let _ = item.insert("version".to_string(), AttributeValue::N("1".to_string()));
        Ok(WriteModification {
            transformed_item: Some(item),
            additional_condition: Some(Expression::new("attribute_not_exists(version)")),
        })
    }
}

#[test]
fn put_item_threads_the_extension_chain_through_the_request() {
    let chain = ExtensionChain::new(vec![Box::new(Versioning)]);
    let song = Song {
        artist: "Nina".to_string(),
        title: "Feeling Good".to_string(),
        year: 1965,
    };
    let operation = PutItemOperation::<ItemSchema<Song>>::new(song)
        .condition(Expression::new("attribute_exists(artist)"));
    let request = operation
        .generate_request(&songs(), &OperationContext::primary("songs"), Some(&chain))
        .unwrap();

    let item = request.item.unwrap();
    assert_eq!(item["version"], AttributeValue::N("1".to_string()));
    assert_eq!(
        request.condition_expression.as_deref(),
        Some("(attribute_exists(artist)) AND (attribute_not_exists(version))")
    );
}

#[test]
fn index_start_key_unions_primary_and_index_attributes() {
    let schema = songs();
    let mut item = AttributeMap::new();
    let _ = item.insert("artist".to_string(), AttributeValue::S("Nina".to_string()));
    let _ = item.insert(
        "title".to_string(),
        AttributeValue::S("Feeling Good".to_string()),
    );
    let _ = item.insert("year".to_string(), AttributeValue::N("1965".to_string()));

    let start_key = schema
        .metadata()
        .index_start_key(&item, "year-index")
        .unwrap();
    assert_eq!(start_key.len(), 3);
    assert!(start_key.contains_key("artist"));
    assert!(start_key.contains_key("title"));
    assert!(start_key.contains_key("year"));

    let mut partial = item.clone();
    let _ = partial.remove("year");
    let err = schema
        .metadata()
        .index_start_key(&partial, "year-index")
        .unwrap_err();
    assert!(matches!(err, Error::MissingKeyAttribute { .. }));
}
