use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::query::{QueryInput, QueryOutput};
use std::future::Future;

use crate::conditional::QueryConditional;
use crate::error::Error;
use crate::expression::{self, Expression};
use crate::extension::ExtensionChain;
use crate::operations::{OperationContext, PaginatedOperation, TableOperation};
use crate::pages::Page;
use crate::schema::{AttributeMap, TableSchema};

/// Query a table or secondary index by key condition
///
/// One execution fetches one page; the lazy multi-page stream lives in
/// [`crate::pages`].
#[derive(Debug, Clone)]
pub struct QueryOperation {
    conditional: QueryConditional,
    filter: Option<Expression>,
    exclusive_start_key: Option<AttributeMap>,
    limit: Option<i32>,
    consistent_read: Option<bool>,
    scan_index_forward: Option<bool>,
}

impl QueryOperation {
    /// Query items matching `conditional`
    pub fn new(conditional: QueryConditional) -> Self {
        Self {
            conditional,
            filter: None,
            exclusive_start_key: None,
            limit: None,
            consistent_read: None,
            scan_index_forward: None,
        }
    }

    /// Post-filter the matched items server-side
    ///
    /// Filter placeholders must avoid the generated
    /// [`crate::expression::MAPPED_PREFIX`] prefix; a collision with the key
    /// condition fails request generation.
    pub fn filter(mut self, filter: Expression) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Resume from a previous page's last evaluated key
    pub fn exclusive_start_key(mut self, key: AttributeMap) -> Self {
        self.exclusive_start_key = Some(key);
        self
    }

    /// Cap the number of items evaluated per page
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Request a strongly or eventually consistent read
    pub fn consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }

    /// Iterate the sort key ascending (`true`, the default) or descending
    pub fn scan_index_forward(mut self, forward: bool) -> Self {
        self.scan_index_forward = Some(forward);
        self
    }
}

impl<S: TableSchema> TableOperation<S> for QueryOperation {
    type Request = QueryInput;
    type Response = QueryOutput;
    type Output = Page<S::Item>;

    fn generate_request(
        &self,
        schema: &S,
        context: &OperationContext,
        _extensions: Option<&ExtensionChain>,
    ) -> Result<Self::Request, Error> {
        let key_condition = self
            .conditional
            .expression(schema.metadata(), context.index_name())?;

        let mut names = key_condition.names().clone();
        let mut values = key_condition.values().clone();
        let filter_expression = match &self.filter {
            None => None,
            Some(filter) => {
                names = expression::merge_names(names, filter.names().clone())?;
                values = expression::merge_values(values, filter.values().clone())?;
                Some(filter.expression().to_string())
            }
        };

        Ok(QueryInput::builder()
            .table_name(context.table_name())
            .set_index_name(context.index_name_or_none())
            .key_condition_expression(key_condition.expression())
            .set_filter_expression(filter_expression)
            .set_expression_attribute_names(expression::map_or_none(names))
            .set_expression_attribute_values(expression::map_or_none(values))
            .set_exclusive_start_key(self.exclusive_start_key.clone())
            .set_limit(self.limit)
            .set_consistent_read(self.consistent_read)
            .set_scan_index_forward(self.scan_index_forward)
            .build()?)
    }

    fn service_call(
        client: &Client,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Error>> + Send {
        async move {
            Ok(client
                .query()
                .set_table_name(request.table_name)
                .set_index_name(request.index_name)
                .set_key_condition_expression(request.key_condition_expression)
                .set_filter_expression(request.filter_expression)
                .set_expression_attribute_names(request.expression_attribute_names)
                .set_expression_attribute_values(request.expression_attribute_values)
                .set_exclusive_start_key(request.exclusive_start_key)
                .set_limit(request.limit)
                .set_consistent_read(request.consistent_read)
                .set_scan_index_forward(request.scan_index_forward)
                .send()
                .await?)
        }
    }

    fn transform_response(
        &self,
        response: Self::Response,
        schema: &S,
        context: &OperationContext,
        extensions: Option<&ExtensionChain>,
    ) -> Result<Self::Output, Error> {
        let mut items = Vec::new();
        for item in response.items.unwrap_or_default() {
            let item =
                ExtensionChain::apply_after_read(extensions, item, context, schema.metadata())?;
            if let Some(item) = schema.map_to_item(Some(item))? {
                items.push(item);
            }
        }
        Ok(Page::new(items, response.last_evaluated_key))
    }
}

impl<S: TableSchema> PaginatedOperation<S> for QueryOperation {
    fn set_exclusive_start_key(request: &mut Self::Request, key: Option<AttributeMap>) {
        request.exclusive_start_key = key;
    }

    fn last_evaluated_key(response: &Self::Response) -> Option<&AttributeMap> {
        response.last_evaluated_key.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{MapperExtension, ReadModification};
    use crate::key::Key;
    use crate::schema::{ItemSchema, TableMetadata};
    use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Event {
        id: String,
        sort: String,
    }

    fn schema() -> ItemSchema<Event> {
        ItemSchema::new(
            TableMetadata::builder("events")
                .partition_key("id", ScalarAttributeType::S)
                .sort_key("sort", ScalarAttributeType::S)
                .secondary_index(
                    "sort-index",
                    ("sort", ScalarAttributeType::S),
                    None,
                )
                .build()
                .unwrap(),
        )
    }

    fn equal_to_a() -> QueryConditional {
        QueryConditional::EqualTo(Key::new(AttributeValue::S("A".to_string())))
    }

    #[test]
    fn test_generated_key_condition_uses_mapped_placeholders() {
        let operation = QueryOperation::new(equal_to_a());
        let context = OperationContext::primary("events");
        let request = TableOperation::<ItemSchema<Event>>::generate_request(
            &operation,
            &schema(),
            &context,
            None,
        )
        .unwrap();

        assert_eq!(
            request.key_condition_expression.as_deref(),
            Some("#AMZN_MAPPED_id = :AMZN_MAPPED_id")
        );
        let names = request.expression_attribute_names.unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names["#AMZN_MAPPED_id"], "id");
        let values = request.expression_attribute_values.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(
            values[":AMZN_MAPPED_id"],
            AttributeValue::S("A".to_string())
        );
        assert!(request.index_name.is_none());
    }

    #[test]
    fn test_filter_bindings_are_merged() {
        let filter = Expression::new("#s = :status")
            .with_name("#s", "status")
            .with_value(":status", AttributeValue::S("open".to_string()));
        let operation = QueryOperation::new(equal_to_a()).filter(filter).limit(25);
        let context = OperationContext::primary("events");
        let request = TableOperation::<ItemSchema<Event>>::generate_request(
            &operation,
            &schema(),
            &context,
            None,
        )
        .unwrap();

        assert_eq!(request.filter_expression.as_deref(), Some("#s = :status"));
        assert_eq!(request.limit, Some(25));
        let names = request.expression_attribute_names.unwrap();
        assert_eq!(names.len(), 2);
        let values = request.expression_attribute_values.unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_conflicting_filter_placeholder_fails() {
        let filter = Expression::new("#AMZN_MAPPED_id = :x").with_name("#AMZN_MAPPED_id", "other");
        let operation = QueryOperation::new(equal_to_a()).filter(filter);
        let context = OperationContext::primary("events");
        let err = TableOperation::<ItemSchema<Event>>::generate_request(
            &operation,
            &schema(),
            &context,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, Error::PlaceholderConflict { .. }));
    }

    #[test]
    fn test_secondary_index_is_carried_on_the_request() {
        let operation = QueryOperation::new(equal_to_a());
        let context = OperationContext::secondary_index("events", "sort-index");
        let request = TableOperation::<ItemSchema<Event>>::generate_request(
            &operation,
            &schema(),
            &context,
            None,
        )
        .unwrap();

        assert_eq!(request.index_name.as_deref(), Some("sort-index"));
        let names = request.expression_attribute_names.unwrap();
        assert_eq!(names["#AMZN_MAPPED_sort"], "sort");
    }

    #[test]
    fn test_transform_preserves_item_order_and_raw_continuation() {
        let operation = QueryOperation::new(equal_to_a());
        let context = OperationContext::primary("events");

        let item = |sort: &str| {
            let mut map = AttributeMap::new();
            let _ = map.insert("id".to_string(), AttributeValue::S("A".to_string()));
            let _ = map.insert("sort".to_string(), AttributeValue::S(sort.to_string()));
            map
        };
        let last_key = item("b");
        let response = QueryOutput::builder()
            .items(item("a"))
            .items(item("b"))
            .set_last_evaluated_key(Some(last_key.clone()))
            .build();

        let page = operation
            .transform_response(response, &schema(), &context, None)
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].sort, "a");
        assert_eq!(page.items[1].sort, "b");
        assert_eq!(page.last_evaluated_key, Some(last_key));
    }

    /// Prefixes the sort attribute of every item read back
    struct PrefixSort;

    impl MapperExtension for PrefixSort {
        fn after_read(
            &self,
            item: &AttributeMap,
            _context: &OperationContext,
            _metadata: &TableMetadata,
        ) -> Result<ReadModification, Error> {
            let mut item = item.clone();
            if let Some(AttributeValue::S(sort)) = item.get("sort") {
                let decorated = AttributeValue::S(format!("read:{sort}"));
                let _ = item.insert("sort".to_string(), decorated);
            }
            Ok(ReadModification {
                transformed_item: Some(item),
            })
        }
    }

    #[test]
    fn test_transform_rewrites_items_through_the_read_chain_in_order() {
        let chain = ExtensionChain::new(vec![Box::new(PrefixSort)]);
        let operation = QueryOperation::new(equal_to_a());
        let context = OperationContext::primary("events");

        let item = |sort: &str| {
            let mut map = AttributeMap::new();
            let _ = map.insert("id".to_string(), AttributeValue::S("A".to_string()));
            let _ = map.insert("sort".to_string(), AttributeValue::S(sort.to_string()));
            map
        };
        let response = QueryOutput::builder()
            .items(item("a"))
            .items(item("b"))
            .build();

        let page = operation
            .transform_response(response, &schema(), &context, Some(&chain))
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].sort, "read:a");
        assert_eq!(page.items[1].sort, "read:b");
    }
}
