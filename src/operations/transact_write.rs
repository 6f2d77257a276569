use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::transact_write_items::{
    TransactWriteItemsInput, TransactWriteItemsOutput,
};
use aws_sdk_dynamodb::types::{ConditionCheck, Delete, Put, TransactWriteItem};
use std::fmt;
use std::future::Future;

use crate::error::Error;
use crate::expression::Expression;
use crate::extension::ExtensionChain;
use crate::key::Key;
use crate::operations::{DatabaseOperation, OperationContext};
use crate::schema::{PRIMARY_INDEX, Projection, TableSchema};

/// An ordered list of writes executed as one atomic transaction
///
/// Entries are resolved against their schemas as they are added: puts run
/// the extension chain's `before_write` exactly as single-item PutItem does,
/// with any extension condition coalesced onto the entry's own. Nothing is
/// read back, so `after_read` is never involved.
#[derive(Debug, Clone)]
pub struct WriteTransaction {
    items: Vec<TransactWriteItem>,
}

impl WriteTransaction {
    /// Start an empty write transaction
    pub fn builder(extensions: Option<&ExtensionChain>) -> WriteTransactionBuilder<'_> {
        WriteTransactionBuilder {
            extensions,
            items: Vec::new(),
        }
    }

    /// Number of writes in the transaction
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the transaction holds no writes
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builder for [`WriteTransaction`]
pub struct WriteTransactionBuilder<'a> {
    extensions: Option<&'a ExtensionChain>,
    items: Vec<TransactWriteItem>,
}

impl WriteTransactionBuilder<'_> {
    /// Append an unconditional put of `item`
    pub fn put<S: TableSchema>(self, schema: &S, item: S::Item) -> Result<Self, Error> {
        self.put_entry(schema, item, None)
    }

    /// Append a put of `item` guarded by `condition`
    pub fn put_with_condition<S: TableSchema>(
        self,
        schema: &S,
        item: S::Item,
        condition: Expression,
    ) -> Result<Self, Error> {
        self.put_entry(schema, item, Some(condition))
    }

    /// Append an unconditional delete of `key`
    pub fn delete<S: TableSchema>(self, schema: &S, key: Key) -> Result<Self, Error> {
        self.delete_entry(schema, key, None)
    }

    /// Append a delete of `key` guarded by `condition`
    pub fn delete_with_condition<S: TableSchema>(
        self,
        schema: &S,
        key: Key,
        condition: Expression,
    ) -> Result<Self, Error> {
        self.delete_entry(schema, key, Some(condition))
    }

    /// Append a pure condition check against the item stored under `key`
    ///
    /// The check writes nothing; it only makes the whole transaction fail
    /// when `condition` does not hold.
    pub fn condition_check<S: TableSchema>(
        mut self,
        schema: &S,
        key: Key,
        condition: Expression,
    ) -> Result<Self, Error> {
        let metadata = schema.metadata();
        let key = key.key_map(metadata, PRIMARY_INDEX)?;
        let check = ConditionCheck::builder()
            .table_name(metadata.table_name())
            .set_key(Some(key))
            .condition_expression(condition.expression())
            .set_expression_attribute_names(condition.names_or_none())
            .set_expression_attribute_values(condition.values_or_none())
            .build()?;
        self.items
            .push(TransactWriteItem::builder().condition_check(check).build());
        Ok(self)
    }

    /// Seal the transaction
    pub fn build(self) -> WriteTransaction {
        WriteTransaction { items: self.items }
    }

    fn put_entry<S: TableSchema>(
        mut self,
        schema: &S,
        item: S::Item,
        condition: Option<Expression>,
    ) -> Result<Self, Error> {
        let metadata = schema.metadata();
        let context = OperationContext::primary(metadata.table_name());
        let item = schema.item_to_map(&item, Projection::All)?;
        let (item, extension_condition) =
            ExtensionChain::apply_before_write(self.extensions, item, &context, metadata)?;

        let mut condition = condition;
        if let Some(extra) = extension_condition {
            condition = Some(Expression::coalesce(condition, extra)?);
        }

        let mut builder = Put::builder()
            .table_name(metadata.table_name())
            .set_item(Some(item));
        if let Some(condition) = &condition {
            builder = builder
                .condition_expression(condition.expression())
                .set_expression_attribute_names(condition.names_or_none())
                .set_expression_attribute_values(condition.values_or_none());
        }
        self.items
            .push(TransactWriteItem::builder().put(builder.build()?).build());
        Ok(self)
    }

    fn delete_entry<S: TableSchema>(
        mut self,
        schema: &S,
        key: Key,
        condition: Option<Expression>,
    ) -> Result<Self, Error> {
        let metadata = schema.metadata();
        let key = key.key_map(metadata, PRIMARY_INDEX)?;

        let mut builder = Delete::builder()
            .table_name(metadata.table_name())
            .set_key(Some(key));
        if let Some(condition) = &condition {
            builder = builder
                .condition_expression(condition.expression())
                .set_expression_attribute_names(condition.names_or_none())
                .set_expression_attribute_values(condition.values_or_none());
        }
        self.items
            .push(TransactWriteItem::builder().delete(builder.build()?).build());
        Ok(self)
    }
}

impl fmt::Debug for WriteTransactionBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteTransactionBuilder")
            .field("items", &self.items.len())
            .finish_non_exhaustive()
    }
}

/// Write up to 100 puts, deletes and condition checks atomically
#[derive(Debug, Clone)]
pub struct TransactWriteItemsOperation {
    transaction: WriteTransaction,
}

impl TransactWriteItemsOperation {
    /// Execute the given write transaction
    pub fn new(transaction: WriteTransaction) -> Self {
        Self { transaction }
    }
}

impl DatabaseOperation for TransactWriteItemsOperation {
    type Request = TransactWriteItemsInput;
    type Response = TransactWriteItemsOutput;
    type Output = ();

    fn generate_request(&self) -> Result<Self::Request, Error> {
        Ok(TransactWriteItemsInput::builder()
            .set_transact_items(Some(self.transaction.items.clone()))
            .build()?)
    }

    fn service_call(
        client: &Client,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Error>> + Send {
        async move {
            Ok(client
                .transact_write_items()
                .set_transact_items(request.transact_items)
                .send()
                .await?)
        }
    }

    fn transform_response(&self, _response: Self::Response) -> Result<Self::Output, Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{MapperExtension, WriteModification};
    use crate::schema::{AttributeMap, ItemSchema, TableMetadata};
    use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ledger {
        entry_id: String,
        amount: i64,
    }

    fn schema() -> ItemSchema<Ledger> {
        ItemSchema::new(
            TableMetadata::builder("ledger")
                .partition_key("entry_id", ScalarAttributeType::S)
                .build()
                .unwrap(),
        )
    }

    fn entry(id: &str) -> Ledger {
        Ledger {
            entry_id: id.to_string(),
            amount: 1,
        }
    }

    struct AddCondition;

    impl MapperExtension for AddCondition {
        fn before_write(
            &self,
            _item: &AttributeMap,
            _context: &OperationContext,
            _metadata: &TableMetadata,
        ) -> Result<WriteModification, Error> {
            Ok(WriteModification {
                transformed_item: None,
                additional_condition: Some(Expression::new("attribute_not_exists(entry_id)")),
            })
        }
    }

    #[test]
    fn test_entries_keep_request_order() {
        let schema = schema();
        let transaction = WriteTransaction::builder(None)
            .put(&schema, entry("e-1"))
            .unwrap()
            .delete(&schema, Key::new(AttributeValue::S("e-2".to_string())))
            .unwrap()
            .condition_check(
                &schema,
                Key::new(AttributeValue::S("e-3".to_string())),
                Expression::new("attribute_exists(entry_id)"),
            )
            .unwrap()
            .build();
        let operation = TransactWriteItemsOperation::new(transaction);
        let request = operation.generate_request().unwrap();

        let items = request.transact_items.unwrap();
        assert_eq!(items.len(), 3);
        assert!(items[0].put.is_some());
        assert!(items[1].delete.is_some());
        assert!(items[2].condition_check.is_some());
    }

    #[test]
    fn test_put_marshals_through_the_schema() {
        let schema = schema();
        let transaction = WriteTransaction::builder(None)
            .put(&schema, entry("e-1"))
            .unwrap()
            .build();
        let operation = TransactWriteItemsOperation::new(transaction);
        let request = operation.generate_request().unwrap();

        let items = request.transact_items.unwrap();
        let put = items[0].put.as_ref().unwrap();
        assert_eq!(put.table_name, "ledger");
        assert_eq!(put.item["entry_id"], AttributeValue::S("e-1".to_string()));
        assert!(put.condition_expression.is_none());
    }

    #[test]
    fn test_extension_condition_is_coalesced_onto_the_put() {
        let schema = schema();
        let chain = ExtensionChain::new(vec![Box::new(AddCondition)]);
        let transaction = WriteTransaction::builder(Some(&chain))
            .put_with_condition(&schema, entry("e-1"), Expression::new("amount > :zero"))
            .unwrap()
            .build();
        let operation = TransactWriteItemsOperation::new(transaction);
        let request = operation.generate_request().unwrap();

        let items = request.transact_items.unwrap();
        let put = items[0].put.as_ref().unwrap();
        assert_eq!(
            put.condition_expression.as_deref(),
            Some("(amount > :zero) AND (attribute_not_exists(entry_id))")
        );
    }

    #[test]
    fn test_delete_condition_is_carried() {
        let schema = schema();
        let transaction = WriteTransaction::builder(None)
            .delete_with_condition(
                &schema,
                Key::new(AttributeValue::S("e-1".to_string())),
                Expression::new("#a = :v")
                    .with_name("#a", "amount")
                    .with_value(":v", AttributeValue::N("0".to_string())),
            )
            .unwrap()
            .build();
        let operation = TransactWriteItemsOperation::new(transaction);
        let request = operation.generate_request().unwrap();

        let items = request.transact_items.unwrap();
        let delete = items[0].delete.as_ref().unwrap();
        assert_eq!(delete.condition_expression.as_deref(), Some("#a = :v"));
        assert_eq!(delete.key["entry_id"], AttributeValue::S("e-1".to_string()));
    }
}
