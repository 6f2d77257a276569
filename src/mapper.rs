//! The high-level entry points: [`MapperClient`], [`MappedTable`] and
//! [`MappedIndex`]
//!
//! A `MapperClient` wraps the wire client together with an optional
//! extension chain; `table()` binds it to a schema, and `index()` narrows a
//! table to one of its secondary indexes. The index type only exposes query
//! and scan, so single-item calls against an index are unrepresentable.

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client;
use std::sync::Arc;
use tokio_stream::Stream;

use crate::error::Error;
use crate::expression::Expression;
use crate::extension::ExtensionChain;
use crate::key::Key;
use crate::operations::{
    BatchGetItemOperation, BatchGetResult, BatchWriteItemOperation, BatchWriteResult,
    DatabaseOperation, DeleteItemOperation, GetItemOperation, OperationContext, PutItemOperation,
    QueryOperation, ReadBatch, ReadBatchBuilder, ReadTransaction, ScanOperation, TableOperation,
    TransactGetItemsOperation, TransactGetResult, TransactWriteItemsOperation, WriteBatch,
    WriteBatchBuilder, WriteTransaction,
};
use crate::pages::{self, Page};
use crate::schema::TableSchema;

/// A DynamoDB client with mapping and extension support
#[derive(Debug, Clone)]
pub struct MapperClient {
    client: Client,
    extensions: Option<Arc<ExtensionChain>>,
}

impl MapperClient {
    /// Wrap an existing wire client, with no extensions
    pub fn new(client: Client) -> Self {
        Self {
            client,
            extensions: None,
        }
    }

    /// Wrap an existing wire client with an extension chain
    pub fn with_extensions(client: Client, extensions: ExtensionChain) -> Self {
        Self {
            client,
            extensions: Some(Arc::new(extensions)),
        }
    }

    /// Build a client from the ambient AWS environment
    ///
    /// Region and credentials resolve the standard way: environment
    /// variables, shared config files, then instance metadata.
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(Client::new(&config))
    }

    /// The underlying wire client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The extension chain, if one is configured
    pub fn extensions(&self) -> Option<&ExtensionChain> {
        self.extensions.as_deref()
    }

    /// Bind the client to a table schema
    pub fn table<S: TableSchema>(&self, schema: S) -> MappedTable<S> {
        MappedTable {
            client: self.client.clone(),
            schema: Arc::new(schema),
            extensions: self.extensions.clone(),
        }
    }

    /// Fetch items across tables in one BatchGetItem call
    pub async fn batch_get_item(&self, batches: Vec<ReadBatch>) -> Result<BatchGetResult, Error> {
        BatchGetItemOperation::new(batches)
            .execute(&self.client)
            .await
    }

    /// Write puts and deletes across tables in one BatchWriteItem call
    pub async fn batch_write_item(
        &self,
        batches: Vec<WriteBatch>,
    ) -> Result<BatchWriteResult, Error> {
        BatchWriteItemOperation::new(batches)
            .execute(&self.client)
            .await
    }

    /// Read items atomically across tables
    pub async fn transact_get_items(
        &self,
        transaction: ReadTransaction,
    ) -> Result<TransactGetResult, Error> {
        TransactGetItemsOperation::new(transaction)
            .execute(&self.client)
            .await
    }

    /// Write items atomically across tables
    pub async fn transact_write_items(
        &self,
        transaction: WriteTransaction,
    ) -> Result<(), Error> {
        TransactWriteItemsOperation::new(transaction)
            .execute(&self.client)
            .await
    }
}

/// A table bound to its schema, addressing the primary index
#[derive(Debug)]
pub struct MappedTable<S> {
    client: Client,
    schema: Arc<S>,
    extensions: Option<Arc<ExtensionChain>>,
}

impl<S> Clone for MappedTable<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            schema: Arc::clone(&self.schema),
            extensions: self.extensions.clone(),
        }
    }
}

impl<S: TableSchema> MappedTable<S> {
    fn context(&self) -> OperationContext {
        OperationContext::primary(self.schema.metadata().table_name())
    }

    /// The bound schema
    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// Get the item stored under `key`
    pub async fn get_item(&self, key: Key) -> Result<Option<S::Item>, Error> {
        GetItemOperation::new(key)
            .execute(
                &self.client,
                &*self.schema,
                &self.context(),
                self.extensions.as_deref(),
            )
            .await
    }

    /// Get the item stored under `key` with a strongly consistent read
    pub async fn get_item_consistent(&self, key: Key) -> Result<Option<S::Item>, Error> {
        GetItemOperation::new(key)
            .consistent_read(true)
            .execute(
                &self.client,
                &*self.schema,
                &self.context(),
                self.extensions.as_deref(),
            )
            .await
    }

    /// Put `item`, unconditionally
    pub async fn put_item(&self, item: S::Item) -> Result<(), Error> {
        PutItemOperation::<S>::new(item)
            .execute(
                &self.client,
                &*self.schema,
                &self.context(),
                self.extensions.as_deref(),
            )
            .await
    }

    /// Put `item` guarded by `condition`
    pub async fn put_item_with_condition(
        &self,
        item: S::Item,
        condition: Expression,
    ) -> Result<(), Error> {
        PutItemOperation::<S>::new(item)
            .condition(condition)
            .execute(
                &self.client,
                &*self.schema,
                &self.context(),
                self.extensions.as_deref(),
            )
            .await
    }

    /// Delete the item stored under `key`, returning the old item if any
    pub async fn delete_item(&self, key: Key) -> Result<Option<S::Item>, Error> {
        DeleteItemOperation::new(key)
            .execute(
                &self.client,
                &*self.schema,
                &self.context(),
                self.extensions.as_deref(),
            )
            .await
    }

    /// Delete the item stored under `key`, guarded by `condition`
    pub async fn delete_item_with_condition(
        &self,
        key: Key,
        condition: Expression,
    ) -> Result<Option<S::Item>, Error> {
        DeleteItemOperation::new(key)
            .condition(condition)
            .execute(
                &self.client,
                &*self.schema,
                &self.context(),
                self.extensions.as_deref(),
            )
            .await
    }

    /// Fetch one page of a query
    pub async fn query(&self, operation: QueryOperation) -> Result<Page<S::Item>, Error> {
        operation
            .execute(
                &self.client,
                &*self.schema,
                &self.context(),
                self.extensions.as_deref(),
            )
            .await
    }

    /// Stream every page of a query, lazily
    pub fn query_pages(
        &self,
        operation: QueryOperation,
    ) -> impl Stream<Item = Result<Page<S::Item>, Error>> {
        pages::paginate(
            self.client.clone(),
            Arc::clone(&self.schema),
            self.context(),
            self.extensions.clone(),
            operation,
        )
    }

    /// Fetch one page of a scan
    pub async fn scan(&self, operation: ScanOperation) -> Result<Page<S::Item>, Error> {
        operation
            .execute(
                &self.client,
                &*self.schema,
                &self.context(),
                self.extensions.as_deref(),
            )
            .await
    }

    /// Stream every page of a scan, lazily
    pub fn scan_pages(
        &self,
        operation: ScanOperation,
    ) -> impl Stream<Item = Result<Page<S::Item>, Error>> {
        pages::paginate(
            self.client.clone(),
            Arc::clone(&self.schema),
            self.context(),
            self.extensions.clone(),
            operation,
        )
    }

    /// Start a batch of reads against this table
    pub fn read_batch(&self) -> ReadBatchBuilder {
        ReadBatch::builder(self.schema.metadata())
    }

    /// Start a batch of writes against this table
    ///
    /// Put entries run this table's extension chain when the batch is built.
    pub fn write_batch(&self) -> WriteBatchBuilder<'_, S> {
        WriteBatch::builder(&*self.schema, self.extensions.as_deref())
    }

    /// Narrow the table to one of its secondary indexes
    pub fn index(&self, index_name: &str) -> Result<MappedIndex<S>, Error> {
        let _ = self.schema.metadata().index(index_name)?;
        Ok(MappedIndex {
            client: self.client.clone(),
            schema: Arc::clone(&self.schema),
            extensions: self.extensions.clone(),
            context: OperationContext::secondary_index(
                self.schema.metadata().table_name(),
                index_name,
            ),
        })
    }
}

/// A secondary index of a mapped table
///
/// Only query and scan exist here; the single-item operations are not part
/// of the surface.
#[derive(Debug)]
pub struct MappedIndex<S> {
    client: Client,
    schema: Arc<S>,
    extensions: Option<Arc<ExtensionChain>>,
    context: OperationContext,
}

impl<S> Clone for MappedIndex<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            schema: Arc::clone(&self.schema),
            extensions: self.extensions.clone(),
            context: self.context.clone(),
        }
    }
}

impl<S: TableSchema> MappedIndex<S> {
    /// The index name
    pub fn index_name(&self) -> &str {
        self.context.index_name()
    }

    /// Fetch one page of a query against the index
    pub async fn query(&self, operation: QueryOperation) -> Result<Page<S::Item>, Error> {
        operation
            .execute(
                &self.client,
                &*self.schema,
                &self.context,
                self.extensions.as_deref(),
            )
            .await
    }

    /// Stream every page of a query against the index, lazily
    pub fn query_pages(
        &self,
        operation: QueryOperation,
    ) -> impl Stream<Item = Result<Page<S::Item>, Error>> {
        pages::paginate(
            self.client.clone(),
            Arc::clone(&self.schema),
            self.context.clone(),
            self.extensions.clone(),
            operation,
        )
    }

    /// Fetch one page of a scan against the index
    pub async fn scan(&self, operation: ScanOperation) -> Result<Page<S::Item>, Error> {
        operation
            .execute(
                &self.client,
                &*self.schema,
                &self.context,
                self.extensions.as_deref(),
            )
            .await
    }

    /// Stream every page of a scan against the index, lazily
    pub fn scan_pages(
        &self,
        operation: ScanOperation,
    ) -> impl Stream<Item = Result<Page<S::Item>, Error>> {
        pages::paginate(
            self.client.clone(),
            Arc::clone(&self.schema),
            self.context.clone(),
            self.extensions.clone(),
            operation,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ItemSchema, TableMetadata};
    use aws_sdk_dynamodb::Config;
    use aws_sdk_dynamodb::config::Region;
    use aws_sdk_dynamodb::types::ScalarAttributeType;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Track {
        track_id: String,
        album: String,
    }

    // No requests are ever sent; the client only needs to exist.
    fn client() -> Client {
        let config = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        Client::from_conf(config)
    }

    fn schema() -> ItemSchema<Track> {
        ItemSchema::new(
            TableMetadata::builder("tracks")
                .partition_key("track_id", ScalarAttributeType::S)
                .secondary_index("album-index", ("album", ScalarAttributeType::S), None)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_index_requires_a_declared_index() {
        let table = MapperClient::new(client()).table(schema());

        let index = table.index("album-index").unwrap();
        assert_eq!(index.index_name(), "album-index");

        let err = table.index("missing-index").unwrap_err();
        assert!(matches!(err, Error::UnknownIndex { .. }));
    }

    #[test]
    fn test_read_batch_builder_targets_the_bound_table() {
        let table = MapperClient::new(client()).table(schema());
        let batch = table
            .read_batch()
            .get(Key::new(
                aws_sdk_dynamodb::types::AttributeValue::S("t-1".to_string()),
            ))
            .build()
            .unwrap();
        assert_eq!(batch.table_name(), "tracks");
        assert_eq!(batch.len(), 1);
    }
}
