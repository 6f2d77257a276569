use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::batch_write_item::{BatchWriteItemInput, BatchWriteItemOutput};
use aws_sdk_dynamodb::types::{DeleteRequest, PutRequest, WriteRequest};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use crate::error::Error;
use crate::extension::ExtensionChain;
use crate::key::Key;
use crate::operations::{DatabaseOperation, OperationContext};
use crate::schema::{AttributeMap, PRIMARY_INDEX, Projection, TableSchema};

/// One table's worth of puts and deletes inside a BatchWriteItem request
///
/// Put entries run the extension chain's `before_write` when the batch is
/// built; BatchWriteItem has no condition slot, so a hook that emits a
/// condition fails the build with [`Error::BatchConditionUnsupported`].
#[derive(Debug, Clone)]
pub struct WriteBatch {
    table_name: String,
    requests: Vec<WriteRequest>,
}

impl WriteBatch {
    /// Start a batch of writes mapped through `schema`
    pub fn builder<'a, S: TableSchema>(
        schema: &'a S,
        extensions: Option<&'a ExtensionChain>,
    ) -> WriteBatchBuilder<'a, S> {
        WriteBatchBuilder {
            schema,
            extensions,
            puts: Vec::new(),
            deletes: Vec::new(),
        }
    }

    /// The physical table the batch writes to
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Number of put and delete entries in the batch
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the batch holds no entries
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Builder for [`WriteBatch`]
pub struct WriteBatchBuilder<'a, S: TableSchema> {
    schema: &'a S,
    extensions: Option<&'a ExtensionChain>,
    puts: Vec<S::Item>,
    deletes: Vec<Key>,
}

impl<S: TableSchema> WriteBatchBuilder<'_, S> {
    /// Add an item to put
    pub fn put(mut self, item: S::Item) -> Self {
        self.puts.push(item);
        self
    }

    /// Add a primary key to delete
    pub fn delete(mut self, key: Key) -> Self {
        self.deletes.push(key);
        self
    }

    /// Map every entry into its wire representation
    pub fn build(self) -> Result<WriteBatch, Error> {
        let metadata = self.schema.metadata();
        let context = OperationContext::primary(metadata.table_name());
        let mut requests = Vec::with_capacity(self.puts.len() + self.deletes.len());

        for item in &self.puts {
            let item = self.schema.item_to_map(item, Projection::All)?;
            let (item, condition) =
                ExtensionChain::apply_before_write(self.extensions, item, &context, metadata)?;
            if condition.is_some() {
                return Err(Error::BatchConditionUnsupported {
                    table: metadata.table_name().to_string(),
                });
            }
            requests.push(
                WriteRequest::builder()
                    .put_request(PutRequest::builder().set_item(Some(item)).build()?)
                    .build(),
            );
        }
        for key in &self.deletes {
            let key = key.key_map(metadata, PRIMARY_INDEX)?;
            requests.push(
                WriteRequest::builder()
                    .delete_request(DeleteRequest::builder().set_key(Some(key)).build()?)
                    .build(),
            );
        }

        Ok(WriteBatch {
            table_name: metadata.table_name().to_string(),
            requests,
        })
    }
}

impl<S: TableSchema> fmt::Debug for WriteBatchBuilder<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBatchBuilder")
            .field("puts", &self.puts.len())
            .field("deletes", &self.deletes.len())
            .finish_non_exhaustive()
    }
}

/// Write up to 25 puts/deletes across any number of tables in one call
#[derive(Debug, Clone)]
pub struct BatchWriteItemOperation {
    batches: Vec<WriteBatch>,
}

impl BatchWriteItemOperation {
    /// Batch-write over the given per-table batches
    pub fn new(batches: Vec<WriteBatch>) -> Self {
        Self { batches }
    }
}

impl DatabaseOperation for BatchWriteItemOperation {
    type Request = BatchWriteItemInput;
    type Response = BatchWriteItemOutput;
    type Output = BatchWriteResult;

    fn generate_request(&self) -> Result<Self::Request, Error> {
        let mut request_items: HashMap<String, Vec<WriteRequest>> = HashMap::new();
        for batch in &self.batches {
            request_items
                .entry(batch.table_name().to_string())
                .or_default()
                .extend(batch.requests.iter().cloned());
        }
        Ok(BatchWriteItemInput::builder()
            .set_request_items(Some(request_items))
            .build()?)
    }

    fn service_call(
        client: &Client,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Error>> + Send {
        async move {
            Ok(client
                .batch_write_item()
                .set_request_items(request.request_items)
                .send()
                .await?)
        }
    }

    fn transform_response(&self, response: Self::Response) -> Result<Self::Output, Error> {
        let mut unprocessed_puts: HashMap<String, Vec<AttributeMap>> = HashMap::new();
        let mut unprocessed_deletes: HashMap<String, Vec<AttributeMap>> = HashMap::new();
        for (table, requests) in response.unprocessed_items.unwrap_or_default() {
            for request in requests {
                if let Some(put) = request.put_request {
                    unprocessed_puts
                        .entry(table.clone())
                        .or_default()
                        .push(put.item);
                }
                if let Some(delete) = request.delete_request {
                    unprocessed_deletes
                        .entry(table.clone())
                        .or_default()
                        .push(delete.key);
                }
            }
        }
        Ok(BatchWriteResult {
            unprocessed_puts,
            unprocessed_deletes,
        })
    }
}

/// The demultiplexed outcome of a [`BatchWriteItemOperation`]
///
/// The service may leave entries unprocessed under load; they come back here
/// split into puts and deletes per table for resubmission.
#[derive(Debug, Clone)]
pub struct BatchWriteResult {
    unprocessed_puts: HashMap<String, Vec<AttributeMap>>,
    unprocessed_deletes: HashMap<String, Vec<AttributeMap>>,
}

impl BatchWriteResult {
    /// Items the service did not put for `table`
    pub fn unprocessed_puts_for(&self, table: &str) -> &[AttributeMap] {
        self.unprocessed_puts.get(table).map_or(&[], Vec::as_slice)
    }

    /// Keys the service did not delete for `table`
    pub fn unprocessed_deletes_for(&self, table: &str) -> &[AttributeMap] {
        self.unprocessed_deletes
            .get(table)
            .map_or(&[], Vec::as_slice)
    }

    /// Whether every entry was processed
    pub fn is_fully_processed(&self) -> bool {
        self.unprocessed_puts.values().all(Vec::is_empty)
            && self.unprocessed_deletes.values().all(Vec::is_empty)
    }
}
