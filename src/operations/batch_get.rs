use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::batch_get_item::{BatchGetItemInput, BatchGetItemOutput};
use aws_sdk_dynamodb::types::KeysAndAttributes;
use std::collections::HashMap;

use crate::error::Error;
use crate::extension::ExtensionChain;
use crate::key::Key;
use crate::operations::{DatabaseOperation, OperationContext};
use crate::schema::{AttributeMap, PRIMARY_INDEX, TableMetadata, TableSchema};
use std::future::Future;

/// One table's worth of keys inside a BatchGetItem request
///
/// Built against a table's metadata so key attribute names are resolved up
/// front; the operation unions every batch aimed at the same table into a
/// single request group.
#[derive(Debug, Clone)]
pub struct ReadBatch {
    table_name: String,
    keys: Vec<AttributeMap>,
    consistent_read: Option<bool>,
}

impl ReadBatch {
    /// Start a batch of reads against the table described by `metadata`
    pub fn builder(metadata: &TableMetadata) -> ReadBatchBuilder {
        ReadBatchBuilder {
            metadata: metadata.clone(),
            keys: Vec::new(),
            consistent_read: None,
        }
    }

    /// The physical table the batch reads from
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Number of keys in the batch
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the batch holds no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Builder for [`ReadBatch`]
#[derive(Debug)]
pub struct ReadBatchBuilder {
    metadata: TableMetadata,
    keys: Vec<Key>,
    consistent_read: Option<bool>,
}

impl ReadBatchBuilder {
    /// Add a primary key to fetch
    pub fn get(mut self, key: Key) -> Self {
        self.keys.push(key);
        self
    }

    /// Request strongly or eventually consistent reads for the whole batch
    pub fn consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }

    /// Resolve every key against the table metadata
    pub fn build(self) -> Result<ReadBatch, Error> {
        let mut keys = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            keys.push(key.key_map(&self.metadata, PRIMARY_INDEX)?);
        }
        Ok(ReadBatch {
            table_name: self.metadata.table_name().to_string(),
            keys,
            consistent_read: self.consistent_read,
        })
    }
}

/// Fetch up to 100 items across any number of tables in one call
///
/// Batches aimed at the same table are unioned into one request group; their
/// `consistent_read` settings must agree.
#[derive(Debug, Clone)]
pub struct BatchGetItemOperation {
    batches: Vec<ReadBatch>,
}

impl BatchGetItemOperation {
    /// Batch-get over the given per-table batches
    pub fn new(batches: Vec<ReadBatch>) -> Self {
        Self { batches }
    }
}

impl DatabaseOperation for BatchGetItemOperation {
    type Request = BatchGetItemInput;
    type Response = BatchGetItemOutput;
    type Output = BatchGetResult;

    fn generate_request(&self) -> Result<Self::Request, Error> {
        let mut groups: HashMap<String, (Vec<AttributeMap>, Option<bool>)> = HashMap::new();
        for batch in &self.batches {
            match groups.get_mut(batch.table_name()) {
                None => {
                    let _ = groups.insert(
                        batch.table_name().to_string(),
                        (batch.keys.clone(), batch.consistent_read),
                    );
                }
                Some((keys, consistent_read)) => {
                    if *consistent_read != batch.consistent_read {
                        return Err(Error::InconsistentConsistentRead {
                            table: batch.table_name().to_string(),
                        });
                    }
                    keys.extend(batch.keys.iter().cloned());
                }
            }
        }

        let mut request_items = HashMap::new();
        for (table, (keys, consistent_read)) in groups {
            let group = KeysAndAttributes::builder()
                .set_keys(Some(keys))
                .set_consistent_read(consistent_read)
                .build()?;
            let _ = request_items.insert(table, group);
        }

        Ok(BatchGetItemInput::builder()
            .set_request_items(Some(request_items))
            .build()?)
    }

    fn service_call(
        client: &Client,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Error>> + Send {
        async move {
            Ok(client
                .batch_get_item()
                .set_request_items(request.request_items)
                .send()
                .await?)
        }
    }

    fn transform_response(&self, response: Self::Response) -> Result<Self::Output, Error> {
        let mut unprocessed = HashMap::new();
        for (table, group) in response.unprocessed_keys.unwrap_or_default() {
            let _ = unprocessed.insert(table, group.keys);
        }
        Ok(BatchGetResult {
            responses: response.responses.unwrap_or_default(),
            unprocessed,
        })
    }
}

/// The demultiplexed outcome of a [`BatchGetItemOperation`]
///
/// Items come back grouped by table with no ordering guarantee within a
/// group. Keys the service left unprocessed are exposed per table so the
/// caller can resubmit them.
#[derive(Debug, Clone)]
pub struct BatchGetResult {
    responses: HashMap<String, Vec<AttributeMap>>,
    unprocessed: HashMap<String, Vec<AttributeMap>>,
}

impl BatchGetResult {
    /// The items returned for `schema`'s table, mapped through the schema
    ///
    /// The extension chain's `after_read` runs once per item. A table with no
    /// returned items yields an empty vector.
    pub fn items_for<S: TableSchema>(
        &self,
        schema: &S,
        extensions: Option<&ExtensionChain>,
    ) -> Result<Vec<S::Item>, Error> {
        let table = schema.metadata().table_name();
        let context = OperationContext::primary(table);
        let mut items = Vec::new();
        for item in self.responses.get(table).into_iter().flatten() {
            let item = ExtensionChain::apply_after_read(
                extensions,
                item.clone(),
                &context,
                schema.metadata(),
            )?;
            if let Some(item) = schema.map_to_item(Some(item))? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Keys the service did not process for `table`
    pub fn unprocessed_keys_for(&self, table: &str) -> &[AttributeMap] {
        self.unprocessed.get(table).map_or(&[], Vec::as_slice)
    }

    /// Whether every requested key was processed
    pub fn is_fully_processed(&self) -> bool {
        self.unprocessed.values().all(Vec::is_empty)
    }
}
