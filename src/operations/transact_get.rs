use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::transact_get_items::{
    TransactGetItemsInput, TransactGetItemsOutput,
};
use aws_sdk_dynamodb::types::{Get, TransactGetItem};
use std::future::Future;

use crate::error::Error;
use crate::key::Key;
use crate::operations::DatabaseOperation;
use crate::schema::{AttributeMap, PRIMARY_INDEX, TableMetadata, TableSchema};

/// An ordered list of reads executed as one atomic snapshot
///
/// Slot order is preserved end-to-end: the result carries exactly one slot
/// per requested read, in request order.
#[derive(Debug, Clone)]
pub struct ReadTransaction {
    items: Vec<TransactGetItem>,
}

impl ReadTransaction {
    /// Start an empty read transaction
    pub fn builder() -> ReadTransactionBuilder {
        ReadTransactionBuilder {
            entries: Vec::new(),
        }
    }

    /// Number of reads in the transaction
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the transaction holds no reads
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builder for [`ReadTransaction`]
#[derive(Debug)]
pub struct ReadTransactionBuilder {
    entries: Vec<(TableMetadata, Key)>,
}

impl ReadTransactionBuilder {
    /// Append a read of `key` from the table described by `metadata`
    pub fn get(mut self, metadata: &TableMetadata, key: Key) -> Self {
        self.entries.push((metadata.clone(), key));
        self
    }

    /// Resolve every key against its table metadata
    pub fn build(self) -> Result<ReadTransaction, Error> {
        let mut items = Vec::with_capacity(self.entries.len());
        for (metadata, key) in &self.entries {
            let key = key.key_map(metadata, PRIMARY_INDEX)?;
            items.push(
                TransactGetItem::builder()
                    .get(
                        Get::builder()
                            .table_name(metadata.table_name())
                            .set_key(Some(key))
                            .build()?,
                    )
                    .build(),
            );
        }
        Ok(ReadTransaction { items })
    }
}

/// Read up to 100 items atomically across any number of tables
///
/// The extension chain never sees these items; slots hold the raw attribute
/// maps and typed access goes through the schema alone.
#[derive(Debug, Clone)]
pub struct TransactGetItemsOperation {
    transaction: ReadTransaction,
}

impl TransactGetItemsOperation {
    /// Execute the given read transaction
    pub fn new(transaction: ReadTransaction) -> Self {
        Self { transaction }
    }
}

impl DatabaseOperation for TransactGetItemsOperation {
    type Request = TransactGetItemsInput;
    type Response = TransactGetItemsOutput;
    type Output = TransactGetResult;

    fn generate_request(&self) -> Result<Self::Request, Error> {
        Ok(TransactGetItemsInput::builder()
            .set_transact_items(Some(self.transaction.items.clone()))
            .build()?)
    }

    fn service_call(
        client: &Client,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Error>> + Send {
        async move {
            Ok(client
                .transact_get_items()
                .set_transact_items(request.transact_items)
                .send()
                .await?)
        }
    }

    fn transform_response(&self, response: Self::Response) -> Result<Self::Output, Error> {
        let slots = response
            .responses
            .unwrap_or_default()
            .into_iter()
            .map(|slot| slot.item.filter(|item| !item.is_empty()))
            .collect();
        Ok(TransactGetResult { slots })
    }
}

/// The per-slot outcome of a [`TransactGetItemsOperation`]
///
/// A slot whose item was absent, or came back as an empty map, is `None`.
#[derive(Debug, Clone)]
pub struct TransactGetResult {
    slots: Vec<Option<AttributeMap>>,
}

impl TransactGetResult {
    /// Number of slots, equal to the number of requested reads
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the result holds no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The raw attribute map in slot `index`
    pub fn slot(&self, index: usize) -> Option<&AttributeMap> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// The item in slot `index`, mapped through `schema`
    pub fn item<S: TableSchema>(
        &self,
        index: usize,
        schema: &S,
    ) -> Result<Option<S::Item>, Error> {
        schema.map_to_item(self.slots.get(index).and_then(Option::clone))
    }
}
