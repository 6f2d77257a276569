//! The operation layer: one command type per physical DynamoDB call
//!
//! Every operation follows the same three-step contract: `generate_request`
//! builds a complete low-level request (no I/O, all validation up front),
//! `service_call` maps that request onto the matching wire-client method and
//! performs the send, and `transform_response` turns the raw response back
//! into typed output. Operation values hold only their input parameters and
//! are single-use.

use aws_sdk_dynamodb::Client;
use std::future::Future;
use tracing::debug;

use crate::error::Error;
use crate::extension::ExtensionChain;
use crate::schema::{AttributeMap, PRIMARY_INDEX, TableSchema};

mod batch_get;
mod batch_write;
mod delete_item;
mod get_item;
mod put_item;
mod query;
mod scan;
mod transact_get;
mod transact_write;

pub use batch_get::{BatchGetItemOperation, BatchGetResult, ReadBatch, ReadBatchBuilder};
pub use batch_write::{BatchWriteItemOperation, BatchWriteResult, WriteBatch, WriteBatchBuilder};
pub use delete_item::DeleteItemOperation;
pub use get_item::GetItemOperation;
pub use put_item::PutItemOperation;
pub use query::QueryOperation;
pub use scan::ScanOperation;
pub use transact_get::{ReadTransaction, ReadTransactionBuilder, TransactGetItemsOperation, TransactGetResult};
pub use transact_write::{TransactWriteItemsOperation, WriteTransaction, WriteTransactionBuilder};

/// Which physical table and index a request is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    table_name: String,
    index_name: String,
}

impl OperationContext {
    /// Context targeting a table's primary index
    pub fn primary(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            index_name: PRIMARY_INDEX.to_string(),
        }
    }

    /// Context targeting a named secondary index
    pub fn secondary_index(table_name: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            index_name: index_name.into(),
        }
    }

    /// The physical table name
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The targeted index name, [`PRIMARY_INDEX`] for the primary index
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Whether the context targets the primary index
    pub fn is_primary_index(&self) -> bool {
        self.index_name == PRIMARY_INDEX
    }

    /// Index name in the form query/scan request builders take
    pub(crate) fn index_name_or_none(&self) -> Option<String> {
        if self.is_primary_index() {
            None
        } else {
            Some(self.index_name.clone())
        }
    }
}

/// A single-table operation: GetItem, PutItem, DeleteItem, Query or Scan
///
/// Implementations are stateless command values; the caller threads schema,
/// context and extensions through explicitly.
pub trait TableOperation<S: TableSchema> {
    /// The low-level request input type
    type Request;
    /// The low-level response output type
    type Response;
    /// The typed result of the operation
    type Output;

    /// Build the complete low-level request
    ///
    /// All invalid-argument validation happens here, before any I/O; write
    /// operations run the extension chain's `before_write` exactly once per
    /// item.
    fn generate_request(
        &self,
        schema: &S,
        context: &OperationContext,
        extensions: Option<&ExtensionChain>,
    ) -> Result<Self::Request, Error>;

    /// Apply the request to the matching wire-client method
    fn service_call(
        client: &Client,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Error>> + Send;

    /// Turn the raw response into typed output
    ///
    /// Read operations run the extension chain's `after_read` once per item,
    /// in response order.
    fn transform_response(
        &self,
        response: Self::Response,
        schema: &S,
        context: &OperationContext,
        extensions: Option<&ExtensionChain>,
    ) -> Result<Self::Output, Error>;

    /// Generate, send and transform in one call
    fn execute(
        &self,
        client: &Client,
        schema: &S,
        context: &OperationContext,
        extensions: Option<&ExtensionChain>,
    ) -> impl Future<Output = Result<Self::Output, Error>> {
        async move {
            let request = self.generate_request(schema, context, extensions)?;
            debug!(
                table = context.table_name(),
                index = context.index_name(),
                "sending table operation"
            );
            let response = Self::service_call(client, request).await?;
            self.transform_response(response, schema, context, extensions)
        }
    }
}

/// A multi-table operation: the batch and transaction composers
///
/// Entries are bound to their tables when they are built, so no schema or
/// context is threaded through the contract itself.
pub trait DatabaseOperation {
    /// The low-level request input type
    type Request;
    /// The low-level response output type
    type Response;
    /// The composed result of the operation
    type Output;

    /// Compose the per-table entries into one physical request
    fn generate_request(&self) -> Result<Self::Request, Error>;

    /// Apply the request to the matching wire-client method
    fn service_call(
        client: &Client,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Error>> + Send;

    /// Demultiplex the physical response back into per-entry results
    fn transform_response(&self, response: Self::Response) -> Result<Self::Output, Error>;

    /// Generate, send and transform in one call
    fn execute(&self, client: &Client) -> impl Future<Output = Result<Self::Output, Error>> {
        async move {
            let request = self.generate_request()?;
            debug!("sending database operation");
            let response = Self::service_call(client, request).await?;
            self.transform_response(response)
        }
    }
}

/// Extra surface shared by the page-producing operations (Query, Scan)
pub(crate) trait PaginatedOperation<S: TableSchema>: TableOperation<S> {
    /// Override the request's exclusive start key with a continuation token
    fn set_exclusive_start_key(request: &mut Self::Request, key: Option<AttributeMap>);

    /// The raw continuation token of a response page, verbatim
    fn last_evaluated_key(response: &Self::Response) -> Option<&AttributeMap>;
}
