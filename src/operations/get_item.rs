use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::get_item::{GetItemInput, GetItemOutput};
use std::future::Future;

use crate::error::Error;
use crate::extension::ExtensionChain;
use crate::key::Key;
use crate::operations::{OperationContext, TableOperation};
use crate::schema::{PRIMARY_INDEX, TableSchema};

/// Retrieve a single item by its primary key
#[derive(Debug, Clone)]
pub struct GetItemOperation {
    key: Key,
    consistent_read: Option<bool>,
}

impl GetItemOperation {
    /// Get the item stored under `key`
    pub fn new(key: Key) -> Self {
        Self {
            key,
            consistent_read: None,
        }
    }

    /// Request a strongly or eventually consistent read
    pub fn consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }
}

impl<S: TableSchema> TableOperation<S> for GetItemOperation {
    type Request = GetItemInput;
    type Response = GetItemOutput;
    type Output = Option<S::Item>;

    fn generate_request(
        &self,
        schema: &S,
        context: &OperationContext,
        _extensions: Option<&ExtensionChain>,
    ) -> Result<Self::Request, Error> {
        if !context.is_primary_index() {
            return Err(Error::PrimaryIndexRequired {
                operation: "GetItem",
                index: context.index_name().to_string(),
            });
        }

        let key = self.key.key_map(schema.metadata(), PRIMARY_INDEX)?;
        Ok(GetItemInput::builder()
            .table_name(context.table_name())
            .set_key(Some(key))
            .set_consistent_read(self.consistent_read)
            .build()?)
    }

    fn service_call(
        client: &Client,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Error>> + Send {
        async move {
            Ok(client
                .get_item()
                .set_table_name(request.table_name)
                .set_key(request.key)
                .set_consistent_read(request.consistent_read)
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
        match response.item {
            None => Ok(None),
            Some(item) => {
                let item =
                    ExtensionChain::apply_after_read(extensions, item, context, schema.metadata())?;
                schema.map_to_item(Some(item))
            }
        }
    }
}
