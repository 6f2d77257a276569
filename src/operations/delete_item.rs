use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::delete_item::{DeleteItemInput, DeleteItemOutput};
use aws_sdk_dynamodb::types::ReturnValue;
use std::future::Future;

use crate::error::Error;
use crate::expression::Expression;
use crate::extension::ExtensionChain;
use crate::key::Key;
use crate::operations::{OperationContext, TableOperation};
use crate::schema::{PRIMARY_INDEX, TableSchema};

/// Delete a single item by its primary key, returning the old item if any
#[derive(Debug, Clone)]
pub struct DeleteItemOperation {
    key: Key,
    condition: Option<Expression>,
}

impl DeleteItemOperation {
    /// Delete the item stored under `key`
    pub fn new(key: Key) -> Self {
        Self {
            key,
            condition: None,
        }
    }

    /// Guard the delete with a condition expression
    pub fn condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }
}

impl<S: TableSchema> TableOperation<S> for DeleteItemOperation {
    type Request = DeleteItemInput;
    type Response = DeleteItemOutput;
    type Output = Option<S::Item>;

    fn generate_request(
        &self,
        schema: &S,
        context: &OperationContext,
        _extensions: Option<&ExtensionChain>,
    ) -> Result<Self::Request, Error> {
        if !context.is_primary_index() {
            return Err(Error::PrimaryIndexRequired {
                operation: "DeleteItem",
                index: context.index_name().to_string(),
            });
        }

        let key = self.key.key_map(schema.metadata(), PRIMARY_INDEX)?;
        let mut builder = DeleteItemInput::builder()
            .table_name(context.table_name())
            .set_key(Some(key))
            .return_values(ReturnValue::AllOld);
        if let Some(condition) = &self.condition {
            builder = builder
                .condition_expression(condition.expression())
                .set_expression_attribute_names(condition.names_or_none())
                .set_expression_attribute_values(condition.values_or_none());
        }
        Ok(builder.build()?)
    }

    fn service_call(
        client: &Client,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Error>> + Send {
        async move {
            Ok(client
                .delete_item()
                .set_table_name(request.table_name)
                .set_key(request.key)
                .set_return_values(request.return_values)
                .set_condition_expression(request.condition_expression)
                .set_expression_attribute_names(request.expression_attribute_names)
                .set_expression_attribute_values(request.expression_attribute_values)
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
        match response.attributes {
            None => Ok(None),
            Some(item) => {
                let item =
                    ExtensionChain::apply_after_read(extensions, item, context, schema.metadata())?;
                schema.map_to_item(Some(item))
            }
        }
    }
}
