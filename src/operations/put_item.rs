use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::put_item::{PutItemInput, PutItemOutput};
use std::fmt;
use std::future::Future;

use crate::error::Error;
use crate::expression::Expression;
use crate::extension::ExtensionChain;
use crate::operations::{OperationContext, TableOperation};
use crate::schema::{Projection, TableSchema};

/// Insert or replace a single item
///
/// An optional condition expression guards the write; any condition the
/// extension chain adds is conjoined onto it.
pub struct PutItemOperation<S: TableSchema> {
    item: S::Item,
    condition: Option<Expression>,
}

impl<S: TableSchema> PutItemOperation<S> {
    /// Put `item`, unconditionally
    pub fn new(item: S::Item) -> Self {
        Self {
            item,
            condition: None,
        }
    }

    /// Guard the write with a condition expression
    pub fn condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }
}

impl<S: TableSchema> fmt::Debug for PutItemOperation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutItemOperation")
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

impl<S: TableSchema> TableOperation<S> for PutItemOperation<S> {
    type Request = PutItemInput;
    type Response = PutItemOutput;
    type Output = ();

    fn generate_request(
        &self,
        schema: &S,
        context: &OperationContext,
        extensions: Option<&ExtensionChain>,
    ) -> Result<Self::Request, Error> {
        if !context.is_primary_index() {
            return Err(Error::PrimaryIndexRequired {
                operation: "PutItem",
                index: context.index_name().to_string(),
            });
        }

        let item = schema.item_to_map(&self.item, Projection::All)?;
        let (item, extension_condition) =
            ExtensionChain::apply_before_write(extensions, item, context, schema.metadata())?;

        let mut condition = self.condition.clone();
        if let Some(extra) = extension_condition {
            condition = Some(Expression::coalesce(condition, extra)?);
        }

        let mut builder = PutItemInput::builder()
            .table_name(context.table_name())
            .set_item(Some(item));
        if let Some(condition) = condition {
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
                .put_item()
                .set_table_name(request.table_name)
                .set_item(request.item)
                .set_condition_expression(request.condition_expression)
                .set_expression_attribute_names(request.expression_attribute_names)
                .set_expression_attribute_values(request.expression_attribute_values)
                .send()
                .await?)
        }
    }

    fn transform_response(
        &self,
        _response: Self::Response,
        _schema: &S,
        _context: &OperationContext,
        _extensions: Option<&ExtensionChain>,
    ) -> Result<Self::Output, Error> {
        Ok(())
    }
}
