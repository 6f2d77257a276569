use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::scan::{ScanInput, ScanOutput};
use std::future::Future;

use crate::error::Error;
use crate::expression::Expression;
use crate::extension::ExtensionChain;
use crate::operations::{OperationContext, PaginatedOperation, TableOperation};
use crate::pages::Page;
use crate::schema::{AttributeMap, TableSchema};

/// Scan a table or secondary index
///
/// One execution fetches one page; the lazy multi-page stream lives in
/// [`crate::pages`].
#[derive(Debug, Clone, Default)]
pub struct ScanOperation {
    filter: Option<Expression>,
    exclusive_start_key: Option<AttributeMap>,
    limit: Option<i32>,
    consistent_read: Option<bool>,
}

impl ScanOperation {
    /// Scan every item
    pub fn new() -> Self {
        Self::default()
    }

    /// Post-filter the scanned items server-side
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
}

impl<S: TableSchema> TableOperation<S> for ScanOperation {
    type Request = ScanInput;
    type Response = ScanOutput;
    type Output = Page<S::Item>;

    fn generate_request(
        &self,
        _schema: &S,
        context: &OperationContext,
        _extensions: Option<&ExtensionChain>,
    ) -> Result<Self::Request, Error> {
        let mut builder = ScanInput::builder()
            .table_name(context.table_name())
            .set_index_name(context.index_name_or_none())
            .set_exclusive_start_key(self.exclusive_start_key.clone())
            .set_limit(self.limit)
            .set_consistent_read(self.consistent_read);
        if let Some(filter) = &self.filter {
            builder = builder
                .filter_expression(filter.expression())
                .set_expression_attribute_names(filter.names_or_none())
                .set_expression_attribute_values(filter.values_or_none());
        }
        Ok(builder.build()?)
    }

    fn service_call(
        client: &Client,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Error>> + Send {
        async move {
            Ok(client
                .scan()
                .set_table_name(request.table_name)
                .set_index_name(request.index_name)
                .set_filter_expression(request.filter_expression)
                .set_expression_attribute_names(request.expression_attribute_names)
                .set_expression_attribute_values(request.expression_attribute_values)
                .set_exclusive_start_key(request.exclusive_start_key)
                .set_limit(request.limit)
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

impl<S: TableSchema> PaginatedOperation<S> for ScanOperation {
    fn set_exclusive_start_key(request: &mut Self::Request, key: Option<AttributeMap>) {
        request.exclusive_start_key = key;
    }

    fn last_evaluated_key(response: &Self::Response) -> Option<&AttributeMap> {
        response.last_evaluated_key.as_ref()
    }
}
