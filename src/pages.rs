//! Lazy, pull-based page streams for Query and Scan
//!
//! One physical request is issued per pulled page; nothing is prefetched,
//! and dropping a stream stops all further fetches. Streams are finite and
//! non-restartable.

use aws_sdk_dynamodb::Client;
use futures_util::stream::{self, Stream, TryStreamExt};
use std::sync::Arc;
use tracing::debug;

use crate::error::Error;
use crate::extension::ExtensionChain;
use crate::operations::{OperationContext, PaginatedOperation};
use crate::schema::{AttributeMap, TableSchema};

/// One page of a Query or Scan result
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The mapped items, in response order
    pub items: Vec<T>,
    /// The raw continuation key, verbatim as the service returned it
    pub last_evaluated_key: Option<AttributeMap>,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, last_evaluated_key: Option<AttributeMap>) -> Self {
        Self {
            items,
            last_evaluated_key,
        }
    }

    /// Whether this is the final page of the result set
    pub fn is_last(&self) -> bool {
        self.last_evaluated_key.is_none()
    }
}

enum Continuation {
    Start,
    Next(AttributeMap),
    Done,
}

struct PageState<S, O> {
    client: Client,
    schema: Arc<S>,
    context: OperationContext,
    extensions: Option<Arc<ExtensionChain>>,
    operation: O,
    continuation: Continuation,
}

/// Stream the pages of a Query or Scan, one request per pulled page
///
/// The first page honors any start key baked into the operation's own
/// request; every later page overrides it with the previous page's raw
/// continuation key.
pub(crate) fn paginate<S, O>(
    client: Client,
    schema: Arc<S>,
    context: OperationContext,
    extensions: Option<Arc<ExtensionChain>>,
    operation: O,
) -> impl Stream<Item = Result<Page<S::Item>, Error>>
where
    S: TableSchema,
    O: PaginatedOperation<S, Output = Page<S::Item>>,
{
    let state = PageState {
        client,
        schema,
        context,
        extensions,
        operation,
        continuation: Continuation::Start,
    };

    stream::try_unfold(state, |mut state| async move {
        let start_key = match std::mem::replace(&mut state.continuation, Continuation::Done) {
            Continuation::Done => return Ok(None),
            Continuation::Start => None,
            Continuation::Next(key) => Some(key),
        };

        let extensions = state.extensions.as_deref();
        let mut request =
            state
                .operation
                .generate_request(&*state.schema, &state.context, extensions)?;
        if start_key.is_some() {
            O::set_exclusive_start_key(&mut request, start_key);
        }
        debug!(
            table = state.context.table_name(),
            index = state.context.index_name(),
            "fetching page"
        );
        let response = O::service_call(&state.client, request).await?;

        state.continuation = match O::last_evaluated_key(&response) {
            Some(key) => Continuation::Next(key.clone()),
            None => Continuation::Done,
        };
        let page =
            state
                .operation
                .transform_response(response, &*state.schema, &state.context, extensions)?;
        Ok(Some((page, state)))
    })
}

/// Flatten a page stream into a stream of its items
///
/// Page boundaries disappear; items arrive in page order. The underlying
/// page fetches stay lazy: a page is requested only when its first item is
/// pulled.
pub fn items<T, St>(pages: St) -> impl Stream<Item = Result<T, Error>>
where
    St: Stream<Item = Result<Page<T>, Error>>,
{
    pages
        .map_ok(|page| stream::iter(page.items.into_iter().map(Ok)))
        .try_flatten()
}
