use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_dynamodb::operation::transact_get_items::TransactGetItemsError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::error::ConditionalCheckFailedException;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use serde_dynamo::Error as SerdeDynamoError;
use std::error::Error as StdError;
use std::fmt;

type DynamoGetError = SdkError<GetItemError, Response>;
type DynamoPutError = SdkError<PutItemError, Response>;
type DynamoDeleteItemError = SdkError<DeleteItemError, Response>;
type DynamoQueryError = SdkError<QueryError, Response>;
type DynamoScanError = SdkError<ScanError, Response>;
type DynamoBatchGetItemError = SdkError<BatchGetItemError, Response>;
type DynamoBatchWriteItemError = SdkError<BatchWriteItemError, Response>;
type DynamoTransactGetItemsError = SdkError<TransactGetItemsError, Response>;
type DynamoTransactWriteItemsError = SdkError<TransactWriteItemsError, Response>;

/// Mapping layer operation error
///
/// Invalid-request variants are raised during request generation, before any
/// network call is made. Service errors wrap the SDK error of the physical
/// operation unchanged.
#[derive(Debug)]
pub enum Error {
    /// Serde DynamoDB serialization/deserialization error
    SerdeDynamo(SerdeDynamoError),
    /// DynamoDB request builder error
    BuildError(BuildError),
    /// A key was built without a partition value where one is required
    MissingPartitionValue,
    /// A sort-key comparison was requested but the key carries no sort value
    MissingSortValue,
    /// A sort-key comparison was requested against an index with no sort key
    NoIndexSortKey {
        /// The index the conditional was aimed at
        index: String,
    },
    /// `begins_with` was requested on a numeric sort attribute
    BeginsWithNumericSortKey {
        /// Name of the offending sort attribute
        attribute: String,
    },
    /// A single-item operation was aimed at a secondary index
    PrimaryIndexRequired {
        /// The physical operation that was attempted
        operation: &'static str,
        /// The secondary index it was aimed at
        index: String,
    },
    /// Two items within one batch-get table group carry different
    /// `consistent_read` settings
    InconsistentConsistentRead {
        /// The table whose group is inconsistent
        table: String,
    },
    /// An expression placeholder was bound to two different attribute names
    /// or two different values within one request
    PlaceholderConflict {
        /// The conflicting placeholder
        placeholder: String,
    },
    /// The named secondary index is not declared on the table metadata
    UnknownIndex {
        /// The index that was requested
        index: String,
    },
    /// An attribute required to build an exclusive-start-key is absent
    MissingKeyAttribute {
        /// The missing key attribute
        attribute: String,
    },
    /// A table was declared without a partition key
    UndefinedPartitionKey {
        /// The table missing its partition key
        table: String,
    },
    /// An extension produced a condition expression inside a batch write,
    /// which has no condition slot on the wire
    BatchConditionUnsupported {
        /// The table the conditional put was aimed at
        table: String,
    },
    /// DynamoDB GetItem operation error
    DynamoGetError(DynamoGetError),
    /// DynamoDB PutItem operation error
    DynamoPutError(DynamoPutError),
    /// DynamoDB DeleteItem operation error
    DynamoDeleteItemError(DynamoDeleteItemError),
    /// DynamoDB Query operation error
    DynamoQueryError(DynamoQueryError),
    /// DynamoDB Scan operation error
    DynamoScanError(DynamoScanError),
    /// DynamoDB BatchGetItem operation error
    DynamoBatchGetItemError(DynamoBatchGetItemError),
    /// DynamoDB BatchWriteItem operation error
    DynamoBatchWriteItemError(DynamoBatchWriteItemError),
    /// DynamoDB TransactGetItems operation error
    DynamoTransactGetItemsError(DynamoTransactGetItemsError),
    /// DynamoDB TransactWriteItems operation error
    DynamoTransactWriteItemsError(DynamoTransactWriteItemsError),
}

impl Error {
    /// Check whether the error is a local invalid-request error
    ///
    /// Invalid-request errors are deterministic and non-retryable; the caller
    /// must fix the request. They are always raised before any I/O happens.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Error::MissingPartitionValue
                | Error::MissingSortValue
                | Error::NoIndexSortKey { .. }
                | Error::BeginsWithNumericSortKey { .. }
                | Error::PrimaryIndexRequired { .. }
                | Error::InconsistentConsistentRead { .. }
                | Error::PlaceholderConflict { .. }
                | Error::UnknownIndex { .. }
                | Error::MissingKeyAttribute { .. }
                | Error::UndefinedPartitionKey { .. }
                | Error::BatchConditionUnsupported { .. }
        )
    }

    /// Check whether the error is a DynamoDB ConditionalCheckFailedException
    ///
    /// Useful for detecting optimistic-locking failures from condition
    /// expressions attached to put or delete operations.
    pub fn is_conditional_check_failed(&self) -> bool {
        match self {
            Error::DynamoPutError(e) => matches!(
                e.as_service_error(),
                Some(PutItemError::ConditionalCheckFailedException(
                    ConditionalCheckFailedException { .. }
                ))
            ),
            Error::DynamoDeleteItemError(e) => matches!(
                e.as_service_error(),
                Some(DeleteItemError::ConditionalCheckFailedException(
                    ConditionalCheckFailedException { .. }
                ))
            ),
            _ => false,
        }
    }

    /// Check whether the error is a serialization/deserialization error
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::SerdeDynamo(_))
    }
}

macro_rules! impl_from_error {
    ($name:ident, $variant:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$variant(e)
            }
        }
    };
    ($name:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$name(e)
            }
        }
    };
}

impl_from_error!(SerdeDynamoError, SerdeDynamo);
impl_from_error!(BuildError);
impl_from_error!(DynamoGetError);
impl_from_error!(DynamoPutError);
impl_from_error!(DynamoDeleteItemError);
impl_from_error!(DynamoQueryError);
impl_from_error!(DynamoScanError);
impl_from_error!(DynamoBatchGetItemError);
impl_from_error!(DynamoBatchWriteItemError);
impl_from_error!(DynamoTransactGetItemsError);
impl_from_error!(DynamoTransactWriteItemsError);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerdeDynamo(e) => write!(f, "DynamoDB serialization error: {}", e),
            Error::BuildError(e) => write!(f, "DynamoDB request builder error: {}", e),
            Error::MissingPartitionValue => {
                write!(f, "a partition key value is required but was not supplied")
            }
            Error::MissingSortValue => {
                write!(f, "a sort key value is required for this condition but was not supplied")
            }
            Error::NoIndexSortKey { index } => {
                write!(f, "index '{}' has no sort key; sort-based conditions are invalid", index)
            }
            Error::BeginsWithNumericSortKey { attribute } => {
                write!(
                    f,
                    "begins_with is not supported on numeric sort attribute '{}'",
                    attribute
                )
            }
            Error::PrimaryIndexRequired { operation, index } => {
                write!(
                    f,
                    "{} requires the primary index but was aimed at secondary index '{}'",
                    operation, index
                )
            }
            Error::InconsistentConsistentRead { table } => {
                write!(
                    f,
                    "batch group for table '{}' mixes different consistent_read settings",
                    table
                )
            }
            Error::PlaceholderConflict { placeholder } => {
                write!(
                    f,
                    "expression placeholder '{}' is bound more than once with different targets",
                    placeholder
                )
            }
            Error::UnknownIndex { index } => {
                write!(f, "secondary index '{}' is not declared on the table", index)
            }
            Error::MissingKeyAttribute { attribute } => {
                write!(f, "key attribute '{}' is absent from the item", attribute)
            }
            Error::UndefinedPartitionKey { table } => {
                write!(f, "table '{}' was declared without a partition key", table)
            }
            Error::BatchConditionUnsupported { table } => {
                write!(
                    f,
                    "an extension added a condition for a batch write to table '{}', \
                     but batch writes cannot carry conditions",
                    table
                )
            }
            Error::DynamoGetError(e) => write!(f, "DynamoDB GetItem operation failed: {}", e),
            Error::DynamoPutError(e) => write!(f, "DynamoDB PutItem operation failed: {}", e),
            Error::DynamoDeleteItemError(e) => {
                write!(f, "DynamoDB DeleteItem operation failed: {}", e)
            }
            Error::DynamoQueryError(e) => write!(f, "DynamoDB Query operation failed: {}", e),
            Error::DynamoScanError(e) => write!(f, "DynamoDB Scan operation failed: {}", e),
            Error::DynamoBatchGetItemError(e) => {
                write!(f, "DynamoDB BatchGetItem operation failed: {}", e)
            }
            Error::DynamoBatchWriteItemError(e) => {
                write!(f, "DynamoDB BatchWriteItem operation failed: {}", e)
            }
            Error::DynamoTransactGetItemsError(e) => {
                write!(f, "DynamoDB TransactGetItems operation failed: {}", e)
            }
            Error::DynamoTransactWriteItemsError(e) => {
                write!(f, "DynamoDB TransactWriteItems operation failed: {}", e)
            }
        }
    }
}

impl StdError for Error {}
