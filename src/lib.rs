//! # DynamoDB Mapping Layer
//!
//! A typed mapping layer over the DynamoDB wire client:
//! - Schema-driven item marshalling via `serde`
//! - Safe key condition building with generated placeholder names
//! - Single-item, query, scan, batch and transaction operations
//! - A cross-cutting extension hook chain around reads and writes
//! - Lazy, pull-based page streams for large result sets
//!
//! Every operation follows one contract: build the complete low-level
//! request up front (all validation before any I/O), send it, transform the
//! response. Failures the service never saw surface synchronously; not-found
//! is `None`, never an error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};
//! use dynamo_mapper::{ItemSchema, Key, MapperClient, TableMetadata};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct User {
//!     user_id: String,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dynamo_mapper::Error> {
//!     let metadata = TableMetadata::builder("users")
//!         .partition_key("user_id", ScalarAttributeType::S)
//!         .build()?;
//!     let client = MapperClient::from_env().await;
//!     let users = client.table(ItemSchema::<User>::new(metadata));
//!
//!     users
//!         .put_item(User {
//!             user_id: "123".to_string(),
//!             name: "John Doe".to_string(),
//!         })
//!         .await?;
//!
//!     let _user = users
//!         .get_item(Key::new(AttributeValue::S("123".to_string())))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
#![deny(
    warnings,
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]

mod error;
pub use error::Error;

/// Key condition builders
pub mod conditional;

/// Expression value type and placeholder generation
pub mod expression;

/// Extension hook chain around reads and writes
pub mod extension;

/// Primary and index key values
pub mod key;

/// The high-level client, table and index surface
pub mod mapper;

/// One command type per physical DynamoDB call
pub mod operations;

/// Page values and lazy page streams
pub mod pages;

/// Table schemas and metadata
pub mod schema;

// Re-export main types for convenience
pub use conditional::QueryConditional;
pub use expression::Expression;
pub use extension::{ExtensionChain, MapperExtension, ReadModification, WriteModification};
pub use key::Key;
pub use mapper::{MappedIndex, MappedTable, MapperClient};
pub use pages::Page;
pub use schema::{
    AttributeMap, ItemSchema, PRIMARY_INDEX, Projection, TableMetadata, TableSchema,
};
