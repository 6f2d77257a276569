use std::fmt;

use crate::error::Error;
use crate::expression::Expression;
use crate::operations::OperationContext;
use crate::schema::{AttributeMap, TableMetadata};

/// The item/condition rewrite an extension requests before a write
#[derive(Debug, Default)]
pub struct WriteModification {
    /// Replacement attribute map; `None` keeps the incoming item
    pub transformed_item: Option<AttributeMap>,
    /// Extra condition to attach to the physical request
    pub additional_condition: Option<Expression>,
}

/// The item rewrite an extension requests after a read
#[derive(Debug, Default)]
pub struct ReadModification {
    /// Replacement attribute map; `None` keeps the item as read
    pub transformed_item: Option<AttributeMap>,
}

/// A cross-cutting hook invoked around every mapped read and write
///
/// Both hooks default to the identity; implement only the side you need.
/// Extensions see wire-level attribute maps, never typed items.
pub trait MapperExtension: Send + Sync {
    /// Inspect or rewrite an item about to be written, optionally attaching
    /// a condition to the request
    fn before_write(
        &self,
        item: &AttributeMap,
        context: &OperationContext,
        metadata: &TableMetadata,
    ) -> Result<WriteModification, Error> {
        let _ = (item, context, metadata);
        Ok(WriteModification::default())
    }

    /// Inspect or rewrite an item that was just read
    fn after_read(
        &self,
        item: &AttributeMap,
        context: &OperationContext,
        metadata: &TableMetadata,
    ) -> Result<ReadModification, Error> {
        let _ = (item, context, metadata);
        Ok(ReadModification::default())
    }
}

/// An ordered pipeline of [`MapperExtension`]s
///
/// Hooks run in list order, each receiving the previous hook's output. An
/// absent chain behaves exactly like an empty one. A failing hook aborts the
/// remainder of the pipeline.
#[derive(Default)]
pub struct ExtensionChain {
    extensions: Vec<Box<dyn MapperExtension>>,
}

impl ExtensionChain {
    /// Chain over the given extensions, invoked in order
    pub fn new(extensions: Vec<Box<dyn MapperExtension>>) -> Self {
        Self { extensions }
    }

    /// Append an extension to the end of the chain
    pub fn push(&mut self, extension: Box<dyn MapperExtension>) {
        self.extensions.push(extension);
    }

    /// Number of extensions in the chain
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Run the `before_write` pipeline over an item
    ///
    /// Returns the final item together with the conjunction of every
    /// condition the hooks produced, merged under the placeholder-conflict
    /// rule.
    pub(crate) fn apply_before_write(
        chain: Option<&ExtensionChain>,
        item: AttributeMap,
        context: &OperationContext,
        metadata: &TableMetadata,
    ) -> Result<(AttributeMap, Option<Expression>), Error> {
        let Some(chain) = chain else {
            return Ok((item, None));
        };

        let mut current = item;
        let mut condition: Option<Expression> = None;
        for extension in &chain.extensions {
            let modification = extension.before_write(&current, context, metadata)?;
            if let Some(transformed) = modification.transformed_item {
                current = transformed;
            }
            if let Some(extra) = modification.additional_condition {
                condition = Some(Expression::coalesce(condition, extra)?);
            }
        }
        Ok((current, condition))
    }

    /// Run the `after_read` pipeline over an item
    pub(crate) fn apply_after_read(
        chain: Option<&ExtensionChain>,
        item: AttributeMap,
        context: &OperationContext,
        metadata: &TableMetadata,
    ) -> Result<AttributeMap, Error> {
        let Some(chain) = chain else {
            return Ok(item);
        };

        let mut current = item;
        for extension in &chain.extensions {
            let modification = extension.after_read(&current, context, metadata)?;
            if let Some(transformed) = modification.transformed_item {
                current = transformed;
            }
        }
        Ok(current)
    }
}

impl fmt::Debug for ExtensionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionChain")
            .field("len", &self.extensions.len())
            .finish()
    }
}
