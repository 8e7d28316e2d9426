//! Entity contract supplied by each indexed entity kind.

use crate::error::{CoreError, CoreResult};
use crate::types::EntityId;
use std::cmp::Ordering;
use std::fmt::Debug;

/// A fixed-size record that can be stored in an entity index.
///
/// Players, tournaments, annotators, sources, teams and game tags all
/// implement this trait. The engine only ever compares and (de)serializes
/// entities; it never interprets their fields.
///
/// Lookup keys are entities too: a "key" is any value of the entity type
/// whose comparison fields are filled in (the id and statistics are ignored
/// by `compare`).
///
/// # Example
///
/// ```rust,ignore
/// impl Entity for Annotator {
///     const SERIALIZED_LENGTH: usize = 53;
///
///     fn compare(&self, other: &Self) -> Ordering {
///         self.name.cmp(&other.name)
///     }
///     // ...
/// }
/// ```
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Exact length of [`Entity::serialize`] output for this entity kind.
    const SERIALIZED_LENGTH: usize;

    /// Returns the assigned identity, or `None` before the entity is added.
    fn id(&self) -> Option<EntityId>;

    /// Returns the number of records (games) referring to this entity.
    fn count(&self) -> u32;

    /// Returns the first record (game) referring to this entity.
    fn first_ref_id(&self) -> Option<EntityId>;

    /// Total order used by the index.
    fn compare(&self, other: &Self) -> Ordering;

    /// Serializes the entity into exactly `SERIALIZED_LENGTH` bytes.
    ///
    /// The identity is not part of the serialized form; it is implied by the
    /// node slot the record lives in.
    fn serialize(&self) -> Vec<u8>;

    /// Deserializes an entity stored under `id`.
    fn deserialize(id: EntityId, bytes: &[u8]) -> CoreResult<Self>;

    /// Returns a copy carrying a new identity.
    #[must_use]
    fn with_new_id(&self, id: EntityId) -> Self;

    /// Returns a copy carrying new reference statistics.
    #[must_use]
    fn with_new_stats(&self, count: u32, first_ref_id: Option<EntityId>) -> Self;
}

/// Serializes an entity, rejecting output of the wrong length.
pub(crate) fn encode_record<E: Entity>(entity: &E) -> CoreResult<Vec<u8>> {
    let bytes = entity.serialize();
    if bytes.len() != E::SERIALIZED_LENGTH {
        return Err(CoreError::invalid_format(format!(
            "entity serialized to {} bytes, expected {}",
            bytes.len(),
            E::SERIALIZED_LENGTH
        )));
    }
    Ok(bytes)
}
