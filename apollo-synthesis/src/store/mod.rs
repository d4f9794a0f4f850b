//! The data-access contract backing stores implement.

use apollo_compiler::response::JsonMap;

use crate::error::StoreError;
use crate::predicate::Predicate;
use crate::reconcile::Lookup;

pub mod memory;

/// A stored record. Reference fields hold the related record embedded as an object.
pub type Record = JsonMap;

/// The two operations a backing store provides.
///
/// `type_name` is always the exact name of a declared type. Implementations own all mutable
/// state, including whatever serialization `create` needs to hand out unique identities.
#[async_trait::async_trait]
pub trait DataAccess: Send + Sync {
    /// Finds the records satisfying `predicate`.
    ///
    /// [`Predicate::Unconstrained`] asks for every record of the type.
    async fn lookup(&self, type_name: &str, predicate: &Predicate) -> Result<Lookup, StoreError>;

    /// Stores a new record built from `input` and returns it, including its freshly assigned
    /// identity.
    async fn create(&self, type_name: &str, input: Record) -> Result<Record, StoreError>;
}
