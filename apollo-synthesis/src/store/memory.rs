//! A [`DataAccess`] implementation over in-process record lists.

use apollo_compiler::collections::IndexMap;
use apollo_compiler::response::JsonValue;
use parking_lot::Mutex;

use super::DataAccess;
use super::Record;
use crate::error::StoreError;
use crate::predicate::Predicate;
use crate::reconcile::Lookup;
use crate::registry::TypeRegistry;

const DEFAULT_IDENTITY_FIELD: &str = "id";

/// Keeps one ordered list of records per type.
///
/// New records get an integer identity one past the largest identity ever held by their type.
/// The counter never goes down, so removing records never causes an identity to be reused.
/// A type's identity field defaults to `id`; [`InMemoryStore::with_registry`] takes it from the
/// type definitions instead.
#[derive(Debug)]
pub struct InMemoryStore {
    identity_field: String,
    collections: Mutex<IndexMap<String, Collection>>,
}

#[derive(Debug)]
struct Collection {
    identity_field: String,
    records: Vec<Record>,
    next_identity: i64,
}

impl Collection {
    fn new(
        type_name: &str,
        identity_field: String,
        records: Vec<Record>,
    ) -> Result<Self, StoreError> {
        let next_identity = match records
            .iter()
            .filter_map(|record| identity_of(record, &identity_field))
            .max()
        {
            Some(max) => max.checked_add(1).ok_or_else(|| exhausted(type_name))?,
            None => 1,
        };
        Ok(Self {
            identity_field,
            records,
            next_identity,
        })
    }

    fn empty(identity_field: String) -> Self {
        Self {
            identity_field,
            records: Vec::new(),
            next_identity: 1,
        }
    }
}

fn identity_of(record: &Record, identity_field: &str) -> Option<i64> {
    match record.get(identity_field)? {
        JsonValue::Number(number) => number.as_i64(),
        JsonValue::String(text) => text.as_str().parse().ok(),
        _ => None,
    }
}

fn exhausted(type_name: &str) -> StoreError {
    StoreError::msg(format!("identities of type '{type_name}' are exhausted"))
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_identity_field(DEFAULT_IDENTITY_FIELD)
    }

    /// A store assigning identities to `identity_field` instead of `id`.
    pub fn with_identity_field(identity_field: impl Into<String>) -> Self {
        Self {
            identity_field: identity_field.into(),
            collections: Default::default(),
        }
    }

    /// Adds (or replaces) the records of a type, keeping its identity field.
    ///
    /// Fails when an identity already held is the largest one representable.
    pub fn with_collection(
        mut self,
        type_name: impl Into<String>,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<Self, StoreError> {
        let type_name: String = type_name.into();
        let collections = self.collections.get_mut();
        let identity_field = collections
            .get(&type_name)
            .map_or(&self.identity_field, |collection| &collection.identity_field)
            .clone();
        let collection =
            Collection::new(&type_name, identity_field, records.into_iter().collect())?;
        collections.insert(type_name, collection);
        Ok(self)
    }

    /// Assigns the identities of `type_name` to `identity_field`, counting from the records
    /// already held.
    pub fn with_type_identity(
        mut self,
        type_name: impl Into<String>,
        identity_field: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let type_name: String = type_name.into();
        let collections = self.collections.get_mut();
        let records = collections
            .swap_remove(&type_name)
            .map(|collection| collection.records)
            .unwrap_or_default();
        let collection = Collection::new(&type_name, identity_field.into(), records)?;
        collections.insert(type_name, collection);
        Ok(self)
    }

    /// Uses the identity field of every type that declares one.
    pub fn with_registry(self, registry: &TypeRegistry) -> Result<Self, StoreError> {
        registry
            .types()
            .try_fold(self, |store, definition| match definition.identity_field() {
                Some(field) => {
                    store.with_type_identity(definition.name.as_str(), field.name.as_str())
                }
                None => Ok(store),
            })
    }

    /// Loads `{ "<Type>": [<record>, ...], ... }`.
    pub fn from_json(data: &JsonValue) -> Result<Self, StoreError> {
        let collections = data
            .as_object()
            .ok_or_else(|| StoreError::msg("store data must be an object keyed by type name"))?;
        let mut store = Self::new();
        for (type_name, records) in collections {
            let records = records
                .as_array()
                .ok_or_else(|| {
                    StoreError::msg(format!("records of '{}' must be an array", type_name.as_str()))
                })?
                .iter()
                .map(|record| {
                    record.as_object().cloned().ok_or_else(|| {
                        StoreError::msg(format!(
                            "records of '{}' must be objects",
                            type_name.as_str()
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            store = store.with_collection(type_name.as_str(), records)?;
        }
        Ok(store)
    }

    /// A snapshot of the records of a type, in insertion order.
    pub fn records(&self, type_name: &str) -> Vec<Record> {
        self.collections
            .lock()
            .get(type_name)
            .map(|collection| collection.records.clone())
            .unwrap_or_default()
    }

    /// Removes the records satisfying `predicate` and returns how many were removed.
    pub fn remove(&self, type_name: &str, predicate: &Predicate) -> usize {
        let mut collections = self.collections.lock();
        let Some(collection) = collections.get_mut(type_name) else {
            return 0;
        };
        let before = collection.records.len();
        collection.records.retain(|record| !predicate.matches(record));
        before - collection.records.len()
    }
}

#[async_trait::async_trait]
impl DataAccess for InMemoryStore {
    async fn lookup(&self, type_name: &str, predicate: &Predicate) -> Result<Lookup, StoreError> {
        let collections = self.collections.lock();
        let Some(collection) = collections.get(type_name) else {
            return Ok(Lookup::Empty);
        };
        let matching = collection
            .records
            .iter()
            .filter(|record| predicate.matches(record))
            .cloned()
            .collect::<Vec<_>>();
        tracing::debug!(
            type_name,
            %predicate,
            matches = matching.len(),
            "in-memory lookup"
        );
        Ok(matching.into())
    }

    async fn create(&self, type_name: &str, input: Record) -> Result<Record, StoreError> {
        let mut collections = self.collections.lock();
        let collection = collections
            .entry(type_name.to_owned())
            .or_insert_with(|| Collection::empty(self.identity_field.clone()));
        let identity = collection.next_identity;
        collection.next_identity = identity.checked_add(1).ok_or_else(|| exhausted(type_name))?;

        let mut record = Record::new();
        record.insert(collection.identity_field.clone(), identity.into());
        for (key, value) in input {
            if key.as_str() != collection.identity_field {
                record.insert(key, value);
            }
        }
        collection.records.push(record.clone());
        tracing::debug!(type_name, identity, "in-memory create");
        Ok(record)
    }
}
