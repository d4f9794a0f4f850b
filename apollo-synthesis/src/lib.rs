//! Synthesizes a GraphQL query and mutation surface from plain object type definitions.
//!
//! For every declared type `T` three root fields are generated: `T(...)` looks up at most one
//! record, `Ts(...)` lists matching records and `createT(...)` stores a new one. Field arguments
//! become equality filters ([`predicate::Predicate`]) handed to a pluggable backing store
//! implementing [`DataAccess`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use apollo_synthesis::Configuration;
//! use apollo_synthesis::InMemoryStore;
//! use apollo_synthesis::Request;
//! use apollo_synthesis::SynthesizedSchema;
//! use serde_json_bytes::json;
//!
//! # futures::executor::block_on(async {
//! let store = InMemoryStore::from_json(&json!({
//!     "Album": [{ "id": 1, "name": "Animals", "artist": "Pink Floyd" }],
//! }))?;
//! let schema = SynthesizedSchema::new(
//!     "type Album { id: ID! name: String artist: String }",
//!     Arc::new(store),
//!     Configuration::default(),
//! )?;
//! let response = schema
//!     .execute(&Request::new(r#"{ Albums(artist: "Pink Floyd") { name } }"#))
//!     .await;
//! assert!(response.errors.is_empty());
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod configuration;
pub mod error;
pub mod execution;
pub mod naming;
pub mod predicate;
pub mod reconcile;
pub mod registry;
pub mod resolvers;
pub mod schema;
pub mod store;

pub use crate::configuration::AmbiguousMatchPolicy;
pub use crate::configuration::Configuration;
pub use crate::error::CompileError;
pub use crate::error::ConfigurationError;
pub use crate::error::ResolveError;
pub use crate::error::SchemaError;
pub use crate::error::StoreError;
pub use crate::execution::Request;
pub use crate::execution::Response;
pub use crate::execution::SynthesizedSchema;
pub use crate::predicate::Predicate;
pub use crate::reconcile::Lookup;
pub use crate::registry::TypeRegistry;
pub use crate::resolvers::synthesize;
pub use crate::store::DataAccess;
pub use crate::store::Record;
pub use crate::store::memory::InMemoryStore;
