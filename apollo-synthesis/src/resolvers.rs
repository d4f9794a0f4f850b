//! Resolver bindings synthesized for every declared type.
//!
//! Each type `T` gets three root fields:
//!
//! * `T`, a lookup returning at most one record (see [`SingularMatch`]),
//! * `Ts`, a listing returning every matching record,
//! * `createT`, a mutation storing a new record.
//!
//! Lookups compile their arguments into a [`Predicate`], call [`DataAccess::lookup`] and
//! [`reconcile`] the result. Reference fields of returned records are never looked up again: the
//! store embeds related records directly.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::ast::OperationType;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;

use crate::error::ResolveError;
use crate::error::SchemaError;
use crate::naming;
use crate::predicate::Predicate;
use crate::reconcile::Reconciled;
use crate::reconcile::SingularMatch;
use crate::reconcile::reconcile;
use crate::registry::Cardinality;
use crate::registry::FieldKind;
use crate::registry::TypeDefinition;
use crate::registry::TypeRegistry;
use crate::store::DataAccess;
use crate::store::Record;

/// Which of the three synthesized fields a binding implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// `T(...)`: at most one record.
    Lookup,
    /// `Ts(...)`: every matching record.
    List,
    /// `createT(...)`: a newly stored record.
    Create,
}

impl BindingKind {
    /// The root operation type the field is attached to.
    pub fn operation_type(self) -> OperationType {
        match self {
            Self::Lookup | Self::List => OperationType::Query,
            Self::Create => OperationType::Mutation,
        }
    }
}

/// The value a binding produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutput {
    Single(SingularMatch),
    List(Vec<Record>),
    Created(Record),
}

/// One synthesized root field, bound to its type and to the store.
#[derive(Clone)]
pub struct ResolverBinding {
    field_name: Name,
    kind: BindingKind,
    definition: Arc<TypeDefinition>,
    registry: Arc<TypeRegistry>,
    store: Arc<dyn DataAccess>,
}

impl fmt::Debug for ResolverBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverBinding")
            .field("field_name", &self.field_name)
            .field("kind", &self.kind)
            .field("type_name", &self.definition.name)
            .finish_non_exhaustive()
    }
}

impl ResolverBinding {
    pub fn field_name(&self) -> &Name {
        &self.field_name
    }

    pub fn type_name(&self) -> &Name {
        &self.definition.name
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    pub fn definition(&self) -> &TypeDefinition {
        &self.definition
    }

    /// Invokes the binding with the field's arguments.
    #[tracing::instrument(skip_all, level = "trace", fields(field = %self.field_name))]
    pub async fn resolve(&self, arguments: &JsonMap) -> Result<FieldOutput, ResolveError> {
        let expected = match self.kind {
            BindingKind::Lookup => Cardinality::Single,
            BindingKind::List => Cardinality::List,
            BindingKind::Create => {
                return self.create(arguments).await.map(FieldOutput::Created);
            }
        };
        Ok(match self.lookup(arguments, expected).await? {
            Reconciled::Single(found) => FieldOutput::Single(found),
            Reconciled::List(records) => FieldOutput::List(records),
        })
    }

    async fn lookup(
        &self,
        arguments: &JsonMap,
        expected: Cardinality,
    ) -> Result<Reconciled, ResolveError> {
        self.check_filter(arguments)?;
        let predicate = Predicate::compile(arguments)?;
        let type_name = self.type_name().as_str();
        tracing::debug!(type_name, %predicate, "store lookup");
        let raw = self.store.lookup(type_name, &predicate).await?;
        Ok(reconcile(raw, expected))
    }

    async fn create(&self, arguments: &JsonMap) -> Result<Record, ResolveError> {
        self.check_input(arguments)?;
        let type_name = self.type_name().as_str();
        tracing::debug!(type_name, "store create");
        Ok(self.store.create(type_name, arguments.clone()).await?)
    }

    /// Arguments must name filterable fields; references take nested filters over the target's
    /// single-valued scalar fields.
    fn check_filter(&self, arguments: &JsonMap) -> Result<(), ResolveError> {
        for (argument, value) in arguments {
            let field = self
                .definition
                .field(argument.as_str())
                .filter(|field| field.is_filterable())
                .ok_or_else(|| ResolveError::UnknownArgument {
                    type_name: self.type_name().clone(),
                    argument: argument.as_str().to_owned(),
                })?;
            match (&field.kind, value) {
                (FieldKind::Reference(target), JsonValue::Object(nested)) => {
                    let target = self.registry.get(target);
                    for nested_argument in nested.keys() {
                        if !target.is_some_and(|target| {
                            target
                                .field(nested_argument.as_str())
                                .is_some_and(|field| field.is_filterable() && field.kind.is_scalar())
                        }) {
                            return Err(ResolveError::UnknownArgument {
                                type_name: field.kind.type_name().clone(),
                                argument: nested_argument.as_str().to_owned(),
                            });
                        }
                    }
                }
                (FieldKind::Reference(_), JsonValue::Null) => {}
                (FieldKind::Reference(target), _) => {
                    return Err(ResolveError::InvalidInput {
                        type_name: self.type_name().clone(),
                        reason: format!(
                            "'{argument}' references '{target}' and takes a nested filter",
                            argument = argument.as_str()
                        ),
                    });
                }
                (FieldKind::Scalar(_), JsonValue::Object(_)) => {
                    return Err(ResolveError::InvalidInput {
                        type_name: self.type_name().clone(),
                        reason: format!(
                            "'{}' is a scalar field and cannot take a nested filter",
                            argument.as_str()
                        ),
                    });
                }
                (FieldKind::Scalar(_), _) => {}
            }
        }
        Ok(())
    }

    /// Creation input covers single-valued scalar fields except the identity.
    fn check_input(&self, arguments: &JsonMap) -> Result<(), ResolveError> {
        let invalid = |reason: String| ResolveError::InvalidInput {
            type_name: self.type_name().clone(),
            reason,
        };
        if let Some(identity) = self.definition.identity_field()
            && arguments.contains_key(identity.name.as_str())
        {
            return Err(invalid(format!(
                "identity field '{}' is assigned by the store",
                identity.name
            )));
        }
        for (argument, value) in arguments {
            if !self
                .definition
                .input_fields()
                .any(|field| field.name == argument.as_str())
            {
                return Err(ResolveError::UnknownArgument {
                    type_name: self.type_name().clone(),
                    argument: argument.as_str().to_owned(),
                });
            }
            if matches!(value, JsonValue::Array(_) | JsonValue::Object(_)) {
                return Err(invalid(format!(
                    "'{}' takes a scalar value",
                    argument.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// The synthesized root fields, keyed by field name.
#[derive(Clone, Debug)]
pub struct ResolverMap {
    registry: Arc<TypeRegistry>,
    bindings: IndexMap<Name, ResolverBinding>,
}

impl ResolverMap {
    pub fn get(&self, field_name: &str) -> Option<&ResolverBinding> {
        self.bindings.get(field_name)
    }

    /// Bindings in synthesis order: per type, lookup, listing, then creation.
    pub fn bindings(&self) -> impl Iterator<Item = &ResolverBinding> {
        self.bindings.values()
    }

    pub fn root_fields(
        &self,
        operation_type: OperationType,
    ) -> impl Iterator<Item = &ResolverBinding> {
        self.bindings
            .values()
            .filter(move |binding| binding.kind.operation_type() == operation_type)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Drops the creation bindings, for read-only stores.
    pub fn without_mutations(mut self) -> Self {
        self.bindings
            .retain(|_, binding| binding.kind != BindingKind::Create);
        self
    }
}

/// Builds the lookup, listing and creation bindings of every registered type.
///
/// Fails when two types derive the same field name, e.g. `Album` and `Albums`.
pub fn synthesize(
    registry: Arc<TypeRegistry>,
    store: Arc<dyn DataAccess>,
) -> Result<ResolverMap, SchemaError> {
    let mut bindings = IndexMap::<Name, ResolverBinding>::default();
    for definition in registry.types() {
        let definition = Arc::new(definition.clone());
        let type_name = definition.name.as_str();
        for (field_name, kind) in [
            (naming::singular_field_name(type_name), BindingKind::Lookup),
            (naming::plural_field_name(type_name), BindingKind::List),
            (naming::create_mutation_name(type_name), BindingKind::Create),
        ] {
            let field_name = Name::new(&field_name)?;
            if let Some(existing) = bindings.get(&field_name) {
                return Err(SchemaError::FieldNameCollision {
                    field_name,
                    first: existing.type_name().clone(),
                    second: definition.name.clone(),
                });
            }
            bindings.insert(
                field_name.clone(),
                ResolverBinding {
                    field_name,
                    kind,
                    definition: definition.clone(),
                    registry: registry.clone(),
                    store: store.clone(),
                },
            );
        }
    }
    Ok(ResolverMap { registry, bindings })
}
