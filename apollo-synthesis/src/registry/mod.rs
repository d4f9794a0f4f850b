//! Declared object types and their fields.
//!
//! A [`TypeRegistry`] is built once from a full set of [`TypeDefinition`]s and is read-only
//! afterwards. Forward references between types are allowed because the whole definition set is
//! known before validation runs.

use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;

use crate::error::SchemaError;

mod sdl;

pub(crate) const ROOT_TYPE_NAMES: [&str; 3] = ["Query", "Mutation", "Subscription"];
pub(crate) const BUILT_IN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Whether a field holds one value or a list of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Single,
    List,
}

/// What a field's values are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A leaf value of the named scalar type (built-in or custom).
    Scalar(Name),
    /// An embedded record of another declared type.
    Reference(Name),
}

impl FieldKind {
    pub fn type_name(&self) -> &Name {
        match self {
            Self::Scalar(name) | Self::Reference(name) => name,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: Name,
    pub kind: FieldKind,
    pub cardinality: Cardinality,
    /// The field is declared non-null.
    pub required: bool,
}

impl FieldDefinition {
    pub fn scalar(name: Name, scalar: Name) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar(scalar),
            cardinality: Cardinality::Single,
            required: false,
        }
    }

    pub fn reference(name: Name, target: Name) -> Self {
        Self {
            name,
            kind: FieldKind::Reference(target),
            cardinality: Cardinality::Single,
            required: false,
        }
    }

    pub fn list(mut self) -> Self {
        self.cardinality = Cardinality::List;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Single-valued fields can appear in lookup filters.
    pub fn is_filterable(&self) -> bool {
        self.cardinality == Cardinality::Single
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.cardinality == Cardinality::Single && self.kind == FieldKind::Scalar(ID_SCALAR)
    }
}

const ID_SCALAR: Name = apollo_compiler::name!("ID");

/// Renders the field type the way it would appear in SDL.
impl fmt::Display for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let named = self.kind.type_name();
        match self.cardinality {
            Cardinality::Single => write!(f, "{named}")?,
            Cardinality::List => write!(f, "[{named}]")?,
        }
        if self.required {
            f.write_str("!")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    pub name: Name,
    pub fields: Vec<FieldDefinition>,
}

impl TypeDefinition {
    pub fn new(name: Name, fields: impl IntoIterator<Item = FieldDefinition>) -> Self {
        Self {
            name,
            fields: fields.into_iter().collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The field whose value the store assigns on creation: the first single-valued `ID` field.
    pub fn identity_field(&self) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.is_identity())
    }

    /// Fields accepted as lookup arguments.
    pub fn filterable_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|field| field.is_filterable())
    }

    /// Fields accepted as creation arguments: single-valued scalars except the identity.
    pub fn input_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        let identity = self.identity_field().map(|field| &field.name);
        self.fields.iter().filter(move |field| {
            field.is_filterable() && field.kind.is_scalar() && Some(&field.name) != identity
        })
    }
}

/// The validated set of declared object types.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<Name, TypeDefinition>,
}

impl TypeRegistry {
    /// Validates a complete set of type definitions.
    ///
    /// Fails on duplicate type or field names, on reserved root type names, and on references to
    /// types missing from the set.
    pub fn build(
        definitions: impl IntoIterator<Item = TypeDefinition>,
    ) -> Result<Self, SchemaError> {
        let mut types = IndexMap::<Name, TypeDefinition>::default();
        for definition in definitions {
            if ROOT_TYPE_NAMES.contains(&definition.name.as_str()) {
                return Err(SchemaError::ReservedTypeName {
                    type_name: definition.name,
                });
            }
            let mut field_names = IndexSet::default();
            for field in &definition.fields {
                if !field_names.insert(&field.name) {
                    return Err(SchemaError::DuplicateField {
                        type_name: definition.name.clone(),
                        field_name: field.name.clone(),
                    });
                }
            }
            if types.contains_key(&definition.name) {
                return Err(SchemaError::DuplicateType {
                    type_name: definition.name,
                });
            }
            types.insert(definition.name.clone(), definition);
        }

        for definition in types.values() {
            for field in &definition.fields {
                match &field.kind {
                    FieldKind::Reference(target) if !types.contains_key(target) => {
                        return Err(SchemaError::UndefinedReference {
                            type_name: definition.name.clone(),
                            field_name: field.name.clone(),
                            target: target.clone(),
                        });
                    }
                    FieldKind::Scalar(scalar) if types.contains_key(scalar) => {
                        return Err(SchemaError::UnsupportedFieldType {
                            type_name: definition.name.clone(),
                            field_name: field.name.clone(),
                            target: scalar.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(Self { types })
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeDefinition> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Non built-in scalar names used by any field, in first-use order.
    pub fn custom_scalars(&self) -> IndexSet<&Name> {
        self.types
            .values()
            .flat_map(|definition| &definition.fields)
            .filter_map(|field| match &field.kind {
                FieldKind::Scalar(name) if !BUILT_IN_SCALARS.contains(&name.as_str()) => {
                    Some(name)
                }
                _ => None,
            })
            .collect()
    }

    /// Types that some single-valued reference field points to, in first-use order.
    pub(crate) fn filtered_references(&self) -> IndexSet<&Name> {
        self.types
            .values()
            .flat_map(|definition| definition.filterable_fields())
            .filter_map(|field| match &field.kind {
                FieldKind::Reference(target) => Some(target),
                FieldKind::Scalar(_) => None,
            })
            .collect()
    }
}
