//! Builds a [`TypeRegistry`] from schema definition language text.

use std::path::Path;

use apollo_compiler::Schema;
use apollo_compiler::schema::ExtendedType;

use super::Cardinality;
use super::FieldDefinition;
use super::FieldKind;
use super::ROOT_TYPE_NAMES;
use super::TypeDefinition;
use super::TypeRegistry;
use crate::error::SchemaError;

impl TypeRegistry {
    /// Parses object type definitions out of SDL text and validates them.
    ///
    /// Scalars and enums become scalar fields, object types become references. Root operation
    /// types are skipped: their fields are synthesized, never declared.
    pub fn parse(sdl: &str) -> Result<Self, SchemaError> {
        let schema =
            Schema::parse(sdl, "schema.graphql").map_err(|e| SchemaError::InvalidSdl {
                message: e.errors.to_string(),
            })?;
        Self::from_schema(&schema)
    }

    /// Reads and parses an SDL file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let sdl = std::fs::read_to_string(path.as_ref()).map_err(|e| SchemaError::Io {
            message: format!("{}: {e}", path.as_ref().display()),
        })?;
        Self::parse(&sdl)
    }

    pub fn from_schema(schema: &Schema) -> Result<Self, SchemaError> {
        let mut definitions = Vec::new();
        for (name, ty) in &schema.types {
            let ExtendedType::Object(object) = ty else {
                continue;
            };
            if ty.is_built_in() {
                continue;
            }
            if ROOT_TYPE_NAMES.contains(&name.as_str()) {
                tracing::warn!(type_name = %name, "skipping root operation type in type definitions");
                continue;
            }
            let mut fields = Vec::with_capacity(object.fields.len());
            for field in object.fields.values() {
                let target = field.ty.inner_named_type();
                let kind = match schema.types.get(target) {
                    Some(ExtendedType::Scalar(_) | ExtendedType::Enum(_)) => {
                        FieldKind::Scalar(target.clone())
                    }
                    Some(ExtendedType::Object(_)) | None => FieldKind::Reference(target.clone()),
                    Some(_) => {
                        return Err(SchemaError::UnsupportedFieldType {
                            type_name: name.clone(),
                            field_name: field.name.clone(),
                            target: target.clone(),
                        });
                    }
                };
                fields.push(FieldDefinition {
                    name: field.name.clone(),
                    kind,
                    cardinality: if field.ty.is_list() {
                        Cardinality::List
                    } else {
                        Cardinality::Single
                    },
                    required: field.ty.is_non_null(),
                });
            }
            definitions.push(TypeDefinition::new(name.clone(), fields));
        }
        Self::build(definitions)
    }
}
