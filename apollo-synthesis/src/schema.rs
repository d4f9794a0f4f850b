//! The GraphQL schema exposing the synthesized root fields.

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast::OperationType;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::validation::Valid;

use crate::error::SchemaError;
use crate::naming;
use crate::registry::FieldDefinition;
use crate::registry::FieldKind;
use crate::registry::TypeDefinition;
use crate::registry::TypeRegistry;
use crate::resolvers::BindingKind;
use crate::resolvers::ResolverBinding;
use crate::resolvers::ResolverMap;

/// Filter input type name, with the target's single-valued scalar fields.
type FilterInputs<'a> = IndexMap<&'a Name, (String, Vec<&'a FieldDefinition>)>;

/// Renders the declared types, the reference filter inputs and the `Query`/`Mutation` root types
/// holding the bindings of `resolvers`.
pub fn synthesized_sdl(resolvers: &ResolverMap) -> Result<String, SchemaError> {
    let registry = resolvers.registry();
    let filters = filter_inputs(registry)?;

    let mut blocks = Vec::new();
    for definition in registry.types() {
        blocks.push(object_type(definition));
    }
    for (input_name, fields) in filters.values() {
        let mut block = format!("input {input_name} {{\n");
        for field in fields {
            block.push_str(&format!("  {}: {}\n", field.name, field.kind.type_name()));
        }
        block.push('}');
        blocks.push(block);
    }
    for (operation_type, root_name) in [
        (OperationType::Query, "Query"),
        (OperationType::Mutation, "Mutation"),
    ] {
        let mut fields = resolvers.root_fields(operation_type).peekable();
        if fields.peek().is_none() {
            continue;
        }
        let mut block = format!("type {root_name} {{\n");
        for binding in fields {
            block.push_str(&format!("  {}\n", root_field(binding, &filters)));
        }
        block.push('}');
        blocks.push(block);
    }
    for scalar in registry.custom_scalars() {
        blocks.push(format!("scalar {scalar}"));
    }

    let mut sdl = blocks.join("\n\n");
    sdl.push('\n');
    Ok(sdl)
}

/// Renders and validates the synthesized schema.
pub fn synthesized_schema(resolvers: &ResolverMap) -> Result<Valid<Schema>, SchemaError> {
    let sdl = synthesized_sdl(resolvers)?;
    Schema::parse_and_validate(sdl, "synthesized.graphql").map_err(|e| {
        SchemaError::InvalidGeneratedSchema {
            message: e.errors.to_string(),
        }
    })
}

fn filter_inputs(registry: &TypeRegistry) -> Result<FilterInputs<'_>, SchemaError> {
    let mut filters = FilterInputs::default();
    for target in registry.filtered_references() {
        let input_name = naming::filter_input_name(target);
        if registry.contains(&input_name)
            || registry
                .custom_scalars()
                .iter()
                .any(|scalar| scalar.as_str() == input_name)
        {
            return Err(SchemaError::GeneratedTypeCollision {
                type_name: Name::new(&input_name)?,
            });
        }
        let fields = registry
            .get(target)
            .into_iter()
            .flat_map(|definition| definition.filterable_fields())
            .filter(|field| field.kind.is_scalar())
            .collect::<Vec<_>>();
        // An input object needs at least one field.
        if !fields.is_empty() {
            filters.insert(target, (input_name, fields));
        }
    }
    Ok(filters)
}

fn object_type(definition: &TypeDefinition) -> String {
    let mut block = format!("type {} {{\n", definition.name);
    for field in &definition.fields {
        block.push_str(&format!("  {}: {field}\n", field.name));
    }
    block.push('}');
    block
}

fn root_field(binding: &ResolverBinding, filters: &FilterInputs<'_>) -> String {
    let definition = binding.definition();
    let arguments = match binding.kind() {
        BindingKind::Lookup | BindingKind::List => definition
            .filterable_fields()
            .filter_map(|field| match &field.kind {
                FieldKind::Scalar(scalar) => Some(format!("{}: {scalar}", field.name)),
                FieldKind::Reference(target) => filters
                    .get(target)
                    .map(|(input_name, _)| format!("{}: {input_name}", field.name)),
            })
            .collect::<Vec<_>>(),
        BindingKind::Create => definition
            .input_fields()
            .map(|field| format!("{}: {}", field.name, field.kind.type_name()))
            .collect(),
    };
    let arguments = if arguments.is_empty() {
        String::new()
    } else {
        format!("({})", arguments.join(", "))
    };
    let type_name = binding.type_name();
    let output = match binding.kind() {
        BindingKind::List => format!("[{type_name}!]"),
        BindingKind::Lookup | BindingKind::Create => type_name.to_string(),
    };
    format!("{}{arguments}: {output}", binding.field_name())
}
