//! Root field names derived from type names.
//!
//! The conventions are fixed: the lookup field is the type name itself, the listing field appends
//! `s` (irregular plurals are not handled), and the creation field prefixes `create`.

pub fn singular_field_name(type_name: &str) -> String {
    type_name.to_owned()
}

pub fn plural_field_name(type_name: &str) -> String {
    format!("{type_name}s")
}

pub fn create_mutation_name(type_name: &str) -> String {
    format!("create{type_name}")
}

/// Name of the input type used to filter on fields of an embedded `type_name` record.
pub(crate) fn filter_input_name(type_name: &str) -> String {
    format!("{type_name}Filter")
}
