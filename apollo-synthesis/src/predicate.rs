//! Equality filters compiled from field arguments.
//!
//! A [`Predicate`] is either [`Predicate::Unconstrained`] or a conjunction of [`FilterTerm`]s, each
//! constraining one field (or one field of an embedded object) to a scalar value.
//!
//! The canonical string form is `all()` for the unconstrained predicate, otherwise the terms in
//! argument order joined with `&`, each rendered `field=value` or `field.nested=value`:
//!
//! ```text
//! artist=Pink Floyd&label.name=Harvest Records
//! ```
//!
//! Stores receive the structured value and may either match records with
//! [`Predicate::matches`] or work with the string form. [`str::parse`] recovers the terms from the
//! string form, with every value as a string: a decompiled `null` is the text `null` and no
//! longer matches absent fields. Values containing `&` cannot be represented and fail to compile;
//! a value containing `=` survives because terms are split on their first `=` only.

use std::fmt;
use std::str::FromStr;

use apollo_compiler::Name;
use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;
use serde_json_bytes::serde_json::Number;

use crate::error::CompileError;

/// Canonical string of [`Predicate::Unconstrained`].
pub const UNCONSTRAINED: &str = "all()";

const CONJUNCTION: char = '&';
const EQUALS: char = '=';
const PATH_SEPARATOR: char = '.';

/// A field, or a field of the record embedded in a reference field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    pub field: Name,
    pub nested: Option<Name>,
}

impl FieldPath {
    pub fn direct(field: Name) -> Self {
        Self {
            field,
            nested: None,
        }
    }

    pub fn nested(field: Name, nested: Name) -> Self {
        Self {
            field,
            nested: Some(nested),
        }
    }

    /// Number of path components, 1 or 2.
    pub fn depth(&self) -> usize {
        if self.nested.is_some() { 2 } else { 1 }
    }

    /// Looks the path up in a record. `None` when any component is absent.
    pub fn lookup<'a>(&self, record: &'a JsonMap) -> Option<&'a JsonValue> {
        let value = record.get(self.field.as_str())?;
        match &self.nested {
            None => Some(value),
            Some(nested) => value.as_object()?.get(nested.as_str()),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field.as_str())?;
        if let Some(nested) = &self.nested {
            write!(f, "{PATH_SEPARATOR}{nested}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = CompileError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let malformed = || CompileError::MalformedPredicate {
            term: path.to_owned(),
        };
        let mut components = path.split(PATH_SEPARATOR);
        let field = components.next().ok_or_else(malformed)?;
        let field = Name::new(field).map_err(|_| malformed())?;
        let nested = components
            .next()
            .map(|nested| Name::new(nested).map_err(|_| malformed()))
            .transpose()?;
        if components.next().is_some() {
            return Err(malformed());
        }
        Ok(Self { field, nested })
    }
}

/// One equality constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTerm {
    pub path: FieldPath,
    /// A JSON scalar: string, number, boolean or null.
    pub value: JsonValue,
}

impl FilterTerm {
    pub fn new(path: FieldPath, value: impl Into<JsonValue>) -> Self {
        Self {
            path,
            value: value.into(),
        }
    }

    /// The value as it appears in the canonical string.
    pub fn value_text(&self) -> String {
        scalar_text(&self.value)
    }

    /// Whether the record satisfies this term.
    ///
    /// An absent field compares as `null`. When the path goes through an embedded list, any
    /// element may satisfy the term.
    pub fn matches(&self, record: &JsonMap) -> bool {
        let Some(value) = record.get(self.path.field.as_str()) else {
            return scalar_eq(&self.value, &JsonValue::Null);
        };
        match &self.path.nested {
            None => scalar_eq(&self.value, value),
            Some(nested) => match value {
                JsonValue::Object(embedded) => scalar_eq(
                    &self.value,
                    embedded.get(nested.as_str()).unwrap_or(&JsonValue::Null),
                ),
                JsonValue::Array(items) => items.iter().any(|item| {
                    item.as_object().is_some_and(|embedded| {
                        scalar_eq(
                            &self.value,
                            embedded.get(nested.as_str()).unwrap_or(&JsonValue::Null),
                        )
                    })
                }),
                _ => scalar_eq(&self.value, &JsonValue::Null),
            },
        }
    }
}

impl fmt::Display for FilterTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{EQUALS}{}", self.path, self.value_text())
    }
}

/// A conjunctive equality filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record. Never produced from a non-empty argument map.
    Unconstrained,
    /// Matches records satisfying every term. Never empty.
    Conjunction(Vec<FilterTerm>),
}

impl Predicate {
    /// Compiles field arguments into a predicate, preserving argument order.
    ///
    /// Scalar values constrain the named field directly. Object values constrain fields of the
    /// record embedded in the named reference field, one term per entry. Deeper nesting,
    /// list values, empty nested objects and values containing `&` are rejected.
    pub fn compile(arguments: &JsonMap) -> Result<Self, CompileError> {
        if arguments.is_empty() {
            return Ok(Self::Unconstrained);
        }
        let mut terms = Vec::with_capacity(arguments.len());
        for (field, value) in arguments {
            let field = parse_name(field.as_str())?;
            match value {
                JsonValue::Object(nested_arguments) => {
                    if nested_arguments.is_empty() {
                        return Err(CompileError::EmptyNestedFilter {
                            field: field.to_string(),
                        });
                    }
                    for (nested, value) in nested_arguments {
                        let nested = parse_name(nested.as_str())?;
                        if value.is_object() {
                            return Err(CompileError::UnsupportedNestingDepth {
                                field: field.to_string(),
                                nested: nested.to_string(),
                            });
                        }
                        let path = FieldPath::nested(field.clone(), nested);
                        terms.push(compile_term(path, value)?);
                    }
                }
                _ => terms.push(compile_term(FieldPath::direct(field), value)?),
            }
        }
        Ok(Self::Conjunction(terms))
    }

    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Self::Unconstrained)
    }

    pub fn terms(&self) -> &[FilterTerm] {
        match self {
            Self::Unconstrained => &[],
            Self::Conjunction(terms) => terms,
        }
    }

    /// Whether the record satisfies every term.
    pub fn matches(&self, record: &JsonMap) -> bool {
        self.terms().iter().all(|term| term.matches(record))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconstrained => f.write_str(UNCONSTRAINED),
            Self::Conjunction(terms) => {
                for (index, term) in terms.iter().enumerate() {
                    if index > 0 {
                        write!(f, "{CONJUNCTION}")?;
                    }
                    write!(f, "{term}")?;
                }
                Ok(())
            }
        }
    }
}

/// Recovers the terms of a canonical predicate string. Values come back as strings.
impl FromStr for Predicate {
    type Err = CompileError;

    fn from_str(predicate: &str) -> Result<Self, Self::Err> {
        if predicate == UNCONSTRAINED {
            return Ok(Self::Unconstrained);
        }
        predicate
            .split(CONJUNCTION)
            .map(|term| -> Result<FilterTerm, CompileError> {
                let (path, value) =
                    term.split_once(EQUALS)
                        .ok_or_else(|| CompileError::MalformedPredicate {
                            term: term.to_owned(),
                        })?;
                Ok(FilterTerm::new(path.parse()?, value))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Conjunction)
    }
}

fn parse_name(name: &str) -> Result<Name, CompileError> {
    Name::new(name).map_err(|_| CompileError::InvalidFieldName {
        name: name.to_owned(),
    })
}

fn compile_term(path: FieldPath, value: &JsonValue) -> Result<FilterTerm, CompileError> {
    match value {
        JsonValue::Array(_) | JsonValue::Object(_) => Err(CompileError::NonScalarValue {
            path: path.to_string(),
        }),
        JsonValue::String(text) if text.as_str().contains(CONJUNCTION) => {
            Err(CompileError::ReservedSeparator {
                path: path.to_string(),
            })
        }
        _ => Ok(FilterTerm {
            path,
            value: value.clone(),
        }),
    }
}

fn scalar_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.as_str().to_owned(),
        other => other.to_string(),
    }
}

/// Strings compare byte for byte. A number equals another number of the same value, or a string
/// parsing to that value. Booleans equal their `true`/`false` text. `null` equals only `null`.
fn scalar_eq(expected: &JsonValue, actual: &JsonValue) -> bool {
    match (expected, actual) {
        (JsonValue::Null, JsonValue::Null) => true,
        (JsonValue::String(expected), JsonValue::String(actual)) => expected == actual,
        (JsonValue::Number(expected), JsonValue::Number(actual)) => number_eq(expected, actual),
        (JsonValue::Number(number), JsonValue::String(text))
        | (JsonValue::String(text), JsonValue::Number(number)) => text
            .as_str()
            .parse::<Number>()
            .is_ok_and(|parsed| number_eq(number, &parsed)),
        (JsonValue::Bool(expected), JsonValue::Bool(actual)) => expected == actual,
        (JsonValue::Bool(flag), JsonValue::String(text))
        | (JsonValue::String(text), JsonValue::Bool(flag)) => {
            text.as_str() == if *flag { "true" } else { "false" }
        }
        _ => false,
    }
}

fn number_eq(left: &Number, right: &Number) -> bool {
    match (left.as_i64(), right.as_i64()) {
        (Some(left), Some(right)) => left == right,
        _ => left.as_f64().zip(right.as_f64()).is_some_and(|(l, r)| l == r),
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json_bytes::json;

    use super::*;

    fn arguments(value: JsonValue) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    fn record(value: JsonValue) -> JsonMap {
        arguments(value)
    }

    #[test]
    fn empty_arguments_are_unconstrained() {
        let predicate = Predicate::compile(&JsonMap::new()).unwrap();
        assert_eq!(predicate, Predicate::Unconstrained);
        assert_eq!(predicate.to_string(), "all()");
        assert_eq!("all()".parse::<Predicate>().unwrap(), Predicate::Unconstrained);
    }

    #[test]
    fn scalar_arguments_keep_their_order() {
        let predicate = Predicate::compile(&arguments(json!({
            "name": "The Wall",
            "artist": "Pink Floyd",
        })))
        .unwrap();
        assert_eq!(predicate.to_string(), "name=The Wall&artist=Pink Floyd");

        let reordered = Predicate::compile(&arguments(json!({
            "artist": "Pink Floyd",
            "name": "The Wall",
        })))
        .unwrap();
        assert_eq!(reordered.to_string(), "artist=Pink Floyd&name=The Wall");
    }

    #[test]
    fn scalar_terms_survive_the_string_form() {
        let input = arguments(json!({
            "artist": "Pink Floyd",
            "releaseDate": "November 30, 1979",
            "name": "a=b",
        }));
        let predicate = Predicate::compile(&input).unwrap();
        let decompiled: Predicate = predicate.to_string().parse().unwrap();
        assert_eq!(decompiled, predicate);
        assert_eq!(
            decompiled
                .terms()
                .iter()
                .map(|term| (term.path.to_string(), term.value_text()))
                .collect::<Vec<_>>(),
            input
                .iter()
                .map(|(key, value)| (key.as_str().to_owned(), scalar_text(value)))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn numbers_and_booleans_render_as_json() {
        let predicate = Predicate::compile(&arguments(json!({
            "id": 2,
            "rating": 4.5,
            "remastered": true,
            "label": null,
        })))
        .unwrap();
        assert_eq!(
            predicate.to_string(),
            "id=2&rating=4.5&remastered=true&label=null"
        );
        let decompiled: Predicate = predicate.to_string().parse().unwrap();
        assert_eq!(decompiled.terms()[0].value, json!("2"));
    }

    #[test]
    fn nested_filter_compiles_to_a_dotted_path() {
        let predicate = Predicate::compile(&arguments(json!({
            "label": { "name": "Harvest Records" },
        })))
        .unwrap();
        assert_eq!(
            predicate,
            Predicate::Conjunction(vec![FilterTerm::new(
                FieldPath::nested(name!("label"), name!("name")),
                "Harvest Records",
            )])
        );
        assert_eq!(predicate.to_string(), "label.name=Harvest Records");
    }

    #[rstest]
    #[case::deeper_nesting(
        json!({ "label": { "owner": { "name": "EMI" } } }),
        CompileError::UnsupportedNestingDepth { field: "label".into(), nested: "owner".into() },
    )]
    #[case::reserved_separator(
        json!({ "artist": "Simon & Garfunkel" }),
        CompileError::ReservedSeparator { path: "artist".into() },
    )]
    #[case::nested_reserved_separator(
        json!({ "label": { "name": "A&M Records" } }),
        CompileError::ReservedSeparator { path: "label.name".into() },
    )]
    #[case::list_value(
        json!({ "name": ["The Wall"] }),
        CompileError::NonScalarValue { path: "name".into() },
    )]
    #[case::empty_nested_filter(
        json!({ "label": {} }),
        CompileError::EmptyNestedFilter { field: "label".into() },
    )]
    #[case::invalid_field_name(
        json!({ "release date": "1979" }),
        CompileError::InvalidFieldName { name: "release date".into() },
    )]
    fn compile_errors(#[case] input: JsonValue, #[case] expected: CompileError) {
        assert_eq!(Predicate::compile(&arguments(input)), Err(expected));
    }

    #[rstest]
    #[case::missing_equals("name")]
    #[case::empty_path("=Pink Floyd")]
    #[case::too_deep("label.owner.name=EMI")]
    #[case::empty_term("name=The Wall&")]
    fn malformed_predicate_strings(#[case] input: &str) {
        assert!(matches!(
            input.parse::<Predicate>(),
            Err(CompileError::MalformedPredicate { .. })
        ));
    }

    #[test]
    fn value_with_equals_keeps_everything_after_the_first_one() {
        let predicate: Predicate = "equation=e=mc2".parse().unwrap();
        assert_eq!(predicate.terms()[0].path, FieldPath::direct(name!("equation")));
        assert_eq!(predicate.terms()[0].value, json!("e=mc2"));
    }

    #[test]
    fn matches_direct_fields_as_text_or_number() {
        let album = record(json!({
            "id": 2,
            "name": "The Beatles",
            "artist": "Beatles",
        }));
        let by_id: Predicate = "id=2".parse().unwrap();
        assert!(by_id.matches(&album));
        let by_float = Predicate::compile(&arguments(json!({ "id": 2.0 }))).unwrap();
        assert!(by_float.matches(&album));
        let wrong_case: Predicate = "artist=beatles".parse().unwrap();
        assert!(!wrong_case.matches(&album));
        let both: Predicate = "artist=Beatles&name=The Beatles".parse().unwrap();
        assert!(both.matches(&album));
        let one_wrong: Predicate = "artist=Beatles&name=Abbey Road".parse().unwrap();
        assert!(!one_wrong.matches(&album));
        assert!(Predicate::Unconstrained.matches(&album));
    }

    #[test]
    fn matches_embedded_objects() {
        let album = record(json!({
            "id": 3,
            "label": { "name": "Harvest Records" },
            "producers": [{ "name": "Bob Ezrin" }, { "name": "James Guthrie" }],
        }));
        let predicate: Predicate = "label.name=Harvest Records".parse().unwrap();
        assert!(predicate.matches(&album));
        let other: Predicate = "label.name=EMI".parse().unwrap();
        assert!(!other.matches(&album));
        let in_list: Predicate = "producers.name=James Guthrie".parse().unwrap();
        assert!(in_list.matches(&album));
    }

    #[test]
    fn absent_fields_compare_as_null() {
        let album = record(json!({ "id": 1 }));
        let null_label = Predicate::compile(&arguments(json!({ "label": null }))).unwrap();
        assert!(null_label.matches(&album));
        let nested = Predicate::compile(&arguments(json!({ "label": { "name": null } }))).unwrap();
        assert!(nested.matches(&album));
        let named: Predicate = "label.name=EMI".parse().unwrap();
        assert!(!named.matches(&album));
    }

    #[rstest]
    #[case::leading_zero(json!({ "zip": "02134" }), json!({ "zip": "2134" }), false)]
    #[case::infinity_text(json!({ "artist": "inf" }), json!({ "artist": "Infinity" }), false)]
    #[case::exponent_text(json!({ "code": "1000" }), json!({ "code": "1e3" }), false)]
    #[case::nan_text(json!({ "code": "NaN" }), json!({ "code": "NaN" }), true)]
    #[case::null_text_against_absent(json!({ "artist": "null" }), json!({}), false)]
    #[case::null_text_against_null(json!({ "artist": "null" }), json!({ "artist": null }), false)]
    #[case::null_against_null_text(json!({ "artist": null }), json!({ "artist": "null" }), false)]
    #[case::number_against_text(json!({ "id": 2 }), json!({ "id": "2" }), true)]
    #[case::text_against_number(json!({ "id": "2" }), json!({ "id": 2 }), true)]
    #[case::number_against_exponent_text(json!({ "code": 1000 }), json!({ "code": "1e3" }), true)]
    #[case::number_against_infinity_text(json!({ "code": 1 }), json!({ "code": "inf" }), false)]
    #[case::integer_against_float(json!({ "id": 2 }), json!({ "id": 2.0 }), true)]
    #[case::large_integers(
        json!({ "id": 9007199254740993_i64 }),
        json!({ "id": 9007199254740992_i64 }),
        false
    )]
    #[case::boolean_text(json!({ "remastered": "true" }), json!({ "remastered": true }), true)]
    #[case::boolean_against_number(json!({ "live": true }), json!({ "live": 1 }), false)]
    fn scalar_equality(
        #[case] filter: JsonValue,
        #[case] album: JsonValue,
        #[case] expected: bool,
    ) {
        let predicate = Predicate::compile(&arguments(filter)).unwrap();
        assert_eq!(predicate.matches(&record(album)), expected);
    }

    #[test]
    fn field_path_lookup() {
        let album = record(json!({ "label": { "name": "Harvest Records" } }));
        let path = FieldPath::nested(name!("label"), name!("name"));
        assert_eq!(path.depth(), 2);
        assert_eq!(path.lookup(&album), Some(&json!("Harvest Records")));
        assert_eq!(FieldPath::direct(name!("id")).lookup(&album), None);
    }
}
