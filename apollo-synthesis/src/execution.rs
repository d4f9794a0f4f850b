//! Executes GraphQL operations against the synthesized schema.
//!
//! `apollo_compiler`'s executor is synchronous while stores are not, so an operation runs in two
//! passes. The first pass only records which root fields are selected and with which coerced
//! arguments. The recorded bindings are then awaited: query fields concurrently, mutation fields
//! one after the other. The second pass replays their results in selection order and lets the
//! executor shape nested selections out of the embedded records.

use std::cell::Cell;
use std::cell::RefCell;
use std::sync::Arc;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast::OperationType;
use apollo_compiler::resolvers::Execution;
use apollo_compiler::resolvers::FieldError;
use apollo_compiler::resolvers::ObjectValue;
use apollo_compiler::resolvers::ResolveInfo;
use apollo_compiler::resolvers::ResolvedValue;
use apollo_compiler::response::GraphQLError;
use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;
use apollo_compiler::validation::Valid;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::AmbiguousMatchPolicy;
use crate::configuration::Configuration;
use crate::error::ResolveError;
use crate::error::SchemaError;
use crate::reconcile::SingularMatch;
use crate::registry::TypeRegistry;
use crate::resolvers::FieldOutput;
use crate::resolvers::ResolverMap;
use crate::resolvers::synthesize;
use crate::schema::synthesized_schema;
use crate::store::DataAccess;
use crate::store::Record;

const AMBIGUOUS_MATCH: &str = "AMBIGUOUS_MATCH";

/// A GraphQL request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub variables: JsonMap,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn with_variables(mut self, variables: JsonMap) -> Self {
        self.variables = variables;
        self
    }
}

/// A GraphQL response body.
///
/// `data` is absent when the request failed before execution started.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl Response {
    fn from_errors(errors: Vec<GraphQLError>) -> Self {
        Self { data: None, errors }
    }
}

/// A schema whose root fields are served by synthesized resolver bindings.
pub struct SynthesizedSchema {
    schema: Valid<Schema>,
    resolvers: ResolverMap,
    configuration: Configuration,
}

impl SynthesizedSchema {
    /// Parses object type definitions out of `sdl` and synthesizes their root fields.
    pub fn new(
        sdl: &str,
        store: Arc<dyn DataAccess>,
        configuration: Configuration,
    ) -> Result<Self, SchemaError> {
        Self::from_registry(TypeRegistry::parse(sdl)?, store, configuration)
    }

    pub fn from_registry(
        registry: TypeRegistry,
        store: Arc<dyn DataAccess>,
        configuration: Configuration,
    ) -> Result<Self, SchemaError> {
        let mut resolvers = synthesize(Arc::new(registry), store)?;
        if !configuration.mutations {
            resolvers = resolvers.without_mutations();
        }
        let schema = synthesized_schema(&resolvers)?;
        tracing::debug!(
            types = resolvers.registry().len(),
            root_fields = resolvers.len(),
            "synthesized schema"
        );
        Ok(Self {
            schema,
            resolvers,
            configuration,
        })
    }

    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    pub fn resolvers(&self) -> &ResolverMap {
        &self.resolvers
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Runs one operation.
    ///
    /// Invalid documents, unknown operation names and variable coercion failures produce a
    /// response with errors only. A failing root field resolves to `null` with a field error and
    /// leaves its siblings untouched.
    pub async fn execute(&self, request: &Request) -> Response {
        let doc = match ExecutableDocument::parse_and_validate(
            &self.schema,
            request.query.as_str(),
            "query",
        ) {
            Ok(doc) => doc,
            Err(e) => return Response::from_errors(e.errors.iter().map(|e| e.to_json()).collect()),
        };
        let operation = match doc.operations.get(request.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(e) => return Response::from_errors(vec![e.to_graphql_error(&doc.sources)]),
        };
        let root_type = match self.schema.root_operation(operation.operation_type) {
            Some(root_type) if operation.operation_type != OperationType::Subscription => {
                root_type.clone()
            }
            _ => {
                return Response::from_errors(vec![GraphQLError::new(
                    "operation type is not supported by this schema",
                    None,
                    &doc.sources,
                )]);
            }
        };

        let invocations = {
            let collector = Collector {
                root_type: &root_type,
                invocations: RefCell::default(),
            };
            let collected = Execution::new(&self.schema, &doc)
                .operation(operation)
                .raw_variable_values(&request.variables)
                .enable_schema_introspection(self.configuration.introspection)
                .execute_sync(&collector);
            if let Err(request_error) = collected {
                return Response::from_errors(vec![request_error.to_graphql_error(&doc.sources)]);
            }
            collector.invocations.into_inner()
        };

        let results = match operation.operation_type {
            OperationType::Mutation => {
                let mut results = Vec::with_capacity(invocations.len());
                for invocation in invocations {
                    results.push(self.invoke(invocation).await);
                }
                results
            }
            _ => {
                futures::future::join_all(
                    invocations
                        .into_iter()
                        .map(|invocation| self.invoke(invocation)),
                )
                .await
            }
        };

        let replay = Replay {
            root_type: &root_type,
            results: &results,
            cursor: Cell::new(0),
            policy: self.configuration.ambiguous_match,
            error_extensions: RefCell::default(),
        };
        let replayed = Execution::new(&self.schema, &doc)
            .operation(operation)
            .raw_variable_values(&request.variables)
            .enable_schema_introspection(self.configuration.introspection)
            .execute_sync(&replay);
        match replayed {
            Ok(response) => {
                let mut errors = response.errors;
                attach_extensions(&mut errors, replay.error_extensions.into_inner());
                Response {
                    data: Some(JsonValue::from(response.data)),
                    errors,
                }
            }
            Err(request_error) => {
                Response::from_errors(vec![request_error.to_graphql_error(&doc.sources)])
            }
        }
    }

    async fn invoke(&self, invocation: Invocation) -> FieldResult {
        let Some(binding) = self.resolvers.get(invocation.field_name.as_str()) else {
            return FieldResult::Unbound(invocation.field_name);
        };
        match binding.resolve(&invocation.arguments).await {
            Ok(output) => FieldResult::Output(output),
            Err(error) => FieldResult::Failed(error),
        }
    }
}

/// A selected root field, with its coerced arguments.
struct Invocation {
    field_name: Name,
    arguments: JsonMap,
}

enum FieldResult {
    Output(FieldOutput),
    Failed(ResolveError),
    Unbound(Name),
}

/// First pass: records root field invocations and resolves every field to `null`.
struct Collector<'a> {
    root_type: &'a str,
    invocations: RefCell<Vec<Invocation>>,
}

impl ObjectValue for Collector<'_> {
    fn type_name(&self) -> &str {
        self.root_type
    }

    fn resolve_field<'a>(
        &'a self,
        info: &'a ResolveInfo<'a>,
    ) -> Result<ResolvedValue<'a>, FieldError> {
        if !info.field_name().starts_with("__") {
            let field_name = Name::new(info.field_name()).map_err(|e| FieldError {
                message: e.to_string(),
            })?;
            self.invocations.borrow_mut().push(Invocation {
                field_name,
                arguments: info.arguments().clone(),
            });
        }
        Ok(ResolvedValue::leaf(JsonValue::Null))
    }
}

/// Second pass: hands out the awaited results in the order they were collected.
struct Replay<'a> {
    root_type: &'a str,
    results: &'a [FieldResult],
    cursor: Cell<usize>,
    policy: AmbiguousMatchPolicy,
    /// Message and extensions of each field error raised here, in raising order.
    error_extensions: RefCell<Vec<(String, JsonMap)>>,
}

impl Replay<'_> {
    fn fail(&self, message: String, extensions: JsonMap) -> FieldError {
        self.error_extensions
            .borrow_mut()
            .push((message.clone(), extensions));
        FieldError { message }
    }
}

impl ObjectValue for Replay<'_> {
    fn type_name(&self) -> &str {
        self.root_type
    }

    fn resolve_field<'a>(
        &'a self,
        info: &'a ResolveInfo<'a>,
    ) -> Result<ResolvedValue<'a>, FieldError> {
        if info.field_name().starts_with("__") {
            return Ok(ResolvedValue::leaf(JsonValue::Null));
        }
        let index = self.cursor.get();
        self.cursor.set(index + 1);
        let Some(result) = self.results.get(index) else {
            return Err(FieldError {
                message: format!("no result recorded for field '{}'", info.field_name()),
            });
        };
        match result {
            FieldResult::Output(FieldOutput::Single(found)) => match found {
                SingularMatch::NotFound => Ok(ResolvedValue::leaf(JsonValue::Null)),
                SingularMatch::One(record) => Ok(record_value(record, info)),
                SingularMatch::Many(records) => match self.policy {
                    AmbiguousMatchPolicy::First => {
                        tracing::warn!(
                            field = info.field_name(),
                            matches = records.len(),
                            "ambiguous match resolved to the first record"
                        );
                        Ok(records
                            .first()
                            .map_or(ResolvedValue::leaf(JsonValue::Null), |record| {
                                record_value(record, info)
                            }))
                    }
                    AmbiguousMatchPolicy::Error => {
                        let mut extensions = JsonMap::new();
                        extensions.insert("code", JsonValue::String(AMBIGUOUS_MATCH.into()));
                        extensions.insert("matches", JsonValue::Number(records.len().into()));
                        Err(self.fail(
                            format!(
                                "'{}' expects at most one record but {} matched",
                                info.field_name(),
                                records.len()
                            ),
                            extensions,
                        ))
                    }
                },
            },
            FieldResult::Output(FieldOutput::List(records)) => Ok(ResolvedValue::List(Box::new(
                records
                    .iter()
                    .map(move |record| Ok::<_, FieldError>(record_value(record, info))),
            ))),
            FieldResult::Output(FieldOutput::Created(record)) => Ok(record_value(record, info)),
            FieldResult::Failed(error) => Err(self.fail(error.to_string(), error.extensions())),
            FieldResult::Unbound(field_name) => Err(FieldError {
                message: format!("no resolver bound to field '{field_name}'"),
            }),
        }
    }
}

/// A stored record; nested selections read its embedded values, never the store.
struct RecordValue<'a> {
    type_name: &'a str,
    record: &'a Record,
}

fn record_value<'a>(record: &'a Record, info: &'a ResolveInfo<'a>) -> ResolvedValue<'a> {
    ResolvedValue::object(RecordValue {
        type_name: info.field_definition().ty.inner_named_type(),
        record,
    })
}

impl ObjectValue for RecordValue<'_> {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn resolve_field<'a>(
        &'a self,
        info: &'a ResolveInfo<'a>,
    ) -> Result<ResolvedValue<'a>, FieldError> {
        match self.record.get(info.field_name()) {
            Some(value) => Ok(resolve_value(value, info)),
            None => Ok(ResolvedValue::leaf(JsonValue::Null)),
        }
    }
}

fn resolve_value<'a>(value: &'a JsonValue, info: &'a ResolveInfo<'a>) -> ResolvedValue<'a> {
    match value {
        JsonValue::Object(record) => record_value(record, info),
        JsonValue::Array(values) => ResolvedValue::List(Box::new(
            values
                .iter()
                .map(move |value| Ok::<_, FieldError>(resolve_value(value, info))),
        )),
        json => ResolvedValue::leaf(json.clone()),
    }
}

/// The executor reports field errors without extensions, and may prefix their message: add back
/// the codes of root field errors raised during replay.
fn attach_extensions(errors: &mut [GraphQLError], mut raised: Vec<(String, JsonMap)>) {
    for error in errors.iter_mut().filter(|error| error.path.len() == 1) {
        if let Some(position) = raised
            .iter()
            .position(|(message, _)| error.message.ends_with(message.as_str()))
        {
            let (_, extensions) = raised.remove(position);
            for (key, value) in extensions {
                error.extensions.insert(key, value);
            }
        }
    }
}
