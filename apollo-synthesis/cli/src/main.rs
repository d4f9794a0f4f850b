use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;
use apollo_synthesis::Configuration;
use apollo_synthesis::InMemoryStore;
use apollo_synthesis::Request;
use apollo_synthesis::SynthesizedSchema;
use apollo_synthesis::TypeRegistry;
use apollo_synthesis::schema::synthesized_sdl;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// CLI arguments. See <https://docs.rs/clap/latest/clap/_derive/index.html>
#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Prints the schema synthesized from object type definitions
    Sdl {
        /// The path to the type definitions, or `-` for stdin
        schema: PathBuf,
        /// Path to a YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Executes an operation against records loaded from a JSON file
    Query {
        /// The path to the type definitions, or `-` for stdin
        schema: PathBuf,
        /// JSON file holding `{ "<Type>": [<record>, ...] }`
        #[arg(long)]
        data: PathBuf,
        /// Path to a YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
        #[arg(long)]
        operation_name: Option<String>,
        /// The GraphQL operation
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Sdl { schema, config } => print_sdl(&schema, config.as_deref()),
        Command::Query {
            schema,
            data,
            config,
            variables,
            operation_name,
            query,
        } => {
            let mut request = Request::new(query);
            if let Some(variables) = variables {
                let variables: JsonMap =
                    serde_json::from_str(&variables).context("parsing --variables")?;
                request = request.with_variables(variables);
            }
            if let Some(operation_name) = operation_name {
                request = request.with_operation_name(operation_name);
            }
            let response = execute(&schema, &data, config.as_deref(), &request).await?;
            println!("{response}");
            Ok(())
        }
    }
}

fn read_input(input_path: &Path) -> anyhow::Result<String> {
    if input_path == Path::new("-") {
        io::read_to_string(io::stdin()).context("reading stdin")
    } else {
        fs::read_to_string(input_path).with_context(|| format!("reading {}", input_path.display()))
    }
}

fn load_configuration(path: Option<&Path>) -> anyhow::Result<Configuration> {
    match path {
        Some(path) => {
            Configuration::read(path).with_context(|| format!("loading {}", path.display()))
        }
        None => Ok(Configuration::default()),
    }
}

fn print_sdl(schema_path: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let schema = SynthesizedSchema::new(
        &read_input(schema_path)?,
        Arc::new(InMemoryStore::new()),
        load_configuration(config)?,
    )?;
    print!("{}", synthesized_sdl(schema.resolvers())?);
    Ok(())
}

/// Returns the pretty-printed response.
async fn execute(
    schema_path: &Path,
    data_path: &Path,
    config: Option<&Path>,
    request: &Request,
) -> anyhow::Result<String> {
    let data: JsonValue = serde_json::from_str(&read_input(data_path)?)
        .with_context(|| format!("parsing {}", data_path.display()))?;
    let registry = TypeRegistry::parse(&read_input(schema_path)?)?;
    let store = InMemoryStore::from_json(&data)?.with_registry(&registry)?;
    let schema =
        SynthesizedSchema::from_registry(registry, Arc::new(store), load_configuration(config)?)?;
    let response = schema.execute(request).await;
    Ok(serde_json::to_string_pretty(&response)?)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_query_arguments() {
        let args = Args::try_parse_from([
            "synthesis",
            "query",
            "schema.graphql",
            "--data",
            "albums.json",
            "--variables",
            r#"{"id": 1}"#,
            "query ($id: ID) { Album(id: $id) { name } }",
        ])
        .unwrap();
        let Command::Query {
            schema,
            data,
            variables,
            config,
            ..
        } = args.command
        else {
            panic!("expected the query subcommand");
        };
        assert_eq!(schema, PathBuf::from("schema.graphql"));
        assert_eq!(data, PathBuf::from("albums.json"));
        assert_eq!(variables.as_deref(), Some(r#"{"id": 1}"#));
        assert!(config.is_none());
    }

    #[tokio::test]
    async fn executes_against_a_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("schema.graphql");
        let data = dir.path().join("albums.json");
        fs::write(&schema, "type Album { id: ID! name: String }").unwrap();
        fs::write(&data, r#"{ "Album": [{ "id": 1, "name": "Animals" }] }"#).unwrap();

        let output = execute(
            &schema,
            &data,
            None,
            &Request::new("{ Albums { id name } }"),
        )
        .await
        .unwrap();
        let output: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            output,
            serde_json::json!({ "data": { "Albums": [{ "id": 1, "name": "Animals" }] } })
        );
    }

    #[tokio::test]
    async fn creates_records_under_the_declared_identity_field() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("schema.graphql");
        let data = dir.path().join("humans.json");
        fs::write(&schema, "type Human { humanId: ID! name: String }").unwrap();
        fs::write(&data, r#"{ "Human": [{ "humanId": 1000, "name": "Luke" }] }"#).unwrap();

        let output = execute(
            &schema,
            &data,
            None,
            &Request::new(r#"mutation { createHuman(name: "Leia") { humanId name } }"#),
        )
        .await
        .unwrap();
        let output: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            output,
            serde_json::json!({ "data": { "createHuman": { "humanId": 1001, "name": "Leia" } } })
        );
    }

    #[test]
    fn missing_configuration_file_is_reported() {
        let error = load_configuration(Some(Path::new("/nonexistent/synthesis.yaml")))
            .unwrap_err();
        assert!(error.to_string().contains("synthesis.yaml"));
    }
}
