//! Backing stores other than the in-memory one.

use std::sync::Arc;
use std::time::Duration;

use apollo_synthesis::Configuration;
use apollo_synthesis::DataAccess;
use apollo_synthesis::Lookup;
use apollo_synthesis::Predicate;
use apollo_synthesis::Record;
use apollo_synthesis::Request;
use apollo_synthesis::StoreError;
use apollo_synthesis::SynthesizedSchema;
use pretty_assertions::assert_eq;
use serde_json::json;

const SDL: &str = "type Album { id: ID! name: String releaseDate: String artist: String }";

fn albums() -> Vec<Record> {
    let albums = super::load_json(
        r#"[
            { "id": 1, "name": "Dark Side Of The Moon", "releaseDate": "March 1, 1973", "artist": "Pink Floyd" },
            { "id": 2, "name": "The Beatles", "releaseDate": "November 22, 1968", "artist": "Beatles" }
        ]"#,
    );
    albums
        .as_array()
        .unwrap()
        .iter()
        .map(|album| album.as_object().unwrap().clone())
        .collect()
}

/// Works on the canonical string only, returning a bare record for a single match.
struct StringStore {
    albums: Vec<Record>,
}

#[async_trait::async_trait]
impl DataAccess for StringStore {
    async fn lookup(&self, type_name: &str, predicate: &Predicate) -> Result<Lookup, StoreError> {
        assert_eq!(type_name, "Album");
        let decompiled: Predicate = predicate.to_string().parse().map_err(StoreError::new)?;
        let mut matching = self
            .albums
            .iter()
            .filter(|album| decompiled.matches(album))
            .cloned()
            .collect::<Vec<_>>();
        if matching.len() == 1 {
            return Ok(Lookup::One(matching.remove(0)));
        }
        Ok(matching.into())
    }

    async fn create(&self, _type_name: &str, _input: Record) -> Result<Record, StoreError> {
        Err(StoreError::msg("read only"))
    }
}

#[tokio::test]
async fn string_predicates_round_trip() {
    let store = StringStore { albums: albums() };
    let schema = SynthesizedSchema::new(SDL, Arc::new(store), Configuration::default()).unwrap();
    let response = schema
        .execute(&Request::new(
            "{ Album(id: 2) { name artist releaseDate } Albums(id: 1) { name } }",
        ))
        .await;
    assert_eq!(
        serde_json::to_value(response).unwrap(),
        json!({ "data": {
            "Album": { "name": "The Beatles", "artist": "Beatles", "releaseDate": "November 22, 1968" },
            "Albums": [{ "name": "Dark Side Of The Moon" }],
        } })
    );
}

#[tokio::test]
async fn store_errors_keep_their_message() {
    let store = StringStore { albums: albums() };
    let schema = SynthesizedSchema::new(SDL, Arc::new(store), Configuration::default()).unwrap();
    let response = schema
        .execute(&Request::new(r#"mutation { createAlbum(name: "Animals") { id } }"#))
        .await;
    let response = serde_json::to_value(response).unwrap();
    assert_eq!(response["data"], json!({ "createAlbum": null }));
    assert!(
        response["errors"][0]["message"]
            .as_str()
            .unwrap()
            .ends_with("read only")
    );
    assert_eq!(response["errors"][0]["extensions"]["code"], "STORE_ERROR");
}

/// Answers lookups after a delay that shrinks with the album id, so later fields finish first.
struct SlowStore {
    albums: Vec<Record>,
}

#[async_trait::async_trait]
impl DataAccess for SlowStore {
    async fn lookup(&self, _type_name: &str, predicate: &Predicate) -> Result<Lookup, StoreError> {
        let matching = self
            .albums
            .iter()
            .filter(|album| predicate.matches(album))
            .cloned()
            .collect::<Vec<_>>();
        let delay = if predicate.to_string() == "id=1" { 50 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(matching.into())
    }

    async fn create(&self, _type_name: &str, _input: Record) -> Result<Record, StoreError> {
        Err(StoreError::msg("read only"))
    }
}

#[tokio::test]
async fn response_order_follows_selection_order() {
    let store = SlowStore { albums: albums() };
    let schema = SynthesizedSchema::new(SDL, Arc::new(store), Configuration::default()).unwrap();
    let response = schema
        .execute(&Request::new(
            "{ slow: Album(id: 1) { name } fast: Album(id: 2) { name } }",
        ))
        .await;
    let response = serde_json::to_value(response).unwrap();
    let data = response["data"].as_object().unwrap();
    assert_eq!(data.keys().collect::<Vec<_>>(), ["slow", "fast"]);
    assert_eq!(data["slow"], json!({ "name": "Dark Side Of The Moon" }));
    assert_eq!(data["fast"], json!({ "name": "The Beatles" }));
}
