//! Verify URL composition and response decoding against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Query strings are compared as sorted pair lists because parameter maps do
//! not guarantee an iteration order.

use std::collections::HashMap;

use courier_core::{decode, url, Payload};

fn string_map(value: &serde_json::Value) -> HashMap<String, String> {
    serde_json::from_value(value.clone()).unwrap()
}

// ---------------------------------------------------------------------------
// Compose
// ---------------------------------------------------------------------------

#[test]
fn compose_test_vectors() {
    let raw = include_str!("../../test-vectors/compose.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let composed = url::compose(
            case["target"].as_str().unwrap(),
            &string_map(&case["path_params"]),
            &string_map(&case["query_params"]),
        );

        let (path, query) = match composed.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (composed.as_str(), None),
        };
        assert_eq!(path, case["expected_path"].as_str().unwrap(), "{name}: path");

        let mut pairs: Vec<&str> = query.map(|q| q.split('&').collect()).unwrap_or_default();
        pairs.sort();
        let expected: Vec<&str> = case["expected_query"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p.as_str().unwrap())
            .collect();
        assert_eq!(pairs, expected, "{name}: query pairs");
        assert!(!composed.ends_with('&'), "{name}: trailing ampersand");
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

#[test]
fn decode_test_vectors() {
    let raw = include_str!("../../test-vectors/decode.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let content_type = case["content_type"].as_str().unwrap();
        let body = case["body"].as_str().unwrap().as_bytes();
        let expected = &case["expected"];
        let kind = expected["kind"].as_str().unwrap();

        if case["shaped"].as_bool().unwrap() {
            let result = decode::shaped::<serde_json::Value>(content_type, body);
            match kind {
                "json" => assert_eq!(result.unwrap(), expected["value"], "{name}"),
                "error" => assert!(result.is_err(), "{name}: expected decode error"),
                other => panic!("{name}: unexpected kind {other} for shaped case"),
            }
        } else {
            let payload = decode::payload(content_type, body);
            match kind {
                "json" => assert_eq!(payload, Payload::Json(expected["value"].clone()), "{name}"),
                "text" => assert_eq!(
                    payload,
                    Payload::Text(expected["value"].as_str().unwrap().to_string()),
                    "{name}"
                ),
                other => panic!("{name}: unexpected kind {other} for unshaped case"),
            }
        }
    }
}
