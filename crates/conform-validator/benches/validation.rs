//! Validation benchmarks for the message validator.
//!
//! Run with: cargo bench -p conform-validator

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use conform_schema::{
    Location, Parameter, ParameterSet, RequestDefinition, ResponseDefinition, StatusCode,
};
use conform_validator::{DefaultDecoder, MessageValidator};

fn create_definition() -> RequestDefinition {
    let parameters = ParameterSet::new(vec![
        Parameter::new(
            Location::Path,
            "id",
            true,
            Some(json!({"type": "string", "pattern": "^[1-9][0-9]*$"})),
        ),
        Parameter::new(
            Location::Query,
            "tags",
            false,
            Some(json!({"type": "array", "collectionFormat": "csv", "items": {"type": "string"}})),
        ),
        Parameter::new(
            Location::Query,
            "limit",
            false,
            Some(json!({"type": "integer", "minimum": 1, "maximum": 100})),
        ),
        Parameter::new(
            Location::Header,
            "X-Request-Id",
            true,
            Some(json!({"type": "string", "minLength": 8})),
        ),
        Parameter::new(
            Location::Body,
            "pet",
            true,
            Some(json!({
                "type": "object",
                "required": ["id", "name"],
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string", "minLength": 1},
                    "email": {"type": "string", "format": "email"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                }
            })),
        ),
    ])
    .expect("valid parameters");

    RequestDefinition::new(
        "PUT",
        "updatePet",
        "/api/pets/{id}",
        parameters,
        vec!["application/json".to_string()],
        vec![ResponseDefinition::new(
            StatusCode::Default,
            vec![],
            ParameterSet::default(),
        )],
    )
    .expect("valid definition")
}

fn request(body: &'static str) -> http::Request<Bytes> {
    http::Request::put("/api/pets/42?tags=a,b,c&limit=10")
        .header("Content-Type", "application/json")
        .header("X-Request-Id", "req-00000001")
        .body(Bytes::from_static(body.as_bytes()))
        .expect("valid request")
}

fn bench_validate_request(c: &mut Criterion) {
    let definition = create_definition();
    let validator = MessageValidator::new(DefaultDecoder);

    let cases = [
        (
            "valid",
            request(r#"{"id":42,"name":"Rex","email":"rex@example.com","tags":["good"]}"#),
        ),
        ("missing_fields", request("{}")),
        ("malformed_body", request("{ nope")),
    ];

    let mut group = c.benchmark_group("validate_request");
    for (name, req) in &cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), req, |b, req| {
            b.iter(|| {
                black_box(
                    validator
                        .validate_request(req, &definition)
                        .expect("validation runs"),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_validate_request);
criterion_main!(benches);
