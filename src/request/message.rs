use log::{info, warn};
use serde_json::Value;

use crate::request::contract::{RunRequest, ValidationError};
use crate::request::schema::RequestSchema;

/// Read a raw request body into a typed RunRequest
///
/// Stages run in order and each one reports all the problems it finds:
/// 1. parse untyped JSON
/// 2. validate against the run request schema
/// 3. deserialise into [`RunRequest`]
pub fn read_run_request(
    schema: &RequestSchema,
    body: &[u8],
) -> Result<RunRequest, ValidationError> {
    let json = parse_untyped_json(body)?;
    validate(schema, &json)?;
    parse_json(json)
}

fn parse_untyped_json(body: &[u8]) -> Result<Value, ValidationError> {
    info!("Parsing run request into untyped structure");
    serde_json::from_slice::<Value>(body).map_err(|err| {
        warn!("Run request is not valid JSON: {err}");
        ValidationError::new(vec![format!("request body is not valid JSON: {err}")])
    })
}

fn validate(schema: &RequestSchema, json: &Value) -> Result<(), ValidationError> {
    info!("Validating raw run request against JSON schema");
    schema.validate(json).map_err(|violations| {
        warn!("Run request fails schema validation ({} errors)", violations.len());
        ValidationError::new(violations)
    })
}

fn parse_json(json: Value) -> Result<RunRequest, ValidationError> {
    info!("Deserialising valid JSON into typed run request");
    serde_json::from_value::<RunRequest>(json).map_err(|err| {
        warn!("Run request passed schema validation but can't be deserialised: {err}");
        ValidationError::new(vec![format!("request can't be read: {err}")])
    })
}
