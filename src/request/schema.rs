use anyhow::{anyhow, Context};
use jsonschema::{ErrorIterator, JSONSchema};
use log::info;
use serde_json::Value;

/// included run request schema
static RUN_REQUEST_SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/run_request.json"));

/// Compiled JSON schema that checks the shape of a run request before it's deserialised
pub struct RequestSchema {
    compiled: JSONSchema,
}

impl RequestSchema {
    pub fn load() -> anyhow::Result<RequestSchema> {
        info!("Compiling run request schema");
        let schema: Value = serde_json::from_str(RUN_REQUEST_SCHEMA).context("Embedded schema is valid JSON")?;
        let compiled = JSONSchema::compile(&schema).map_err(|err| anyhow!("Can't compile run request schema: {err}"))?;
        Ok(RequestSchema { compiled })
    }

    /// Validate untyped JSON, describing every schema error instead of stopping at the first
    pub fn validate(&self, json: &Value) -> Result<(), Vec<String>> {
        self.compiled.validate(json).map_err(describe_errors)
    }
}

fn describe_errors(errors: ErrorIterator) -> Vec<String> {
    errors
        .map(|err| {
            let path = err.instance_path.to_string();
            match path.trim_start_matches('/') {
                "" => format!("request: {err}"),
                field => format!("{field}: {err}"),
            }
        })
        .collect()
}
