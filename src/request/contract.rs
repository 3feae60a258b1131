use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;
use thiserror::Error;
use url::Url;

use crate::request::reference::ReferenceGenome;

pub const DEFAULT_MIN_COVERAGE: i64 = 100;
pub const DEFAULT_VAF_THRESHOLD: f64 = 0.03;
pub const DEFAULT_MAX_VAF: f64 = 0.99;
pub const DEFAULT_MIN_SPACER: u8 = 14;
pub const DEFAULT_MAX_SPACER: u8 = 18;
pub const SPACER_BOUNDS: (u8, u8) = (12, 20);

/// URL schemes accepted for remote sample references
const SAMPLE_URL_SCHEMES: [&str; 4] = ["file", "http", "https", "s3"];

/// A submission rejected before any job exists, listing every violated rule
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid run request: {}", .violations.join("; "))]
pub struct ValidationError {
    pub violations: Vec<String>,
}

impl ValidationError {
    pub fn new(violations: Vec<String>) -> ValidationError {
        ValidationError { violations }
    }
}

/// A run request as the client sent it, after JSON schema validation
///
/// Integer fields stay JSON numbers: the schema accepts `100.0` as an integer, and
/// deserialising must not reject a value that contract validation would explain better.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunRequest {
    pub tumor_bam: String,
    pub normal_bam: String,
    #[serde(default = "default_reference_genome")]
    pub reference_genome: String,
    pub project_name: String,
    #[serde(default = "default_min_coverage")]
    pub min_coverage: Number,
    #[serde(default = "default_vaf_threshold")]
    pub vaf_threshold: f64,
    #[serde(default = "default_max_vaf")]
    pub max_vaf: f64,
    #[serde(default)]
    pub mito_position: Option<Number>,
    #[serde(default)]
    pub mito_mutant_base: Option<String>,
    #[serde(default)]
    pub mito_min_spacer: Option<Number>,
    #[serde(default)]
    pub mito_max_spacer: Option<Number>,
}

fn default_reference_genome() -> String {
    ReferenceGenome::Hg38.to_string()
}

fn default_min_coverage() -> Number {
    Number::from(DEFAULT_MIN_COVERAGE)
}

fn default_vaf_threshold() -> f64 {
    DEFAULT_VAF_THRESHOLD
}

fn default_max_vaf() -> f64 {
    DEFAULT_MAX_VAF
}

/// Target base for MitoEdit
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Base {
    A,
    T,
    C,
    G,
}

impl Base {
    fn parse(symbol: &str) -> Option<Base> {
        match symbol {
            "A" => Some(Base::A),
            "T" => Some(Base::T),
            "C" => Some(Base::C),
            "G" => Some(Base::G),
            _ => None,
        }
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            Base::A => "A",
            Base::T => "T",
            Base::C => "C",
            Base::G => "G",
        };
        f.write_str(symbol)
    }
}

/// Optional MitoEdit parameters, forwarded to the pipeline only as a complete group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MitoEditParams {
    pub position: u32,
    pub mutant_base: Base,
    pub min_spacer: u8,
    pub max_spacer: u8,
}

/// A validated, immutable description of one pipeline run
///
/// The only way to build one is [`ParameterContract::validate`], so holding a contract means
/// every rule below has been checked:
/// - sample references and project name are non-empty after trimming
/// - the reference genome is a supported build
/// - `min_coverage >= 1`
/// - `0 < vaf_threshold < max_vaf <= 1`
/// - the MitoEdit group is complete or absent, with a base in {A,T,C,G} and
///   `12 <= min_spacer <= max_spacer <= 20`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterContract {
    tumor_bam: String,
    normal_bam: String,
    reference_genome: ReferenceGenome,
    project_name: String,
    min_coverage: u32,
    vaf_threshold: f64,
    max_vaf: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    mito: Option<MitoEditParams>,
}

impl ParameterContract {
    pub fn validate(request: RunRequest) -> Result<ParameterContract, ValidationError> {
        let mut violations: Vec<String> = Vec::new();

        let tumor_bam = sample_reference("tumor_bam", &request.tumor_bam, &mut violations);
        let normal_bam = sample_reference("normal_bam", &request.normal_bam, &mut violations);
        let reference_genome = request
            .reference_genome
            .parse::<ReferenceGenome>()
            .map_err(|err| violations.push(err))
            .ok();
        let project_name = required("project_name", &request.project_name, &mut violations);
        let min_coverage = integer("min_coverage", &request.min_coverage, &mut violations)
            .and_then(|value| min_coverage(value, &mut violations));
        check_vaf(request.vaf_threshold, request.max_vaf, &mut violations);
        let mito = mito_group(&request, &mut violations);

        match (tumor_bam, normal_bam, reference_genome, project_name, min_coverage, mito) {
            (
                Some(tumor_bam),
                Some(normal_bam),
                Some(reference_genome),
                Some(project_name),
                Some(min_coverage),
                Some(mito),
            ) if violations.is_empty() => {
                Ok(ParameterContract {
                    tumor_bam,
                    normal_bam,
                    reference_genome,
                    project_name,
                    min_coverage,
                    vaf_threshold: request.vaf_threshold,
                    max_vaf: request.max_vaf,
                    mito,
                })
            }
            _ => Err(ValidationError::new(violations)),
        }
    }

    pub fn tumor_bam(&self) -> &str {
        &self.tumor_bam
    }

    pub fn normal_bam(&self) -> &str {
        &self.normal_bam
    }

    pub fn reference_genome(&self) -> ReferenceGenome {
        self.reference_genome
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn min_coverage(&self) -> u32 {
        self.min_coverage
    }

    pub fn vaf_threshold(&self) -> f64 {
        self.vaf_threshold
    }

    pub fn max_vaf(&self) -> f64 {
        self.max_vaf
    }

    pub fn mito(&self) -> Option<&MitoEditParams> {
        self.mito.as_ref()
    }
}

fn required(field: &str, value: &str, violations: &mut Vec<String>) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        violations.push(format!("{field} is required"));
        return None;
    }
    Some(trimmed.to_string())
}

/// Sample references are local paths (usually uploads) or URLs with a known scheme
fn sample_reference(field: &str, value: &str, violations: &mut Vec<String>) -> Option<String> {
    let reference = required(field, value, violations)?;
    if !reference.contains("://") {
        return Some(reference);
    }
    match Url::parse(&reference) {
        Ok(url) if SAMPLE_URL_SCHEMES.contains(&url.scheme()) => Some(reference),
        Ok(url) => {
            violations.push(format!(
                "{field} uses unsupported URL scheme '{}' (expected one of: {})",
                url.scheme(),
                SAMPLE_URL_SCHEMES.join(", ")
            ));
            None
        }
        Err(err) => {
            violations.push(format!("{field} is not a valid URL: {err}"));
            None
        }
    }
}

/// JSON integers may arrive as whole-valued floats such as `100.0`
fn integer(field: &str, value: &Number, violations: &mut Vec<String>) -> Option<i64> {
    if let Some(int) = value.as_i64() {
        return Some(int);
    }
    match value.as_f64() {
        Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => Some(float as i64),
        _ => {
            violations.push(format!("{field} must be a whole number (got {value})"));
            None
        }
    }
}

fn min_coverage(value: i64, violations: &mut Vec<String>) -> Option<u32> {
    match u32::try_from(value) {
        Ok(coverage) if coverage >= 1 => Some(coverage),
        _ => {
            violations.push(format!("min_coverage must be a positive integer (got {value})"));
            None
        }
    }
}

fn check_vaf(threshold: f64, max: f64, violations: &mut Vec<String>) {
    let threshold_ok = threshold.is_finite() && threshold > 0.0 && threshold <= 1.0;
    let max_ok = max.is_finite() && (0.0..=1.0).contains(&max);
    if !threshold_ok {
        violations.push(format!(
            "vaf_threshold must be greater than 0 and at most 1 (got {threshold})"
        ));
    }
    if !max_ok {
        violations.push(format!("max_vaf must be between 0 and 1 (got {max})"));
    }
    if threshold_ok && max_ok && threshold >= max {
        violations.push(format!("vaf_threshold ({threshold}) must be less than max_vaf ({max})"));
    }
}

/// Validate the MitoEdit group, returning `None` when it is invalid
///
/// The group is present when both position and base are given. Spacer bounds fall back to
/// their defaults, but giving any group field without position and base is a partial group.
fn mito_group(
    request: &RunRequest,
    violations: &mut Vec<String>,
) -> Option<Option<MitoEditParams>> {
    let spacer_given = request.mito_min_spacer.is_some() || request.mito_max_spacer.is_some();
    let (position, base) = match (&request.mito_position, request.mito_mutant_base.as_deref()) {
        (None, None) if !spacer_given => return Some(None),
        (Some(position), Some(base)) => (position, base),
        _ => {
            violations.push(
                "mito parameters are incomplete: mito_position and mito_mutant_base must be \
                 given together, or no mito parameter at all"
                    .to_string(),
            );
            return None;
        }
    };

    let before = violations.len();
    let position = integer("mito_position", position, violations).and_then(|position| {
        match u32::try_from(position) {
            Ok(position) if position >= 1 => Some(position),
            _ => {
                violations.push(format!("mito_position must be a positive integer (got {position})"));
                None
            }
        }
    });
    let mutant_base = Base::parse(base.trim());
    if mutant_base.is_none() {
        violations.push(format!("mito_mutant_base must be one of A, T, C, G (got '{base}')"));
    }

    let min_spacer = spacer(
        "mito_min_spacer",
        request.mito_min_spacer.as_ref(),
        DEFAULT_MIN_SPACER,
        violations,
    );
    let max_spacer = spacer(
        "mito_max_spacer",
        request.mito_max_spacer.as_ref(),
        DEFAULT_MAX_SPACER,
        violations,
    );
    if let (Some(min_spacer), Some(max_spacer)) = (min_spacer, max_spacer) {
        if min_spacer > max_spacer {
            violations.push(format!(
                "mito_min_spacer ({min_spacer}) must not be greater than mito_max_spacer ({max_spacer})"
            ));
        }
    }

    match (position, mutant_base, min_spacer, max_spacer) {
        (Some(position), Some(mutant_base), Some(min_spacer), Some(max_spacer))
            if violations.len() == before =>
        {
            Some(Some(MitoEditParams { position, mutant_base, min_spacer, max_spacer }))
        }
        _ => None,
    }
}

fn spacer(
    field: &str,
    value: Option<&Number>,
    default: u8,
    violations: &mut Vec<String>,
) -> Option<u8> {
    let Some(value) = value else {
        return Some(default);
    };
    let value = integer(field, value, violations)?;
    let (lower, upper) = SPACER_BOUNDS;
    match u8::try_from(value) {
        Ok(spacer) if (lower..=upper).contains(&spacer) => Some(spacer),
        _ => {
            violations.push(format!("{field} must be between {lower} and {upper} (got {value})"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::scenario_request;

    fn request(overrides: serde_json::Value) -> RunRequest {
        let mut base = serde_json::to_value(scenario_request()).unwrap();
        let fields = base.as_object_mut().unwrap();
        for (key, value) in overrides.as_object().unwrap() {
            fields.insert(key.clone(), value.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn scenario_request_is_valid() {
        let contract = ParameterContract::validate(scenario_request()).unwrap();
        assert_eq!(contract.tumor_bam(), "A");
        assert_eq!(contract.normal_bam(), "B");
        assert_eq!(contract.reference_genome(), ReferenceGenome::Hg38);
        assert_eq!(contract.project_name(), "P1");
        assert_eq!(contract.min_coverage(), 100);
        assert_eq!(contract.vaf_threshold(), 0.03);
        assert_eq!(contract.max_vaf(), 0.99);
        assert!(contract.mito().is_none());
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let request: RunRequest = serde_json::from_value(json!({
            "tumor_bam": "t.bam", "normal_bam": "n.bam", "project_name": "P"
        }))
        .unwrap();
        let contract = ParameterContract::validate(request).unwrap();
        assert_eq!(contract.reference_genome(), ReferenceGenome::Hg38);
        assert_eq!(contract.min_coverage(), 100);
        assert_eq!(contract.vaf_threshold(), DEFAULT_VAF_THRESHOLD);
        assert_eq!(contract.max_vaf(), DEFAULT_MAX_VAF);
    }

    #[test]
    fn threshold_above_max_is_rejected() {
        let err = ParameterContract::validate(request(json!({"vaf_threshold": 0.5, "max_vaf": 0.3})))
            .unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(err.violations[0].contains("must be less than max_vaf"));
    }

    #[test]
    fn threshold_equal_to_max_is_rejected() {
        let err = ParameterContract::validate(request(json!({"vaf_threshold": 0.4, "max_vaf": 0.4})))
            .unwrap_err();
        assert!(err.violations[0].contains("must be less than max_vaf"));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let err = ParameterContract::validate(request(json!({"vaf_threshold": 0.0}))).unwrap_err();
        assert!(err.violations[0].starts_with("vaf_threshold must be greater than 0"));
    }

    #[test]
    fn every_violation_is_reported() {
        let err = ParameterContract::validate(request(json!({
            "tumor_bam": "  ",
            "normal_bam": "",
            "reference_genome": "hg19",
            "project_name": "",
            "min_coverage": 0,
            "max_vaf": 1.5
        })))
        .unwrap_err();
        assert_eq!(err.violations.len(), 6, "{:?}", err.violations);
        assert!(err.violations.iter().any(|v| v == "tumor_bam is required"));
        assert!(err.violations.iter().any(|v| v == "normal_bam is required"));
        assert!(err.violations.iter().any(|v| v.contains("hg19")));
        assert!(err.violations.iter().any(|v| v == "project_name is required"));
        assert!(err.violations.iter().any(|v| v.starts_with("min_coverage")));
        assert!(err.violations.iter().any(|v| v.starts_with("max_vaf")));
    }

    #[test]
    fn whole_valued_floats_are_integers() {
        let contract = ParameterContract::validate(request(json!({
            "min_coverage": 250.0,
            "mito_position": 3243.0,
            "mito_mutant_base": "C",
            "mito_min_spacer": 13.0
        })))
        .unwrap();
        assert_eq!(contract.min_coverage(), 250);
        assert_eq!(
            contract.mito(),
            Some(&MitoEditParams { position: 3243, mutant_base: Base::C, min_spacer: 13, max_spacer: 18 })
        );
    }

    #[test]
    fn fractional_integer_fields_are_violations_alongside_the_rest() {
        let err = ParameterContract::validate(request(json!({
            "project_name": "",
            "min_coverage": 2.5,
            "max_vaf": 7
        })))
        .unwrap_err();
        assert_eq!(err.violations.len(), 3, "{:?}", err.violations);
        assert!(err.violations.iter().any(|v| v == "min_coverage must be a whole number (got 2.5)"));
        assert!(err.violations.iter().any(|v| v == "project_name is required"));
        assert!(err.violations.iter().any(|v| v.starts_with("max_vaf")));
    }

    #[test]
    fn sample_urls_must_use_known_scheme() {
        let ok = ParameterContract::validate(request(json!({"tumor_bam": "s3://bucket/tumor.bam"})));
        assert!(ok.is_ok());

        let err = ParameterContract::validate(request(json!({"tumor_bam": "ftp://host/tumor.bam"})))
            .unwrap_err();
        assert!(err.violations[0].contains("unsupported URL scheme 'ftp'"));
    }

    #[test]
    fn complete_mito_group_uses_spacer_defaults() {
        let contract = ParameterContract::validate(request(json!({
            "mito_position": 3243,
            "mito_mutant_base": "G"
        })))
        .unwrap();
        assert_eq!(
            contract.mito(),
            Some(&MitoEditParams { position: 3243, mutant_base: Base::G, min_spacer: 14, max_spacer: 18 })
        );
    }

    #[test]
    fn partial_mito_group_is_rejected() {
        for partial in [
            json!({"mito_position": 3243}),
            json!({"mito_mutant_base": "A"}),
            json!({"mito_min_spacer": 13}),
        ] {
            let err = ParameterContract::validate(request(partial.clone())).unwrap_err();
            assert_eq!(err.violations.len(), 1, "{partial}");
            assert!(err.violations[0].starts_with("mito parameters are incomplete"), "{partial}");
        }
    }

    #[test]
    fn mito_group_values_are_checked() {
        let err = ParameterContract::validate(request(json!({
            "mito_position": 0,
            "mito_mutant_base": "N",
            "mito_min_spacer": 19,
            "mito_max_spacer": 21
        })))
        .unwrap_err();
        assert!(err.violations.iter().any(|v| v.starts_with("mito_position")));
        assert!(err.violations.iter().any(|v| v.starts_with("mito_mutant_base")));
        assert!(err
            .violations
            .iter()
            .any(|v| v.starts_with("mito_max_spacer must be between 12 and 20")));
        assert!(!err.violations.iter().any(|v| v.starts_with("mito_min_spacer must be between")));
    }

    #[test]
    fn inverted_spacer_bounds_are_rejected() {
        let err = ParameterContract::validate(request(json!({
            "mito_position": 100,
            "mito_mutant_base": "T",
            "mito_min_spacer": 18,
            "mito_max_spacer": 14
        })))
        .unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(err.violations[0].contains("must not be greater than mito_max_spacer"));
    }
}
