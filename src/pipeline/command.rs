use std::path::{Path, PathBuf};

use crate::request::contract::ParameterContract;

/// How to start the pipeline: the program, the arguments before the run flags, and where
/// to start it from
#[derive(Debug, Clone)]
pub struct PipelineCommand {
    pub program: PathBuf,
    pub leading_args: Vec<String>,
    pub current_dir: PathBuf,
}

impl PipelineCommand {
    /// `<bin> run <script> -profile <profile>`, started from the pipeline installation directory
    pub fn nextflow(bin: &Path, script: &str, profile: &str, pipeline_dir: &Path) -> PipelineCommand {
        PipelineCommand {
            program: bin.to_path_buf(),
            leading_args: vec!["run".to_string(), script.to_string(), "-profile".to_string(), profile.to_string()],
            current_dir: pipeline_dir.to_path_buf(),
        }
    }

    pub fn arguments(&self, params: &ParameterContract, work_dir: &Path) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend(pipeline_flags(params, work_dir));
        args
    }
}

/// Run flags in a fixed order, MitoEdit flags last and only for a complete group
pub fn pipeline_flags(params: &ParameterContract, work_dir: &Path) -> Vec<String> {
    let mut flags: Vec<String> = Vec::new();
    let mut flag = |name: &str, value: String| {
        flags.push(format!("--{name}"));
        flags.push(value);
    };

    flag("tumor_bam", params.tumor_bam().to_string());
    flag("normal_bam", params.normal_bam().to_string());
    flag("reference_genome", params.reference_genome().to_string());
    flag("project_name", params.project_name().to_string());
    flag("output_dir", work_dir.display().to_string());
    flag("min_coverage", params.min_coverage().to_string());
    flag("vaf_threshold", params.vaf_threshold().to_string());
    flag("max_vaf", params.max_vaf().to_string());

    if let Some(mito) = params.mito() {
        flag("mito_position", mito.position.to_string());
        flag("mito_mutant_base", mito.mutant_base.to_string());
        flag("mito_min_spacer", mito.min_spacer.to_string());
        flag("mito_max_spacer", mito.max_spacer.to_string());
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mito_request, scenario_request};

    #[test]
    fn builds_fixed_flags() {
        let params = ParameterContract::validate(scenario_request()).unwrap();
        let command = PipelineCommand::nextflow(
            Path::new("nextflow"),
            "main.nf",
            "docker",
            Path::new("/data/pipeline"),
        );
        let args = command.arguments(&params, Path::new("/data/pipeline/runs/job-1"));
        assert_eq!(
            args,
            vec![
                "run", "main.nf", "-profile", "docker",
                "--tumor_bam", "A",
                "--normal_bam", "B",
                "--reference_genome", "hg38",
                "--project_name", "P1",
                "--output_dir", "/data/pipeline/runs/job-1",
                "--min_coverage", "100",
                "--vaf_threshold", "0.03",
                "--max_vaf", "0.99",
            ]
        );
    }

    #[test]
    fn appends_mito_flags_when_group_present() {
        let params = ParameterContract::validate(mito_request()).unwrap();
        let flags = pipeline_flags(&params, Path::new("/runs/x"));
        assert_eq!(
            &flags[flags.len() - 8..],
            &[
                "--mito_position", "3243",
                "--mito_mutant_base", "G",
                "--mito_min_spacer", "14",
                "--mito_max_spacer", "18",
            ]
        );
    }

    #[test]
    fn omits_mito_flags_when_group_absent() {
        let params = ParameterContract::validate(scenario_request()).unwrap();
        let flags = pipeline_flags(&params, Path::new("/runs/x"));
        assert_eq!(flags.len(), 16);
        assert!(!flags.iter().any(|f| f.starts_with("--mito")));
    }
}
