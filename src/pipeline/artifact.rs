use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    /// HTML reports, served rendered
    Report,
    /// Data tables, served as downloads
    Data,
}

/// Output files the pipeline promises to write under a job's working directory
///
/// | key               | path                            |
/// | ----------------- | ------------------------------- |
/// | `wgs_report`      | `reports/wgs_igv_report.html`   |
/// | `mito_report`     | `reports/mito_igv_report.html`  |
/// | `variant_summary` | `wgs/variant_summary.csv`       |
/// | `mito_windows`    | `mito/all_windows.csv`          |
/// | `mito_bystanders` | `mito/all_bystanders.csv`       |
///
/// Nothing checks these exist when a run completes, only when they're fetched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Artifact {
    WgsReport,
    MitoReport,
    VariantSummary,
    MitoWindows,
    MitoBystanders,
}

impl Artifact {
    pub const ALL: [Artifact; 5] = [
        Artifact::WgsReport,
        Artifact::MitoReport,
        Artifact::VariantSummary,
        Artifact::MitoWindows,
        Artifact::MitoBystanders,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Artifact::WgsReport => "wgs_report",
            Artifact::MitoReport => "mito_report",
            Artifact::VariantSummary => "variant_summary",
            Artifact::MitoWindows => "mito_windows",
            Artifact::MitoBystanders => "mito_bystanders",
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::WgsReport | Artifact::MitoReport => ArtifactKind::Report,
            _ => ArtifactKind::Data,
        }
    }

    fn relative_path(&self) -> &'static str {
        match self {
            Artifact::WgsReport => "reports/wgs_igv_report.html",
            Artifact::MitoReport => "reports/mito_igv_report.html",
            Artifact::VariantSummary => "wgs/variant_summary.csv",
            Artifact::MitoWindows => "mito/all_windows.csv",
            Artifact::MitoBystanders => "mito/all_bystanders.csv",
        }
    }

    pub fn path_in(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(self.relative_path())
    }

    pub fn from_key(key: &str) -> Option<Artifact> {
        Artifact::ALL.into_iter().find(|artifact| artifact.key() == key)
    }

    /// Look up a report by its short type, e.g. `wgs` for `wgs_report`
    pub fn report(report_type: &str) -> Option<Artifact> {
        Artifact::from_key(&format!("{report_type}_report")).filter(|a| a.kind() == ArtifactKind::Report)
    }

    /// Look up a downloadable data table by key
    pub fn data(key: &str) -> Option<Artifact> {
        Artifact::from_key(key).filter(|a| a.kind() == ArtifactKind::Data)
    }

    /// Map every artifact key to where it should be under `work_dir`
    pub fn resolve_all(work_dir: &Path) -> BTreeMap<String, PathBuf> {
        Artifact::ALL
            .into_iter()
            .map(|artifact| (artifact.key().to_string(), artifact.path_in(work_dir)))
            .collect()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.key())
    }
}
