use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Reference genome builds the pipeline can align against
///
/// Only hg38 is installed today. New builds are added as variants, never accepted as free text.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceGenome {
    Hg38,
}

impl ReferenceGenome {
    pub const ALL: [ReferenceGenome; 1] = [ReferenceGenome::Hg38];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceGenome::Hg38 => "hg38",
        }
    }
}

impl fmt::Display for ReferenceGenome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceGenome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        ReferenceGenome::ALL
            .into_iter()
            .find(|genome| genome.as_str() == tag)
            .ok_or_else(|| {
                let supported: Vec<&str> = ReferenceGenome::ALL.iter().map(|g| g.as_str()).collect();
                format!("reference_genome '{tag}' is not supported (expected one of: {})", supported.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_build() {
        assert_eq!("hg38".parse::<ReferenceGenome>(), Ok(ReferenceGenome::Hg38));
        assert_eq!(" hg38 ".parse::<ReferenceGenome>(), Ok(ReferenceGenome::Hg38));
    }

    #[test]
    fn rejects_unknown_build() {
        let err = "hg19".parse::<ReferenceGenome>().unwrap_err();
        assert!(err.contains("hg19"));
        assert!(err.contains("hg38"));
    }
}
