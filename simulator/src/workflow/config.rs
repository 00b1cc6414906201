use anyhow::Context;
use rollcore::capture::CaptureConfig;
use rollcore::MatcherConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the class roster comes from. The first configured source wins, in
/// the order sheet, csv, file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterSource {
    /// Line-oriented roster text file.
    pub file: Option<PathBuf>,
    /// Local CSV export of the roster spreadsheet.
    pub csv: Option<PathBuf>,
    /// Shared spreadsheet link, fetched as CSV.
    pub sheet_url: Option<String>,
}

impl RosterSource {
    pub fn is_configured(&self) -> bool {
        self.file.is_some() || self.csv.is_some() || self.sheet_url.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub course_code: Option<String>,
    /// Report file rewritten after every join or leave.
    pub continuous_report: Option<PathBuf>,
    pub roster: RosterSource,
    pub matcher: MatcherConfig,
    pub capture: CaptureConfig,
}

impl SessionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading session config {}", path_ref.display()))?;
        let config: SessionConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing session config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating session config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.matcher.validate()?;
        self.capture.validate()?;
        Ok(())
    }
}
