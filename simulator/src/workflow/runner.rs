use crate::workflow::config::{RosterSource, SessionConfig};
use anyhow::{bail, Context};
use rollcore::capture::{BatchPipeline, TickReport};
use rollcore::roster::{sheet_export_url, Grid, Roster};
use rollcore::telemetry::log::LogManager;
use rollcore::{AttendanceReport, Matcher, PresenceTracker};
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared session state behind the CLI and the HTTP bridge.
pub struct Runner {
    config: SessionConfig,
    pipeline: BatchPipeline,
    last_tick: RwLock<Option<TickReport>>,
    logger: LogManager,
}

impl Runner {
    pub fn new(config: SessionConfig) -> anyhow::Result<Self> {
        let matcher = Matcher::new(config.matcher.clone()).context("building matcher")?;
        let pipeline = BatchPipeline::new(
            Arc::new(matcher),
            Arc::new(PresenceTracker::new()),
            config.capture.filter.clone(),
        )
        .context("building batch filter")?;

        Ok(Self {
            config,
            pipeline,
            last_tick: RwLock::new(None),
            logger: LogManager::new("rollsim"),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn matcher(&self) -> &Arc<Matcher> {
        self.pipeline.matcher()
    }

    pub fn tracker(&self) -> &Arc<PresenceTracker> {
        self.pipeline.tracker()
    }

    pub fn pipeline(&self) -> &BatchPipeline {
        &self.pipeline
    }

    /// Loads the configured roster, returning the number of entries parsed.
    pub async fn load_roster(&self) -> anyhow::Result<usize> {
        self.load_roster_from(&self.config.roster).await
    }

    /// A failed load leaves the session with no roster.
    pub async fn load_roster_from(&self, source: &RosterSource) -> anyhow::Result<usize> {
        let loaded = match self.read_roster(source).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => return Ok(0),
            Err(err) => {
                self.matcher().replace_roster(Roster::new());
                self.logger.warn(&format!("roster load failed: {:#}", err));
                return Err(err);
            }
        };

        self.logger.record(&format!("roster ready with {} entries", loaded));
        Ok(loaded)
    }

    async fn read_roster(&self, source: &RosterSource) -> anyhow::Result<Option<usize>> {
        if let Some(url) = &source.sheet_url {
            let grid = fetch_sheet(url).await?;
            return Ok(Some(self.matcher().load_table(&grid)));
        }
        if let Some(path) = &source.csv {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading roster csv {}", path.display()))?;
            return Ok(Some(self.matcher().load_table(&Grid::from_delimited(&text, ','))));
        }
        if let Some(path) = &source.file {
            let loaded = self
                .matcher()
                .load_file(path)
                .with_context(|| format!("loading roster {}", path.display()))?;
            return Ok(Some(loaded));
        }
        Ok(None)
    }

    /// Applies one raw batch and remembers it as the latest tick.
    pub fn ingest<I, S>(&self, raw: I) -> TickReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let report = self.pipeline.apply(raw);
        self.observe(&report);
        report
    }

    /// Records a tick produced elsewhere, e.g. by a running capture session.
    ///
    /// With a continuous report configured, the report file is rewritten
    /// whenever someone joins or leaves.
    pub fn observe(&self, report: &TickReport) {
        *self
            .last_tick
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(report.clone());

        if report.delta.is_empty() {
            return;
        }
        if let Some(path) = &self.config.continuous_report {
            if let Err(err) = self.save_report(path) {
                self.logger.warn(&format!("continuous save failed: {:#}", err));
            }
        }
    }

    pub fn last_tick(&self) -> Option<TickReport> {
        self.last_tick
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Feeds prepared batches through the pipeline in order.
    pub fn replay<S: AsRef<str>>(&self, batches: &[Vec<S>]) -> Vec<TickReport> {
        batches.iter().map(|batch| self.ingest(batch)).collect()
    }

    pub fn report(&self) -> AttendanceReport {
        AttendanceReport::build(self.matcher(), &self.tracker().get_snapshot())
    }

    /// Writes the current report; JSON when the path ends in `.json`, text otherwise.
    pub fn save_report(&self, path: &Path) -> anyhow::Result<()> {
        let report = self.report();
        let contents = if path.extension().is_some_and(|ext| ext == "json") {
            report.to_json()?
        } else {
            report.render_text()
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents).with_context(|| format!("writing report {}", path.display()))
    }

    /// Clears presence and match results; the roster stays loaded.
    pub fn reset(&self) {
        self.tracker().reset();
        self.matcher().reset_results();
        *self
            .last_tick
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.logger.record("session reset");
    }
}

/// Downloads a shared spreadsheet as CSV and parses it into a grid.
pub async fn fetch_sheet(url: &str) -> anyhow::Result<Grid> {
    let export = sheet_export_url(url);
    let body = reqwest::get(&export)
        .await
        .with_context(|| format!("requesting {}", export))?
        .error_for_status()
        .with_context(|| format!("fetching {}", export))?
        .text()
        .await
        .context("reading sheet body")?;

    if body.trim_start().starts_with('<') {
        bail!("sheet at {} is not publicly readable as CSV", url);
    }
    Ok(Grid::from_delimited(&body, ','))
}
