// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — owns the rewrite engine, the settings file, and the
// processing history, and runs the end-to-end flows the CLI exposes.
//
// History is best-effort. A history store that cannot be opened or written is
// logged and skipped; the document the user asked for is still produced.

use std::path::{Path, PathBuf};

use restamp_core::AppConfig;
use restamp_core::error::Result;
use restamp_core::types::OutputKind;
use restamp_document::{RewriteEngine, RewriteOutput};
use restamp_history::{NewRecord, ProcessHistory, ProcessRecord, hash_bytes};
use tracing::{debug, error, info, instrument, warn};

use super::data_dir;
use super::generator::TextGenerator;
use super::prompt::{feedback_prompt, rewrite_prompt};

const CONFIG_FILE: &str = "config.json";
const HISTORY_FILE: &str = "history.db";

/// Who asked for a document, and for which job.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    /// Without an email nothing is recorded in history.
    pub email: Option<String>,
    pub name: String,
    pub job_description: String,
}

pub struct AppServices {
    engine: RewriteEngine,
    history: Option<ProcessHistory>,
    data_dir: PathBuf,
    config: AppConfig,
}

impl AppServices {
    /// Initialise services in the user's data directory.
    pub fn init() -> Result<Self> {
        Self::in_dir(data_dir::data_dir())
    }

    /// Initialise services rooted at `dir`.
    #[instrument(skip_all, fields(path = %dir.display()))]
    pub fn in_dir(dir: PathBuf) -> Result<Self> {
        let config = load_config(&dir).unwrap_or_default();

        let history = if config.history.enabled {
            match ProcessHistory::open(dir.join(HISTORY_FILE)) {
                Ok(history) => Some(history),
                Err(e) => {
                    warn!(error = %e, "process history unavailable");
                    None
                }
            }
        } else {
            debug!("process history disabled");
            None
        };

        info!("app services initialised");
        Ok(Self {
            engine: RewriteEngine::new(config.engine.clone()),
            history,
            data_dir: dir,
            config,
        })
    }

    // -- Documents -----------------------------------------------------------

    pub fn extract_text(&self, pdf: &[u8]) -> Result<String> {
        self.engine.extract_plain_text(pdf)
    }

    /// Build the rewrite prompt for `pdf` without generating anything.
    pub fn rewrite_prompt_for(&self, pdf: &[u8], job_description: &str) -> Result<String> {
        Ok(rewrite_prompt(job_description, &self.extract_text(pdf)?))
    }

    pub fn feedback_prompt_for(&self, pdf: &[u8], job_description: &str) -> Result<String> {
        Ok(feedback_prompt(job_description, &self.extract_text(pdf)?))
    }

    /// Extract, prompt, generate, and rewrite `pdf` in place.
    #[instrument(skip_all, fields(bytes_len = pdf.len()))]
    pub fn rewrite(
        &self,
        pdf: &[u8],
        requester: &Requester,
        generator: &dyn TextGenerator,
    ) -> Result<RewriteOutput> {
        let prompt = self.rewrite_prompt_for(pdf, &requester.job_description)?;
        let replacement = generator.generate(&prompt)?;
        self.rewrite_with_text(pdf, &replacement, requester)
    }

    /// Rewrite `pdf` with an already generated replacement text.
    pub fn rewrite_with_text(
        &self,
        pdf: &[u8],
        replacement: &str,
        requester: &Requester,
    ) -> Result<RewriteOutput> {
        let output = self.engine.rewrite(pdf, replacement)?;
        info!(kind = output.kind.as_str(), bytes = output.bytes.len(), "rewrite finished");
        self.record(requester, output.kind, Some(&hash_bytes(pdf)), &output.bytes);
        Ok(output)
    }

    /// Extract, prompt, generate, and render a feedback report for `pdf`.
    #[instrument(skip_all, fields(bytes_len = pdf.len()))]
    pub fn feedback_report(
        &self,
        pdf: &[u8],
        requester: &Requester,
        generator: &dyn TextGenerator,
    ) -> Result<Vec<u8>> {
        let prompt = self.feedback_prompt_for(pdf, &requester.job_description)?;
        let report = generator.generate(&prompt)?;
        let bytes = self.engine.render_report(&report)?;
        info!(bytes = bytes.len(), "feedback report rendered");
        self.record(requester, OutputKind::Report, None, &bytes);
        Ok(bytes)
    }

    // -- History -------------------------------------------------------------

    fn record(
        &self,
        requester: &Requester,
        kind: OutputKind,
        source_hash: Option<&str>,
        output: &[u8],
    ) {
        let (Some(history), Some(email)) = (&self.history, requester.email.as_deref()) else {
            return;
        };
        let output_hash = hash_bytes(output);
        let record = NewRecord {
            user_email: email,
            user_name: &requester.name,
            job_description: &requester.job_description,
            output_kind: kind,
            source_hash,
            output_hash: &output_hash,
        };
        if let Err(e) = history.record(&record) {
            error!(error = %e, "failed to record processing history");
        }
    }

    /// Most recent history entries for `email`, up to the configured limit.
    pub fn recent_history(&self, email: &str) -> Result<Vec<ProcessRecord>> {
        match &self.history {
            Some(history) => {
                history.recent_for_user(email, self.config.history.recent_limit as usize)
            }
            None => Ok(Vec::new()),
        }
    }

    // -- Config Persistence --------------------------------------------------

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Write `config` to the settings file. Takes effect on the next start.
    pub fn save_config(&self, config: &AppConfig) -> Result<PathBuf> {
        persist_config(&self.data_dir, config)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

// -- Config file persistence -------------------------------------------------

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<PathBuf> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use restamp_core::RestampError;

    struct Canned(&'static str);

    impl TextGenerator for Canned {
        fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct OutOfQuota;

    impl TextGenerator for OutOfQuota {
        fn generate(&self, _prompt: &str) -> Result<String> {
            Err(RestampError::Generation("429 insufficient_quota".into()))
        }
    }

    fn jane() -> Requester {
        Requester {
            email: Some("jane@example.com".into()),
            name: "Jane Doe".into(),
            job_description: "Senior Rust engineer".into(),
        }
    }

    /// A small text PDF, produced by the report renderer.
    fn cv_pdf() -> Vec<u8> {
        RewriteEngine::default()
            .render_report("Jane Doe\nGo developer")
            .unwrap()
    }

    #[test]
    fn rewrite_records_history() {
        let dir = tempfile::tempdir().unwrap();
        let services = AppServices::in_dir(dir.path().to_path_buf()).unwrap();
        let pdf = cv_pdf();

        let output = services
            .rewrite(&pdf, &jane(), &Canned("Jane Doe\nRust developer"))
            .unwrap();
        assert_eq!(output.kind, OutputKind::LayoutPreserved);
        assert_eq!(
            services.extract_text(&output.bytes).unwrap(),
            "Jane Doe\nRust developer"
        );

        let recent = services.recent_history("jane@example.com").unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].job_description, "Senior Rust engineer");
        assert_eq!(recent[0].source_hash.as_deref(), Some(hash_bytes(&pdf).as_str()));
        assert_eq!(recent[0].output_hash, hash_bytes(&output.bytes));
    }

    #[test]
    fn anonymous_requests_are_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let services = AppServices::in_dir(dir.path().to_path_buf()).unwrap();
        let requester = Requester {
            email: None,
            ..jane()
        };
        services
            .rewrite(&cv_pdf(), &requester, &Canned("Anon"))
            .unwrap();
        assert!(services.recent_history("jane@example.com").unwrap().is_empty());
    }

    #[test]
    fn feedback_reports_are_recorded_without_source_hash() {
        let dir = tempfile::tempdir().unwrap();
        let services = AppServices::in_dir(dir.path().to_path_buf()).unwrap();
        let bytes = services
            .feedback_report(&cv_pdf(), &jane(), &Canned("# CV Feedback Summary\n- Clear"))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let recent = services.recent_history("jane@example.com").unwrap();
        assert_eq!(recent[0].output_kind, OutputKind::Report);
        assert!(recent[0].source_hash.is_none());
    }

    #[test]
    fn generation_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let services = AppServices::in_dir(dir.path().to_path_buf()).unwrap();
        let err = services.rewrite(&cv_pdf(), &jane(), &OutOfQuota).unwrap_err();
        assert!(matches!(err, RestampError::Generation(_)));
        assert!(services.recent_history("jane@example.com").unwrap().is_empty());
    }

    #[test]
    fn config_round_trips_through_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let services = AppServices::in_dir(dir.path().to_path_buf()).unwrap();
        let mut config = services.config().clone();
        config.engine.baseline_tolerance = 3.0;
        config.history.enabled = false;
        let path = services.save_config(&config).unwrap();
        assert!(path.ends_with(CONFIG_FILE));

        let reloaded = AppServices::in_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.config().engine.baseline_tolerance, 3.0);
        assert!(reloaded.history.is_none());
    }

    #[test]
    fn unreadable_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        let services = AppServices::in_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(services.config().engine.baseline_tolerance, 1.5);
    }
}
