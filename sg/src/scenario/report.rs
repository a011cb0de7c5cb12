//! Scenario run results and their text rendering

use std::fmt::Write as _;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::Variant;
use crate::admin::AuditEvent;
use crate::notice::SessionNotice;
use crate::session::SessionMetrics;

/// State observed after one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub step: String,

    /// Serialized snapshot
    pub snapshot: serde_json::Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<SessionNotice>,

    /// Error returned by a login action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepReport {
    fn loading(&self) -> bool {
        self.snapshot.get("loading").and_then(|v| v.as_bool()).unwrap_or(false)
    }

    fn identity(&self) -> Option<&str> {
        self.snapshot.get("identity").and_then(|v| v.as_str())
    }

    fn has_profile(&self) -> bool {
        self.snapshot.get("profile").is_some_and(|v| !v.is_null())
    }
}

/// Complete scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub variant: Variant,
    pub steps: Vec<StepReport>,
    pub metrics: SessionMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audit: Vec<AuditEvent>,
}

/// Human-readable rendering with one line per step
pub fn render_text(report: &ScenarioReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} ({})",
        "Scenario:".bold(),
        report.name,
        report.variant.to_string().cyan()
    );

    for step in &report.steps {
        let state = if step.loading() {
            "loading".yellow()
        } else if step.identity().is_none() {
            "signed-out".normal()
        } else if step.has_profile() {
            "ready".green()
        } else {
            "awaiting-profile".yellow()
        };
        let identity = step.identity().unwrap_or("-");
        let _ = writeln!(out, "  [{:>2}] {:<32} {:<18} {}", step.index, step.step, state, identity);

        if let Some(error) = &step.error {
            let _ = writeln!(out, "       {} {}", "error:".red(), error);
        }
        for notice in &step.notices {
            let line = match notice {
                SessionNotice::Recovered { reason, .. } => format!("recovered: {}", reason),
                SessionNotice::ProfileFetchFailed { message, .. } => format!("profile fetch failed: {}", message),
                SessionNotice::ResourceFetchFailed { resource, message, .. } => {
                    format!("{} fetch failed: {}", resource, message)
                }
            };
            let _ = writeln!(out, "       {} {}", "notice".magenta(), line);
        }
    }

    for event in &report.audit {
        let action = if event.action.is_deny() {
            event.action.to_string().red()
        } else {
            event.action.to_string().green()
        };
        let _ = writeln!(out, "  {} {} {} role={}", "audit".blue(), action, event.actor, event.role);
    }

    let m = &report.metrics;
    let _ = writeln!(
        out,
        "{} generation={} profile-fetches={} resource-fetches={} stale={} timers-armed={} recoveries={}",
        "Metrics:".bold(),
        m.generation,
        m.profile_fetches,
        m.resource_fetches,
        m.stale_results,
        m.timers_armed,
        m.recoveries
    );
    out
}
