//! Review window gating.
//!
//! Each phase can be limited to a configured date window. The config is a
//! JSON system setting; the dates arrive as strings and may be absent or
//! malformed, so the check treats "enabled but unparseable" as a hard
//! deny rather than silently allowing reviews.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::workflow::Phase;

/// Date window stored as a system setting, one per phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Inclusive start, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive end, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
}

/// The setting code holding a phase's review window.
pub fn window_setting_code(phase: Phase) -> &'static str {
    match phase {
        Phase::Application => "APPLICATION_WINDOW",
        Phase::MidTerm => "MIDTERM_WINDOW",
        Phase::Closure => "CLOSURE_WINDOW",
    }
}

fn parse_bound(label: &str, raw: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        CoreError::Validation(format!(
            "review window {label} date is misconfigured, contact an administrator"
        ))
    })
}

/// Allow or deny a review action on `today` against a window config.
pub fn check_window(config: &WindowConfig, today: NaiveDate) -> Result<(), CoreError> {
    if !config.enabled {
        return Ok(());
    }

    if let Some(raw) = config.start_date.as_deref().filter(|s| !s.is_empty()) {
        let start = parse_bound("start", raw)?;
        if today < start {
            return Err(CoreError::Validation(format!(
                "the review window opens on {start}"
            )));
        }
    }

    if let Some(raw) = config.end_date.as_deref().filter(|s| !s.is_empty()) {
        let end = parse_bound("end", raw)?;
        if today > end {
            return Err(CoreError::Validation(format!(
                "the review window closed on {end}"
            )));
        }
    }

    Ok(())
}
