//! Risk log entries
//!
//! A log entry records a proposed or approved change to a risk. Entries start
//! as drafts and are approved or rejected by a reviewer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, RiskRegError};

/// Status of a new entry when none is given
pub const DRAFT_STATUS: &str = "Draft";

fn draft_status() -> String {
    DRAFT_STATUS.to_string()
}

/// Fields shared by new and stored log entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntryDetails {
    pub entry_date: NaiveDate,
    pub entry_type: String,
    pub entry_summary: String,

    pub previous_risk_rating: Option<i32>,
    pub new_risk_rating: Option<i32>,
    pub previous_probability: Option<i32>,
    pub new_probability: Option<i32>,
    pub previous_impact: Option<i32>,
    pub new_impact: Option<i32>,

    pub mitigation_actions_taken: Option<String>,
    pub risk_owner_at_time: Option<String>,
    pub supporting_evidence: Option<String>,

    #[serde(default = "draft_status")]
    pub entry_status: String,
    pub created_by: String,
    pub reviewed_by: Option<String>,
    pub approved_date: Option<NaiveDate>,

    pub business_justification: Option<String>,
    pub next_review_required: Option<NaiveDate>,
}

impl LogEntryDetails {
    /// Draft entry with only the required fields set
    #[must_use]
    pub fn draft(
        entry_date: NaiveDate,
        entry_type: impl Into<String>,
        entry_summary: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            entry_date,
            entry_type: entry_type.into(),
            entry_summary: entry_summary.into(),
            previous_risk_rating: None,
            new_risk_rating: None,
            previous_probability: None,
            new_probability: None,
            previous_impact: None,
            new_impact: None,
            mitigation_actions_taken: None,
            risk_owner_at_time: None,
            supporting_evidence: None,
            entry_status: draft_status(),
            created_by: created_by.into(),
            reviewed_by: None,
            approved_date: None,
            business_justification: None,
            next_review_required: None,
        }
    }

    /// Check the rating ranges the backend enforces
    ///
    /// # Errors
    /// Returns `RiskRegError::InvalidInput` naming the first bad field
    pub fn validate(&self) -> Result<()> {
        check_ratings(
            [self.previous_risk_rating, self.new_risk_rating],
            [
                self.previous_probability,
                self.new_probability,
                self.previous_impact,
                self.new_impact,
            ],
        )
    }
}

/// Body of `POST /risks/{id}/log-entries`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntryCreate {
    /// Overwritten by the backend with the id from the path
    pub risk_id: String,
    #[serde(flatten)]
    pub details: LogEntryDetails,
}

/// Partial update of a log entry; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_risk_rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_risk_rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_probability: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_probability: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_impact: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_impact: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation_actions_taken: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_owner_at_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supporting_evidence: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_justification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review_required: Option<NaiveDate>,
}

impl LogEntryUpdate {
    /// # Errors
    /// Returns `RiskRegError::InvalidInput` naming the first bad field
    pub fn validate(&self) -> Result<()> {
        check_ratings(
            [self.previous_risk_rating, self.new_risk_rating],
            [
                self.previous_probability,
                self.new_probability,
                self.previous_impact,
                self.new_impact,
            ],
        )
    }
}

/// A stored log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskLogEntry {
    pub log_entry_id: String,
    pub risk_id: String,
    #[serde(flatten)]
    pub details: LogEntryDetails,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "super::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl RiskLogEntry {
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.details.entry_status == DRAFT_STATUS
    }
}

fn check_ratings(ratings: [Option<i32>; 2], scales: [Option<i32>; 4]) -> Result<()> {
    if let Some(rating) = ratings.into_iter().flatten().find(|r| !(1..=25).contains(r)) {
        return Err(RiskRegError::InvalidInput(format!(
            "risk rating must be between 1 and 25, got {rating}"
        )));
    }
    if let Some(value) = scales.into_iter().flatten().find(|v| !(1..=5).contains(v)) {
        return Err(RiskRegError::InvalidInput(format!(
            "probability and impact must be between 1 and 5, got {value}"
        )));
    }
    Ok(())
}
