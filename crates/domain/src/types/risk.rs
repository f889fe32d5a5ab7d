//! Risk register records
//!
//! Wire shapes of the `/risks` resource. Field names match the backend's
//! JSON exactly.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, RiskRegError};

/// Largest page the backend will serve
pub const MAX_PAGE_SIZE: u32 = 500;

/// Default page size of a risk listing
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Editable fields of a risk
///
/// Sent as-is to create or update a risk; the backend derives the ratings
/// and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDetails {
    pub risk_title: String,
    pub risk_category: String,
    pub risk_description: String,

    pub inherent_probability: i32,
    pub inherent_impact: i32,
    pub current_probability: i32,
    pub current_impact: i32,

    pub risk_status: String,
    pub risk_response_strategy: String,
    pub planned_mitigations: Option<String>,

    pub preventative_controls_status: String,
    pub preventative_controls_description: Option<String>,
    pub detective_controls_status: String,
    pub detective_controls_description: Option<String>,
    pub corrective_controls_status: String,
    pub corrective_controls_description: Option<String>,
    pub control_gaps: Option<String>,

    pub risk_owner: String,
    pub risk_owner_department: String,
    pub systems_affected: Option<String>,
    pub technology_domain: String,

    pub ibs_impact: bool,
    pub number_of_ibs_affected: Option<i32>,
    pub business_criticality: String,
    pub financial_impact_low: Option<Decimal>,
    pub financial_impact_high: Option<Decimal>,
    pub rto_hours: Option<i32>,
    pub rpo_hours: Option<i32>,
    pub sla_impact: Option<String>,
    pub slo_impact: Option<String>,

    pub date_identified: NaiveDate,
    pub last_reviewed: NaiveDate,
    pub next_review_date: NaiveDate,
}

/// Body of `POST /risks/`
pub type RiskCreate = RiskDetails;

/// Body of `PUT /risks/{id}`; the backend replaces every field
pub type RiskUpdate = RiskDetails;

impl RiskDetails {
    /// Check the ranges the backend enforces
    ///
    /// # Errors
    /// Returns `RiskRegError::InvalidInput` naming the first bad field
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("inherent_probability", self.inherent_probability),
            ("inherent_impact", self.inherent_impact),
            ("current_probability", self.current_probability),
            ("current_impact", self.current_impact),
        ] {
            check_scale(field, value)?;
        }

        for (field, value) in [
            ("number_of_ibs_affected", self.number_of_ibs_affected),
            ("rto_hours", self.rto_hours),
            ("rpo_hours", self.rpo_hours),
        ] {
            if value.is_some_and(|v| v < 0) {
                return Err(RiskRegError::InvalidInput(format!("{field} must not be negative")));
            }
        }

        for (field, value) in [
            ("financial_impact_low", self.financial_impact_low),
            ("financial_impact_high", self.financial_impact_high),
        ] {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(RiskRegError::InvalidInput(format!("{field} must not be negative")));
            }
        }

        if self.risk_title.trim().is_empty() {
            return Err(RiskRegError::InvalidInput("risk_title must not be empty".into()));
        }
        Ok(())
    }
}

/// A stored risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub risk_id: String,
    #[serde(flatten)]
    pub details: RiskDetails,
    /// Inherent probability times impact (1 to 25)
    pub inherent_risk_rating: i32,
    /// Current probability times impact (1 to 25)
    pub current_risk_rating: i32,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "super::timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Sort direction of a risk listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filters and paging for `GET /risks/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskQuery {
    pub skip: u32,
    pub limit: u32,
    pub category: Option<String>,
    pub status: Option<String>,
    /// Case-insensitive match on title and description
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
}

impl Default for RiskQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
            category: None,
            status: None,
            search: None,
            sort_by: None,
            sort_order: SortOrder::Asc,
        }
    }
}

impl RiskQuery {
    /// Query for the 1-based `page` of `per_page` risks
    #[must_use]
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            skip: page.saturating_sub(1).saturating_mul(per_page),
            limit: per_page,
            ..Self::default()
        }
    }

    /// # Errors
    /// Returns `RiskRegError::InvalidInput` if `limit` is zero or above
    /// [`MAX_PAGE_SIZE`]
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 || self.limit > MAX_PAGE_SIZE {
            return Err(RiskRegError::InvalidInput(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}

/// Paging metadata of a risk listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    /// 1-based
    pub page: u32,
    pub per_page: u32,
    pub pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

/// One page of risks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPage {
    pub items: Vec<Risk>,
    pub pagination: Pagination,
}

/// Confirmation body of the delete endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn check_scale(field: &str, value: i32) -> Result<()> {
    if (1..=5).contains(&value) {
        Ok(())
    } else {
        Err(RiskRegError::InvalidInput(format!("{field} must be between 1 and 5, got {value}")))
    }
}
