//! Dashboard summary served by `GET /dashboard/`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Active risks bucketed by current rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    /// Rating 16 to 25
    pub critical: u32,
    /// Rating 12 to 15
    pub high: u32,
    /// Rating 6 to 11
    pub medium: u32,
    /// Rating 1 to 5
    pub low: u32,
}

impl SeverityDistribution {
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.critical + self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyDomainRisk {
    pub domain: String,
    pub risk_count: u32,
    pub average_risk_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPosture {
    pub preventative_adequate_percentage: f64,
    pub detective_adequate_percentage: f64,
    pub corrective_adequate_percentage: f64,
    pub risks_with_control_gaps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopRisk {
    pub risk_id: String,
    pub risk_title: String,
    pub business_disruption_net_exposure: String,
    pub financial_impact_high: Option<Decimal>,
    pub ibs_affected: Option<String>,
    pub risk_owner: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBreakdown {
    pub mitigate: u32,
    pub accept: u32,
    pub transfer: u32,
    pub avoid: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementActivity {
    pub risks_reviewed_this_month: u32,
    pub overdue_reviews: u32,
    pub recent_risk_rating_changes: u32,
}

/// Exposure of important business services (IBS)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessServiceExposure {
    pub risks_affecting_ibs: u32,
    pub total_ibs_affected: u32,
    pub percentage_risks_with_ibs_impact: f64,
    pub critical_risks_affecting_ibs: u32,
}

/// Everything the dashboard screen shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub total_active_risks: u32,
    pub critical_high_risk_count: u32,
    /// Month-over-month change in percent
    pub risk_trend_change: f64,

    pub risk_severity_distribution: SeverityDistribution,
    pub technology_domain_risks: Vec<TechnologyDomainRisk>,
    pub control_posture: ControlPosture,
    pub top_priority_risks: Vec<TopRisk>,
    pub risk_response_breakdown: ResponseBreakdown,

    pub total_financial_exposure: Decimal,
    pub average_financial_impact: Decimal,
    /// Risks with a high-end financial impact above one million
    pub high_financial_impact_risks: u32,

    pub risk_management_activity: ManagementActivity,
    pub business_service_exposure: BusinessServiceExposure,
}
