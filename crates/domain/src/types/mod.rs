//! Risk register resource models
//!
//! Request and response bodies of the backend's REST resources. Dates are
//! `NaiveDate`, row timestamps `DateTime<Utc>` and money `Decimal`.

pub mod dashboard;
pub mod dropdown;
pub mod log_entry;
pub mod risk;
pub mod timestamp;

pub use dashboard::{
    BusinessServiceExposure, ControlPosture, DashboardData, ManagementActivity, ResponseBreakdown,
    SeverityDistribution, TechnologyDomainRisk, TopRisk,
};
pub use dropdown::DropdownValue;
pub use log_entry::{LogEntryCreate, LogEntryDetails, LogEntryUpdate, RiskLogEntry, DRAFT_STATUS};
pub use risk::{
    MessageResponse, Pagination, Risk, RiskCreate, RiskDetails, RiskPage, RiskQuery, RiskUpdate,
    SortOrder, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
