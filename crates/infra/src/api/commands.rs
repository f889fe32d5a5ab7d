//! Typed commands for the risk register resources
//!
//! Every call goes through [`ApiClient::request`], so it gets the same
//! bearer auth, proactive refresh and one retry on 401 as any other request.
//! Inputs with ranges the backend enforces are checked before sending.

use std::collections::BTreeMap;

use reqwest::Method;
use riskreg_domain::types::{
    DashboardData, DropdownValue, LogEntryCreate, LogEntryDetails, LogEntryUpdate,
    MessageResponse, Risk, RiskCreate, RiskLogEntry, RiskPage, RiskQuery, RiskUpdate,
};
use tracing::{debug, instrument};
use url::form_urlencoded;
use urlencoding::encode;

use super::client::ApiClient;
use super::errors::ApiError;

/// Default number of entries in the recent-updates feed
pub const DEFAULT_RECENT_UPDATES: u32 = 50;

/// Largest recent-updates feed the backend will serve
pub const MAX_RECENT_UPDATES: u32 = 100;

/// API commands for the risk register resources
#[derive(Debug, Clone)]
pub struct ApiCommands {
    client: ApiClient,
}

impl ApiCommands {
    /// Create a new commands instance
    ///
    /// Clones of one [`ApiClient`] share a session, so this can be built
    /// from any of them.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    // === Risk Operations ===

    /// List risks matching `query`
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if the page size is out of range,
    /// otherwise any error of the request pipeline
    #[instrument(skip(self, query), fields(offset = query.skip, limit = query.limit))]
    pub async fn list_risks(&self, query: &RiskQuery) -> Result<RiskPage, ApiError> {
        query.validate()?;

        let mut params = form_urlencoded::Serializer::new(String::new());
        params.append_pair("skip", &query.skip.to_string());
        params.append_pair("limit", &query.limit.to_string());
        for (key, value) in [
            ("category", &query.category),
            ("status", &query.status),
            ("search", &query.search),
            ("sort_by", &query.sort_by),
        ] {
            if let Some(value) = value {
                params.append_pair(key, value);
            }
        }
        params.append_pair("sort_order", query.sort_order.as_str());

        let path = format!("/risks/?{}", params.finish());
        let page: RiskPage = self.client.get(&path).await?;

        debug!(
            count = page.items.len(),
            total = page.pagination.total,
            page = page.pagination.page,
            "Risks listed"
        );
        Ok(page)
    }

    /// # Errors
    /// Returns `ApiError::Http` with 404 if the risk does not exist
    #[instrument(skip(self))]
    pub async fn get_risk(&self, risk_id: &str) -> Result<Risk, ApiError> {
        self.client.get(&format!("/risks/{}", encode(risk_id))).await
    }

    /// Create a risk; the backend assigns its id and ratings
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if a rating or amount is out of
    /// range, otherwise any error of the request pipeline
    #[instrument(skip(self, risk), fields(title = %risk.risk_title))]
    pub async fn create_risk(&self, risk: &RiskCreate) -> Result<Risk, ApiError> {
        risk.validate()?;

        let created: Risk = self.client.post("/risks/", risk).await?;

        debug!(risk_id = %created.risk_id, "Risk created");
        Ok(created)
    }

    /// Replace every editable field of a risk
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if a rating or amount is out of
    /// range, `ApiError::Http` with 404 if the risk does not exist
    #[instrument(skip(self, risk))]
    pub async fn update_risk(&self, risk_id: &str, risk: &RiskUpdate) -> Result<Risk, ApiError> {
        risk.validate()?;
        self.client.put(&format!("/risks/{}", encode(risk_id)), risk).await
    }

    /// # Errors
    /// Returns `ApiError::Http` with 404 if the risk does not exist
    #[instrument(skip(self))]
    pub async fn delete_risk(&self, risk_id: &str) -> Result<MessageResponse, ApiError> {
        self.client.delete(&format!("/risks/{}", encode(risk_id))).await
    }

    /// Update history of one risk, newest first
    ///
    /// # Errors
    /// Returns `ApiError::Http` with 404 if the risk does not exist
    #[instrument(skip(self))]
    pub async fn risk_updates(&self, risk_id: &str) -> Result<Vec<RiskLogEntry>, ApiError> {
        self.client.get(&format!("/risks/{}/updates", encode(risk_id))).await
    }

    /// Latest updates across all risks
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if `limit` is zero or above
    /// [`MAX_RECENT_UPDATES`]
    #[instrument(skip(self))]
    pub async fn recent_updates(&self, limit: u32) -> Result<Vec<RiskLogEntry>, ApiError> {
        if limit == 0 || limit > MAX_RECENT_UPDATES {
            return Err(ApiError::InvalidInput(format!(
                "limit must be between 1 and {MAX_RECENT_UPDATES}, got {limit}"
            )));
        }
        self.client.get(&format!("/risks/updates/recent?limit={limit}")).await
    }

    // === Log Entry Operations ===

    /// Add a log entry to a risk
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if a rating is out of range,
    /// `ApiError::Http` with 404 if the risk does not exist
    #[instrument(skip(self, details), fields(entry_type = %details.entry_type))]
    pub async fn create_log_entry(
        &self,
        risk_id: &str,
        details: LogEntryDetails,
    ) -> Result<RiskLogEntry, ApiError> {
        details.validate()?;

        let body = LogEntryCreate { risk_id: risk_id.to_string(), details };
        let entry: RiskLogEntry =
            self.client.post(&format!("/risks/{}/log-entries", encode(risk_id)), &body).await?;

        debug!(log_entry_id = %entry.log_entry_id, "Log entry created");
        Ok(entry)
    }

    /// # Errors
    /// Returns `ApiError::Http` with 404 if the risk does not exist
    #[instrument(skip(self))]
    pub async fn log_entries(&self, risk_id: &str) -> Result<Vec<RiskLogEntry>, ApiError> {
        self.client.get(&format!("/risks/{}/log-entries", encode(risk_id))).await
    }

    /// # Errors
    /// Returns `ApiError::Http` with 404 if the entry does not exist
    #[instrument(skip(self))]
    pub async fn get_log_entry(&self, log_entry_id: &str) -> Result<RiskLogEntry, ApiError> {
        self.client.get(&log_entry_path(log_entry_id)).await
    }

    /// Change the fields set in `update`
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if a rating is out of range,
    /// `ApiError::Http` with 404 if the entry does not exist
    #[instrument(skip(self, update))]
    pub async fn update_log_entry(
        &self,
        log_entry_id: &str,
        update: &LogEntryUpdate,
    ) -> Result<RiskLogEntry, ApiError> {
        update.validate()?;
        self.client.put(&log_entry_path(log_entry_id), update).await
    }

    /// Approve an entry; the backend applies its new rating to the risk
    ///
    /// # Errors
    /// Returns `ApiError::Http` with 404 if the entry does not exist
    #[instrument(skip(self))]
    pub async fn approve_log_entry(
        &self,
        log_entry_id: &str,
        reviewed_by: &str,
    ) -> Result<RiskLogEntry, ApiError> {
        self.review_log_entry(log_entry_id, "approve", reviewed_by).await
    }

    /// # Errors
    /// Returns `ApiError::Http` with 404 if the entry does not exist
    #[instrument(skip(self))]
    pub async fn reject_log_entry(
        &self,
        log_entry_id: &str,
        reviewed_by: &str,
    ) -> Result<RiskLogEntry, ApiError> {
        self.review_log_entry(log_entry_id, "reject", reviewed_by).await
    }

    /// # Errors
    /// Returns `ApiError::Http` with 404 if the entry does not exist
    #[instrument(skip(self))]
    pub async fn delete_log_entry(&self, log_entry_id: &str) -> Result<MessageResponse, ApiError> {
        self.client.delete(&log_entry_path(log_entry_id)).await
    }

    async fn review_log_entry(
        &self,
        log_entry_id: &str,
        decision: &str,
        reviewed_by: &str,
    ) -> Result<RiskLogEntry, ApiError> {
        let query =
            form_urlencoded::Serializer::new(String::new()).append_pair("reviewed_by", reviewed_by).finish();
        let path = format!("{}/{decision}?{query}", log_entry_path(log_entry_id));

        let entry: RiskLogEntry = self.client.request(Method::POST, &path, None::<&()>).await?;

        debug!(status = %entry.details.entry_status, "Log entry reviewed");
        Ok(entry)
    }

    // === Dashboard and Reference Data ===

    /// # Errors
    /// Returns any error of the request pipeline
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardData, ApiError> {
        self.client.get("/dashboard/").await
    }

    /// Dropdown values, optionally limited to one category
    ///
    /// # Errors
    /// Returns any error of the request pipeline
    #[instrument(skip(self))]
    pub async fn dropdown_values(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<DropdownValue>, ApiError> {
        let path = match category {
            Some(category) => format!(
                "/dropdown/values?{}",
                form_urlencoded::Serializer::new(String::new())
                    .append_pair("category", category)
                    .finish()
            ),
            None => "/dropdown/values".to_string(),
        };
        self.client.get(&path).await
    }

    /// # Errors
    /// Returns any error of the request pipeline
    #[instrument(skip(self))]
    pub async fn dropdown_categories(&self) -> Result<Vec<String>, ApiError> {
        self.client.get("/dropdown/categories").await
    }

    /// Dropdown values grouped by category
    ///
    /// An empty `categories` asks for every category.
    ///
    /// # Errors
    /// Returns any error of the request pipeline
    #[instrument(skip(self))]
    pub async fn dropdown_values_by_category(
        &self,
        categories: &[&str],
    ) -> Result<BTreeMap<String, Vec<DropdownValue>>, ApiError> {
        let mut path = "/dropdown/values/by-category".to_string();
        if !categories.is_empty() {
            let mut params = form_urlencoded::Serializer::new(String::new());
            for category in categories {
                params.append_pair("categories", category);
            }
            path.push('?');
            path.push_str(&params.finish());
        }
        self.client.get(&path).await
    }
}

fn log_entry_path(log_entry_id: &str) -> String {
    format!("/risks/log-entries/{}", encode(log_entry_id))
}

impl ApiClient {
    /// Typed resource commands sharing this client's session
    #[must_use]
    pub fn commands(&self) -> ApiCommands {
        ApiCommands::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use riskreg_common::auth::SessionCredentials;
    use riskreg_common::storage::MemoryStorage;
    use riskreg_common::testing::token_expiring_in;
    use riskreg_domain::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn create_test_commands(server: &MockServer) -> ApiCommands {
        let config =
            ClientConfig { base_url: format!("{}/api/v1", server.uri()), ..ClientConfig::default() };
        let client = ApiClient::new(&config, MemoryStorage::new()).unwrap();
        client
            .tokens()
            .start_session(&SessionCredentials::new(
                token_expiring_in(chrono::Duration::hours(1)),
                "refresh",
                "analyst",
            ))
            .unwrap();
        client.commands()
    }

    fn log_entry_json(status: &str) -> serde_json::Value {
        json!({
            "log_entry_id": "LE-0001",
            "risk_id": "TR-2025-001",
            "entry_date": "2025-03-01",
            "entry_type": "Rating Change",
            "entry_summary": "Backups now tested weekly",
            "previous_risk_rating": 16,
            "new_risk_rating": 12,
            "entry_status": status,
            "created_by": "analyst",
            "reviewed_by": null,
            "approved_date": null,
            "created_at": "2025-03-01T09:00:00",
            "updated_at": "2025-03-02T10:15:00"
        })
    }

    #[tokio::test]
    async fn test_list_risks_sends_filters() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/risks/"))
            .and(query_param("skip", "20"))
            .and(query_param("limit", "20"))
            .and(query_param("search", "data loss"))
            .and(query_param("sort_order", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [],
                "pagination": {
                    "total": 41, "page": 2, "per_page": 20, "pages": 3,
                    "has_prev": true, "has_next": true
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let commands = create_test_commands(&mock_server);
        let query = RiskQuery {
            search: Some("data loss".into()),
            sort_order: riskreg_domain::types::SortOrder::Desc,
            ..RiskQuery::page(2, 20)
        };

        let page = commands.list_risks(&query).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.pages, 3);
        assert!(page.pagination.has_next);
    }

    #[tokio::test]
    async fn test_list_risks_rejects_oversized_page_without_sending() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let commands = create_test_commands(&mock_server);
        let result = commands.list_risks(&RiskQuery::page(1, 501)).await;

        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_get_risk_encodes_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/risks/TR%2F7"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Risk not found"))
            .mount(&mock_server)
            .await;

        let commands = create_test_commands(&mock_server);
        let err = commands.get_risk("TR/7").await.unwrap_err();

        assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_create_log_entry_carries_risk_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/risks/TR-2025-001/log-entries"))
            .and(body_json(json!({
                "risk_id": "TR-2025-001",
                "entry_date": "2025-03-01",
                "entry_type": "Rating Change",
                "entry_summary": "Backups now tested weekly",
                "previous_risk_rating": 16,
                "new_risk_rating": 12,
                "previous_probability": null,
                "new_probability": null,
                "previous_impact": null,
                "new_impact": null,
                "mitigation_actions_taken": null,
                "risk_owner_at_time": null,
                "supporting_evidence": null,
                "entry_status": "Draft",
                "created_by": "analyst",
                "reviewed_by": null,
                "approved_date": null,
                "business_justification": null,
                "next_review_required": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(log_entry_json("Draft")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let commands = create_test_commands(&mock_server);
        let mut details = LogEntryDetails::draft(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            "Rating Change",
            "Backups now tested weekly",
            "analyst",
        );
        details.previous_risk_rating = Some(16);
        details.new_risk_rating = Some(12);

        let entry = commands.create_log_entry("TR-2025-001", details).await.unwrap();
        assert_eq!(entry.log_entry_id, "LE-0001");
        assert!(entry.is_draft());
    }

    #[tokio::test]
    async fn test_approve_and_reject_pass_reviewer_as_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/risks/log-entries/LE-0001/approve"))
            .and(query_param("reviewed_by", "Risk Committee"))
            .respond_with(ResponseTemplate::new(200).set_body_json(log_entry_json("Approved")))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/risks/log-entries/LE-0002/reject"))
            .and(query_param("reviewed_by", "cro"))
            .respond_with(ResponseTemplate::new(200).set_body_json(log_entry_json("Rejected")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let commands = create_test_commands(&mock_server);

        let approved = commands.approve_log_entry("LE-0001", "Risk Committee").await.unwrap();
        assert_eq!(approved.details.entry_status, "Approved");
        let rejected = commands.reject_log_entry("LE-0002", "cro").await.unwrap();
        assert_eq!(rejected.details.entry_status, "Rejected");
    }

    #[tokio::test]
    async fn test_update_log_entry_sends_partial_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/risks/log-entries/LE-0001"))
            .and(body_json(json!({ "entry_summary": "Revised summary" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(log_entry_json("Draft")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let commands = create_test_commands(&mock_server);
        let update = LogEntryUpdate {
            entry_summary: Some("Revised summary".into()),
            ..LogEntryUpdate::default()
        };

        assert!(commands.update_log_entry("LE-0001", &update).await.is_ok());
    }

    #[tokio::test]
    async fn test_recent_updates_bounds_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/risks/updates/recent"))
            .and(query_param("limit", "50"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([log_entry_json("Approved")])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let commands = create_test_commands(&mock_server);

        let updates = commands.recent_updates(DEFAULT_RECENT_UPDATES).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert!(matches!(commands.recent_updates(101).await, Err(ApiError::InvalidInput(_))));
        assert!(matches!(commands.recent_updates(0).await, Err(ApiError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_dropdown_values_by_category_repeats_parameter() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/dropdown/values/by-category"))
            .respond_with(|request: &wiremock::Request| {
                let categories: Vec<String> = request
                    .url
                    .query_pairs()
                    .filter(|(key, _)| key == "categories")
                    .map(|(_, value)| value.into_owned())
                    .collect();
                assert_eq!(categories, ["risk_status", "risk_category"]);
                ResponseTemplate::new(200).set_body_json(json!({
                    "risk_status": [
                        {"id": 1, "category": "risk_status", "value": "Active", "display_order": 1, "is_active": true}
                    ],
                    "risk_category": []
                }))
            })
            .expect(1)
            .mount(&mock_server)
            .await;

        let commands = create_test_commands(&mock_server);
        let values =
            commands.dropdown_values_by_category(&["risk_status", "risk_category"]).await.unwrap();

        assert_eq!(values["risk_status"][0].value, "Active");
        assert!(values["risk_category"].is_empty());
    }

    #[tokio::test]
    async fn test_delete_risk_returns_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/v1/risks/TR-2025-001"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "Risk deleted successfully"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let commands = create_test_commands(&mock_server);
        let response = commands.delete_risk("TR-2025-001").await.unwrap();

        assert_eq!(response.message, "Risk deleted successfully");
    }
}
