//! Log in, call a protected endpoint and log out against a running backend.
//!
//! ```text
//! RISKREG_API_BASE_URL=http://localhost:8000/api/v1 \
//! RISKREG_DEMO_USER=analyst RISKREG_DEMO_PASSWORD=... \
//! cargo run -p riskreg-infra --example session_demo
//! ```

use riskreg_common::auth::SessionEvent;
use riskreg_domain::types::RiskQuery;
use riskreg_infra::observability::{init_tracing, TracingConfig};
use riskreg_infra::{config, ApiClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&TracingConfig::from_env())?;

    let config = config::load()?;
    let client = ApiClient::from_config(&config)?;

    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::LoggedIn { username } => tracing::info!(%username, "logged in"),
                SessionEvent::LoggedOut => tracing::info!("logged out"),
                SessionEvent::Expired => tracing::warn!("session expired, log in again"),
            }
        }
    });

    if !client.health_check().await? {
        tracing::warn!("backend reports unhealthy");
    }

    let username = std::env::var("RISKREG_DEMO_USER")?;
    let password = std::env::var("RISKREG_DEMO_PASSWORD")?;
    client.login(&username, &password).await?;

    let auto_refresh = client.tokens().clone().spawn_auto_refresh();

    let verified = client.verify().await?;
    tracing::info!(username = %verified.username, valid = verified.valid, "session verified");

    let commands = client.commands();
    let page = commands.list_risks(&RiskQuery::page(1, 20)).await?;
    tracing::info!(
        count = page.items.len(),
        total = page.pagination.total,
        "fetched risks"
    );
    let dashboard = commands.dashboard().await?;
    tracing::info!(active = dashboard.total_active_risks, "loaded dashboard");

    auto_refresh.abort();
    client.logout().await?;
    Ok(())
}
