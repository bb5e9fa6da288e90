use std::sync::Arc;

use dotenvy::dotenv;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod bot;
mod config;
mod identity;
mod models;
mod panel;
mod services;
mod state;

use crate::config::Settings;
use crate::identity::{spawn_clear_task, IdentityDirectory, MemoryIdentityStore};
use crate::panel::PanelClient;
use crate::services::ledger::{SubscriptionLedger, UserDirectory};
use crate::services::payment_gateway::StarsGateway;
use crate::services::provision_service::ProvisionService;
use crate::services::refund_service::RefundService;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Arc::new(Settings::load()?);
    info!("Starting Kynix VPN bot...");

    let pool = kynix_db::connect(&settings.database_url).await?;

    let users: Arc<dyn UserDirectory> =
        Arc::new(kynix_db::repositories::UserRepository::new(pool.clone()));
    let ledger: Arc<dyn SubscriptionLedger> = Arc::new(
        kynix_db::repositories::SubscriptionRepository::new(pool.clone()),
    );
    let support = kynix_db::repositories::SupportTicketRepository::new(pool);

    let panel = Arc::new(PanelClient::new(
        settings.panel.base_url.clone(),
        settings.panel.username.clone(),
        settings.panel.password.clone(),
    ));
    let payments = Arc::new(StarsGateway::new(settings.bot_token.clone()));

    let identity: Arc<dyn IdentityDirectory> = Arc::new(MemoryIdentityStore::new());
    spawn_clear_task(identity.clone(), settings.memory_clean_interval);

    let provision = ProvisionService::new(panel.clone(), ledger.clone(), settings.inbounds);
    let refund = RefundService::new(
        users.clone(),
        ledger,
        panel,
        payments,
        settings.inbounds,
    );

    let state = AppState {
        settings: settings.clone(),
        identity,
        users,
        support,
        provision,
        refund,
    };

    let bot = Bot::new(settings.bot_token.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    bot::run_bot(bot, shutdown_rx, state).await;
    Ok(())
}
