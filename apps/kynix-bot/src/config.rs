use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::models::plan::PlanKind;

/// Everything the bot needs from the environment, read once at startup.
/// No component reaches into `env` after construction.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: String,
    pub database_url: String,
    pub panel: PanelSettings,
    pub inbounds: InboundRoutes,
    pub admins: Vec<i64>,
    pub memory_clean_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct PanelSettings {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Panel inbound ids, one per plan kind. Time-boxed and permanent grants
/// live under different inbounds so they can be revoked independently.
#[derive(Debug, Clone, Copy)]
pub struct InboundRoutes {
    pub plus: i64,
    pub infinite: i64,
}

impl InboundRoutes {
    pub fn for_plan(&self, plan: PlanKind) -> i64 {
        match plan {
            PlanKind::TimeBoxed { .. } => self.plus,
            PlanKind::Permanent => self.infinite,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let admins = env::var("ADMINS")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<i64>().context("ADMINS must be a comma-separated list of ids"))
            .collect::<Result<Vec<i64>>>()?;

        let clean_hours: u64 = env::var("MEMORY_CLEAN_INTERVAL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(12);

        Ok(Self {
            bot_token: env::var("BOT_TOKEN").context("BOT_TOKEN is not set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
            panel: PanelSettings {
                base_url: env::var("XUI_BASE_URL").context("XUI_BASE_URL is not set")?,
                username: env::var("XUI_USERNAME").context("XUI_USERNAME is not set")?,
                password: env::var("XUI_PASSWORD").context("XUI_PASSWORD is not set")?,
            },
            inbounds: InboundRoutes {
                plus: env::var("XUI_INBOUND_ID")
                    .context("XUI_INBOUND_ID is not set")?
                    .parse()
                    .context("XUI_INBOUND_ID must be an integer")?,
                infinite: env::var("XUI_INBOUND_ID_INF")
                    .context("XUI_INBOUND_ID_INF is not set")?
                    .parse()
                    .context("XUI_INBOUND_ID_INF must be an integer")?,
            },
            admins,
            memory_clean_interval: Duration::from_secs(clean_hours * 3600),
        })
    }

    pub fn is_admin(&self, tg_id: i64) -> bool {
        self.admins.contains(&tg_id)
    }
}
