use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::SupportTicket;

#[derive(Debug, Clone)]
pub struct SupportTicketRepository {
    pool: PgPool,
}

impl SupportTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_open(&self, user_id: i64) -> Result<Option<SupportTicket>> {
        sqlx::query_as::<_, SupportTicket>(
            "SELECT * FROM support_tickets WHERE user_id = $1 AND is_open = TRUE LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch open support ticket")
    }

    /// Returns the user's open ticket, creating one if none exists.
    /// The bool is true when a new ticket was created.
    pub async fn open(&self, user_id: i64) -> Result<(SupportTicket, bool)> {
        if let Some(ticket) = self.find_open(user_id).await? {
            return Ok((ticket, false));
        }

        let ticket = sqlx::query_as::<_, SupportTicket>(
            "INSERT INTO support_tickets (user_id, is_open, created_at)
             VALUES ($1, TRUE, CURRENT_TIMESTAMP) RETURNING *",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to open support ticket")?;

        Ok((ticket, true))
    }

    /// Closes every open ticket of the user; returns how many were closed.
    pub async fn close_all(&self, user_id: i64) -> Result<u64> {
        let done = sqlx::query(
            "UPDATE support_tickets SET is_open = FALSE, closed_at = CURRENT_TIMESTAMP
             WHERE user_id = $1 AND is_open = TRUE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to close support tickets")?;

        Ok(done.rows_affected())
    }
}
