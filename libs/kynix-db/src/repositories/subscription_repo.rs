use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::{NewCredential, Subscription};

#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most recently created subscription for the user, active or not.
    pub async fn latest(&self, user_id: i64) -> Result<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch latest subscription")
    }

    /// Deactivates every subscription of the user. Idempotent; rows that
    /// are already inactive keep their original `closed_at`.
    pub async fn deactivate_all(&self, user_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE subscriptions SET active = FALSE, closed_at = CURRENT_TIMESTAMP
             WHERE user_id = $1 AND active = TRUE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to deactivate subscriptions")?;
        Ok(())
    }

    /// Inserts an active subscription expiring `days` from now. Prior
    /// active grants are closed in the same transaction, so at most one
    /// grant is live per user at any time.
    pub async fn create_time_boxed(
        &self,
        user_id: i64,
        days: i64,
        credential: NewCredential,
    ) -> Result<Subscription> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE subscriptions SET active = FALSE, closed_at = CURRENT_TIMESTAMP
             WHERE user_id = $1 AND active = TRUE",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions
                (user_id, active, expires_at, xui_client_id, xui_email, xui_config, created_at)
            VALUES
                ($1, TRUE, CURRENT_TIMESTAMP + ($2 * interval '1 day'), $3, $4, $5, CURRENT_TIMESTAMP)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(days)
        .bind(&credential.client_id)
        .bind(&credential.email)
        .bind(&credential.config)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create time-boxed subscription")?;

        tx.commit().await?;
        Ok(sub)
    }

    /// Inserts an active never-expiring subscription, closing all prior
    /// grants atomically.
    pub async fn create_permanent(
        &self,
        user_id: i64,
        credential: NewCredential,
    ) -> Result<Subscription> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE subscriptions SET active = FALSE, closed_at = CURRENT_TIMESTAMP
             WHERE user_id = $1 AND active = TRUE",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions
                (user_id, active, expires_at, xui_client_id, xui_email, xui_config, created_at)
            VALUES
                ($1, TRUE, NULL, $2, $3, $4, CURRENT_TIMESTAMP)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&credential.client_id)
        .bind(&credential.email)
        .bind(&credential.config)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create permanent subscription")?;

        tx.commit().await?;
        Ok(sub)
    }
}
