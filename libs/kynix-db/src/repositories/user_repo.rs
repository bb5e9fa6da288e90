use anyhow::{Context, Result};
use rand::Rng;
use sqlx::PgPool;

use crate::models::User;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_tg_id(&self, tg_id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE tg_id = $1")
            .bind(tg_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by tg_id")
    }

    pub async fn get_by_fake_id(&self, fake_id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE fake_id = $1")
            .bind(fake_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by fake_id")
    }

    /// Fetches the user for `tg_id`, creating one with a fresh random
    /// 8-digit fake id if none exists yet. The fake id is unique; on the
    /// rare collision the insert is a no-op and we draw again.
    pub async fn get_or_create(&self, tg_id: i64) -> Result<User> {
        if let Some(user) = self.get_by_tg_id(tg_id).await? {
            return Ok(user);
        }

        for _ in 0..5 {
            let fake_id: i64 = rand::rng().random_range(10_000_000..100_000_000);

            let inserted = sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (tg_id, fake_id, created_at)
                VALUES ($1, $2, CURRENT_TIMESTAMP)
                ON CONFLICT DO NOTHING
                RETURNING *
                "#,
            )
            .bind(tg_id)
            .bind(fake_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to insert user")?;

            if let Some(user) = inserted {
                return Ok(user);
            }

            // Either the tg_id was created concurrently or the fake id
            // collided; a re-fetch distinguishes the two.
            if let Some(user) = self.get_by_tg_id(tg_id).await? {
                return Ok(user);
            }
        }

        Err(anyhow::anyhow!(
            "Could not allocate a unique fake id for tg_id {tg_id}"
        ))
    }
}
