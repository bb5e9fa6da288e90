//! Persistence seams the orchestrators depend on. The concrete sqlx
//! repositories implement them; tests substitute in-memory fakes.

use anyhow::Result;
use async_trait::async_trait;

use kynix_db::models::{NewCredential, Subscription, User};
use kynix_db::repositories::{SubscriptionRepository, UserRepository};

/// Durable subscription record keeping. Every call is all-or-nothing;
/// `latest` reflects the most recently created row.
#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    async fn latest(&self, user_id: i64) -> Result<Option<Subscription>>;
    async fn deactivate_all(&self, user_id: i64) -> Result<()>;
    async fn create_time_boxed(
        &self,
        user_id: i64,
        days: i64,
        credential: NewCredential,
    ) -> Result<Subscription>;
    async fn create_permanent(
        &self,
        user_id: i64,
        credential: NewCredential,
    ) -> Result<Subscription>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_or_create(&self, tg_id: i64) -> Result<User>;
    async fn get_by_fake_id(&self, fake_id: i64) -> Result<Option<User>>;
}

#[async_trait]
impl SubscriptionLedger for SubscriptionRepository {
    async fn latest(&self, user_id: i64) -> Result<Option<Subscription>> {
        SubscriptionRepository::latest(self, user_id).await
    }

    async fn deactivate_all(&self, user_id: i64) -> Result<()> {
        SubscriptionRepository::deactivate_all(self, user_id).await
    }

    async fn create_time_boxed(
        &self,
        user_id: i64,
        days: i64,
        credential: NewCredential,
    ) -> Result<Subscription> {
        SubscriptionRepository::create_time_boxed(self, user_id, days, credential).await
    }

    async fn create_permanent(
        &self,
        user_id: i64,
        credential: NewCredential,
    ) -> Result<Subscription> {
        SubscriptionRepository::create_permanent(self, user_id, credential).await
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn get_or_create(&self, tg_id: i64) -> Result<User> {
        UserRepository::get_or_create(self, tg_id).await
    }

    async fn get_by_fake_id(&self, fake_id: i64) -> Result<Option<User>> {
        UserRepository::get_by_fake_id(self, fake_id).await
    }
}
