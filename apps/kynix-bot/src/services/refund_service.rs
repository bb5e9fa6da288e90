use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::InboundRoutes;
use crate::panel::{CredentialProvisioner, PanelError};
use crate::services::ledger::{SubscriptionLedger, UserDirectory};
use crate::services::payment_gateway::{PaymentError, PaymentGateway};

#[derive(Debug, Error)]
pub enum RefundError {
    #[error("no user with fake id {0}")]
    UserNotFound(i64),
    #[error("user has no active subscription")]
    NoActiveSubscription,
    #[error("{0}")]
    Panel(#[from] PanelError),
    #[error("ledger failure: {0}")]
    Ledger(anyhow::Error),
    #[error("{0}")]
    PaymentRejected(String),
    #[error("payment transport error: {0}")]
    PaymentTransport(reqwest::Error),
}

impl From<PaymentError> for RefundError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::Rejected(d) => RefundError::PaymentRejected(d),
            PaymentError::Transport(e) => RefundError::PaymentTransport(e),
        }
    }
}

/// Unwinds a purchase in a fixed order: resolve the user, revoke panel
/// access, retire the ledger grant, then reverse the charge. Money moves
/// last so a failure partway through can only leave a user without
/// access and still refundable, never refunded and still connected.
#[derive(Clone)]
pub struct RefundService {
    users: Arc<dyn UserDirectory>,
    ledger: Arc<dyn SubscriptionLedger>,
    panel: Arc<dyn CredentialProvisioner>,
    payments: Arc<dyn PaymentGateway>,
    routes: InboundRoutes,
}

impl RefundService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        ledger: Arc<dyn SubscriptionLedger>,
        panel: Arc<dyn CredentialProvisioner>,
        payments: Arc<dyn PaymentGateway>,
        routes: InboundRoutes,
    ) -> Self {
        Self {
            users,
            ledger,
            panel,
            payments,
            routes,
        }
    }

    /// Any error aborts the remaining steps; the operator re-runs the
    /// command after fixing the reported cause. Completed steps are not
    /// undone, and every one of them tolerates being repeated.
    pub async fn refund(
        &self,
        fake_id: i64,
        real_id: i64,
        charge_id: &str,
    ) -> Result<(), RefundError> {
        let user = self
            .users
            .get_by_fake_id(fake_id)
            .await
            .map_err(RefundError::Ledger)?
            .ok_or(RefundError::UserNotFound(fake_id))?;

        let sub = self
            .ledger
            .latest(user.id)
            .await
            .map_err(RefundError::Ledger)?
            .filter(|s| s.active)
            .ok_or(RefundError::NoActiveSubscription)?;

        let inbound_id = if sub.is_permanent() {
            self.routes.infinite
        } else {
            self.routes.plus
        };

        self.panel.revoke_credential(user.fake_id, inbound_id).await?;

        self.ledger
            .deactivate_all(user.id)
            .await
            .map_err(RefundError::Ledger)?;

        self.payments.refund(real_id, charge_id).await?;

        info!(
            "Refund completed: fake_id={} subscription={} charge={}",
            fake_id, sub.id, charge_id
        );
        Ok(())
    }
}
