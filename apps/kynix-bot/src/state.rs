use std::sync::Arc;

use kynix_db::repositories::SupportTicketRepository;

use crate::config::Settings;
use crate::identity::IdentityDirectory;
use crate::services::ledger::UserDirectory;
use crate::services::provision_service::ProvisionService;
use crate::services::refund_service::RefundService;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub identity: Arc<dyn IdentityDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub support: SupportTicketRepository,
    pub provision: ProvisionService,
    pub refund: RefundService,
}
