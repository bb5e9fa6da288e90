pub mod subscription_repo;
pub mod support_repo;
pub mod user_repo;

pub use subscription_repo::SubscriptionRepository;
pub use support_repo::SupportTicketRepository;
pub use user_repo::UserRepository;
