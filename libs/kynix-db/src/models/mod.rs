pub mod subscription;
pub mod support;
pub mod user;

pub use subscription::{NewCredential, Subscription};
pub use support::SupportTicket;
pub use user::User;
