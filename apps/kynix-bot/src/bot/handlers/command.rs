use teloxide::prelude::*;
use tracing::debug;

use crate::bot::handlers::{admin, payment, support};
use crate::state::AppState;

/// Single message entry point. Payments are recognized first (they
/// carry no text), then admin traffic, then the regular user flow.
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    if let Some(paid) = msg.successful_payment() {
        payment::handle_successful_payment(&bot, &msg, &state, paid).await;
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };
    debug!("Message in chat {}", msg.chat.id);

    if state.settings.is_admin(msg.chat.id.0)
        && admin::handle_admin_message(&bot, &msg, &state, text).await
    {
        return Ok(());
    }

    support::handle_user_message(&bot, &msg, &state, text).await;
    Ok(())
}
