use teloxide::prelude::*;

use crate::state::AppState;

pub mod admin;
pub mod command;
pub mod payment;
pub mod support;

/// Fans a notification out to every configured admin chat. Delivery is
/// best effort; a blocked admin must not fail the triggering flow.
pub(crate) async fn notify_admins(bot: &Bot, state: &AppState, text: &str) {
    for admin_id in &state.settings.admins {
        let _ = bot.send_message(ChatId(*admin_id), text).await;
    }
}
