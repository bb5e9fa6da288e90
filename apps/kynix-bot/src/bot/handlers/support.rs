use teloxide::prelude::*;
use teloxide::types::LabeledPrice;
use tracing::{error, info};

use crate::bot::handlers::notify_admins;
use crate::identity::Namespace;
use crate::models::tariff::TARIFFS;
use crate::state::AppState;

/// Regular user flow: purchase entry, support tickets, and relay of
/// messages while a ticket is open. Every sighting refreshes the
/// customer identity mapping so admin replies keep routing after the
/// periodic sweep.
pub async fn handle_user_message(bot: &Bot, msg: &Message, state: &AppState, text: &str) {
    let tg_id = msg.chat.id.0;

    let user = match state.users.get_or_create(tg_id).await {
        Ok(u) => u,
        Err(e) => {
            error!("User bootstrap failed for chat {}: {:#}", tg_id, e);
            let _ = bot
                .send_message(msg.chat.id, "❌ Something went wrong. Please try again later.")
                .await;
            return;
        }
    };
    state.identity.remember(user.fake_id, tg_id, Namespace::Customer);

    match text.trim() {
        "/start" => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "👋 Kynix VPN\n\n/buy — purchase access\n/support — talk to a human\n/close — close your support ticket",
                )
                .await;
        }
        "/buy" => {
            for tariff in TARIFFS {
                let _ = bot
                    .send_invoice(
                        msg.chat.id,
                        tariff.title,
                        format!("{} days of Kynix VPN access", tariff.days),
                        tariff.payload.to_string(),
                        "XTR",
                        vec![LabeledPrice {
                            label: tariff.title.to_string(),
                            amount: tariff.stars,
                        }],
                    )
                    .await;
            }
        }
        "/support" => {
            let (_, created) = match state.support.open(user.id).await {
                Ok(r) => r,
                Err(e) => {
                    error!("Ticket open failed for fake_id={}: {:#}", user.fake_id, e);
                    let _ = bot
                        .send_message(msg.chat.id, "❌ Something went wrong. Please try again later.")
                        .await;
                    return;
                }
            };
            state
                .identity
                .remember(user.fake_id, tg_id, Namespace::SupportSession);

            if created {
                info!("Support ticket opened by fake_id={}", user.fake_id);
                notify_admins(
                    bot,
                    state,
                    &format!("🆘 Support ticket opened by {}", user.fake_id),
                )
                .await;
            }
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "🆘 Describe your problem in the next message. Use /close when it is resolved.",
                )
                .await;
        }
        "/close" => {
            match state.support.close_all(user.id).await {
                Ok(0) => {
                    let _ = bot
                        .send_message(msg.chat.id, "You have no open support ticket.")
                        .await;
                }
                Ok(_) => {
                    state.identity.forget_support(user.fake_id);
                    info!("Support ticket closed by fake_id={}", user.fake_id);
                    let _ = bot
                        .send_message(msg.chat.id, "✅ Your support ticket is closed.")
                        .await;
                }
                Err(e) => {
                    error!("Ticket close failed for fake_id={}: {:#}", user.fake_id, e);
                    let _ = bot
                        .send_message(msg.chat.id, "❌ Something went wrong. Please try again later.")
                        .await;
                }
            }
        }
        other => {
            // Free text only goes anywhere while a ticket is open; it is
            // relayed under the fake id, never the real one.
            match state.support.find_open(user.id).await {
                Ok(Some(_)) => {
                    notify_admins(bot, state, &format!("📩 {}\n{}", user.fake_id, other)).await;
                    let _ = bot
                        .send_message(msg.chat.id, "✉️ Delivered to support.")
                        .await;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(
                        "Open-ticket lookup failed for fake_id={}: {:#}",
                        user.fake_id, e
                    );
                }
            }
        }
    }
}
