use teloxide::prelude::*;
use tracing::{error, info, warn};

use crate::models::plan::PlanKind;
use crate::state::AppState;

/// Handles privileged traffic. Returns false when the message is not
/// admin-shaped so it falls through to the regular user flow (admins
/// buy and open tickets like everyone else).
///
/// The caller has already checked the sender against the admin list;
/// nothing below runs for ordinary users.
pub async fn handle_admin_message(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    text: &str,
) -> bool {
    let mut parts = text.split_whitespace();
    match parts.next() {
        Some("/inf") => {
            grant_permanent(bot, msg, state, parts.next()).await;
            return true;
        }
        Some("/refund") => {
            let args: Vec<&str> = parts.collect();
            run_refund(bot, msg, state, &args).await;
            return true;
        }
        _ => {}
    }

    // Replies to relayed support messages carry the 8-digit fake id of
    // the original sender; that is the only routing key admins see.
    if let Some(fake_id) = msg
        .reply_to_message()
        .and_then(|r| r.text())
        .and_then(extract_fake_id)
    {
        if text.trim() == "/close" {
            close_ticket(bot, msg, state, fake_id).await;
        } else {
            route_reply(bot, msg, state, fake_id, text).await;
        }
        return true;
    }

    false
}

/// Pulls the first standalone 8-digit number out of a relayed message.
fn extract_fake_id(text: &str) -> Option<i64> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|s| s.len() == 8)
        .find_map(|s| s.parse().ok())
}

async fn grant_permanent(bot: &Bot, msg: &Message, state: &AppState, arg: Option<&str>) {
    let Some(fake_id) = arg.and_then(|s| s.parse::<i64>().ok()) else {
        let _ = bot.send_message(msg.chat.id, "Usage: /inf FAKE_ID").await;
        return;
    };

    let user = match state.users.get_by_fake_id(fake_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            let _ = bot
                .send_message(msg.chat.id, format!("❌ No user with fake id {fake_id}"))
                .await;
            return;
        }
        Err(e) => {
            error!("User lookup failed for /inf {}: {:#}", fake_id, e);
            let _ = bot
                .send_message(msg.chat.id, format!("❌ Lookup failed: {e:#}"))
                .await;
            return;
        }
    };

    match state.provision.provision(&user, PlanKind::Permanent, None).await {
        Ok(sub) => {
            info!("Permanent grant issued to fake_id={}", fake_id);
            if let Some(real_id) = state.identity.resolve(fake_id) {
                let _ = bot
                    .send_message(
                        ChatId(real_id),
                        format!(
                            "✅ Your permanent access is ready. Import this link into your client:\n\n{}",
                            sub.xui_config
                        ),
                    )
                    .await;
            }
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!("✅ Permanent grant for {fake_id}:\n\n{}", sub.xui_config),
                )
                .await;
        }
        Err(e) => {
            let _ = bot.send_message(msg.chat.id, format!("❌ {e}")).await;
        }
    }
}

async fn run_refund(bot: &Bot, msg: &Message, state: &AppState, args: &[&str]) {
    let parsed = match args {
        [fake, real, charge] => fake
            .parse::<i64>()
            .ok()
            .zip(real.parse::<i64>().ok())
            .map(|(f, r)| (f, r, *charge)),
        _ => None,
    };
    let Some((fake_id, real_id, charge_id)) = parsed else {
        let _ = bot
            .send_message(msg.chat.id, "Usage: /refund FAKE_ID REAL_ID CHARGE_ID")
            .await;
        return;
    };

    // Every failure surfaces the underlying reason verbatim so the
    // operator knows which step to fix before re-running.
    match state.refund.refund(fake_id, real_id, charge_id).await {
        Ok(()) => {
            let _ = bot
                .send_message(msg.chat.id, format!("✅ Refund completed for {fake_id}."))
                .await;
        }
        Err(e) => {
            let _ = bot.send_message(msg.chat.id, format!("❌ {e}")).await;
        }
    }
}

async fn close_ticket(bot: &Bot, msg: &Message, state: &AppState, fake_id: i64) {
    let user = match state.users.get_by_fake_id(fake_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            let _ = bot
                .send_message(msg.chat.id, format!("❌ No user with fake id {fake_id}"))
                .await;
            return;
        }
        Err(e) => {
            error!("User lookup failed for /close {}: {:#}", fake_id, e);
            return;
        }
    };

    match state.support.close_all(user.id).await {
        Ok(closed) => {
            state.identity.forget_support(fake_id);
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!("✅ Closed {closed} ticket(s) for {fake_id}."),
                )
                .await;
        }
        Err(e) => {
            error!("Ticket close failed for {}: {:#}", fake_id, e);
            let _ = bot
                .send_message(msg.chat.id, format!("❌ Close failed: {e:#}"))
                .await;
        }
    }
}

async fn route_reply(bot: &Bot, msg: &Message, state: &AppState, fake_id: i64, text: &str) {
    match state.identity.resolve(fake_id) {
        Some(real_id) => {
            let _ = bot
                .send_message(ChatId(real_id), format!("💬 Support:\n{text}"))
                .await;
        }
        None => {
            // An unresolvable mapping means the sweep already ran or the
            // process restarted. The message is dropped, never guessed at.
            warn!("No identity mapping for fake_id={}; reply dropped", fake_id);
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!("⚠️ No identity mapping for {fake_id}; message not delivered."),
                )
                .await;
        }
    }
}
