use teloxide::prelude::*;
use teloxide::types::{PreCheckoutQuery, SuccessfulPayment};
use tracing::{error, info};

use crate::bot::handlers::notify_admins;
use crate::identity::Namespace;
use crate::models::tariff::tariff_for_payload;
use crate::state::AppState;

pub async fn pre_checkout_handler(
    bot: Bot,
    q: PreCheckoutQuery,
) -> Result<(), teloxide::RequestError> {
    // Payload validation happens after capture; declining here would
    // only hide broken invoices instead of surfacing them.
    bot.answer_pre_checkout_query(q.id, true).await?;
    Ok(())
}

/// Charge is already captured when this runs. Every outcome must be
/// visible: either the user gets their descriptor, or both the user and
/// the admins learn that activation failed.
pub async fn handle_successful_payment(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    paid: &SuccessfulPayment,
) {
    let tg_id = msg.chat.id.0;
    let charge_id = &paid.telegram_payment_charge_id;

    let user = match state.users.get_or_create(tg_id).await {
        Ok(u) => u,
        Err(e) => {
            error!("User bootstrap failed after payment {}: {:#}", charge_id, e);
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "❌ Payment received but activation failed. Please contact support.",
                )
                .await;
            notify_admins(
                bot,
                state,
                &format!("⚠️ Paid charge {charge_id} could not be matched to a user: {e:#}"),
            )
            .await;
            return;
        }
    };
    state.identity.remember(user.fake_id, tg_id, Namespace::Customer);

    let Some(tariff) = tariff_for_payload(&paid.invoice_payload) else {
        error!(
            "Paid invoice with unknown payload {:?} (fake_id={}, charge={})",
            paid.invoice_payload, user.fake_id, charge_id
        );
        let _ = bot
            .send_message(
                msg.chat.id,
                "❌ Payment received but activation failed. Please contact support.",
            )
            .await;
        notify_admins(
            bot,
            state,
            &format!(
                "⚠️ Unknown invoice payload {:?} from {} (charge {})",
                paid.invoice_payload, user.fake_id, charge_id
            ),
        )
        .await;
        return;
    };

    info!(
        "Stars payment: {} XTR for {:?} (fake_id={})",
        paid.total_amount, tariff.payload, user.fake_id
    );

    match state
        .provision
        .provision(&user, tariff.plan(), Some(&charge_id.0))
        .await
    {
        Ok(sub) => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!(
                        "✅ Your {} access is ready. Import this link into your client:\n\n{}",
                        tariff.title, sub.xui_config
                    ),
                )
                .await;
            notify_admins(
                bot,
                state,
                &format!(
                    "💸 {} purchase by {} (charge {})",
                    tariff.title, user.fake_id, charge_id
                ),
            )
            .await;
        }
        Err(e) => {
            error!(
                "Provisioning failed for fake_id={} charge={}: {}",
                user.fake_id, charge_id, e
            );
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "❌ Payment received but activation failed. Please contact support.",
                )
                .await;
            notify_admins(
                bot,
                state,
                &format!(
                    "⚠️ Provisioning failed for {} (charge {}): {}",
                    user.fake_id, charge_id, e
                ),
            )
            .await;
        }
    }
}
