use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use super::client::TelegramClient;
use super::types::{Inbound, SendMessage};
use crate::session_actor::SessionRegistryClient;

const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Long-polls Telegram and feeds every update to the session registry until
/// `shutdown` flips to true.
///
/// Updates are dispatched in the order received, which keeps each chat's
/// events in order. Replies are delivered from spawned tasks so a slow send
/// never holds up the next poll.
#[instrument(name = "telegram_poller", skip_all)]
pub async fn run_poller(
    telegram: TelegramClient,
    registry: SessionRegistryClient,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Telegram poller starting");
    let mut offset = 0;

    loop {
        let updates = tokio::select! {
            _ = shutdown.changed() => break,
            result = telegram.get_updates(offset) => result,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed, retrying");
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => continue,
                }
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(inbound) = update.into_inbound() else {
                debug!("Ignoring update without text or callback");
                continue;
            };
            if !dispatch(&telegram, &registry, inbound).await {
                error!("Session registry is gone, stopping poller");
                return;
            }
        }
    }

    info!("Telegram poller stopped");
}

/// Returns false when the registry can no longer take events.
async fn dispatch(telegram: &TelegramClient, registry: &SessionRegistryClient, inbound: Inbound) -> bool {
    let Inbound {
        chat_id,
        event,
        callback_id,
    } = inbound;

    let pending = match registry.dispatch(chat_id, event).await {
        Ok(pending) => pending,
        Err(e) => {
            error!(chat_id, error = %e, "Dispatch failed");
            return false;
        }
    };

    let telegram = telegram.clone();
    tokio::spawn(async move {
        if let Some(callback_id) = callback_id {
            if let Err(e) = telegram.answer_callback_query(&callback_id).await {
                warn!(chat_id, error = %e, "answerCallbackQuery failed");
            }
        }

        let reply = match pending.await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                error!(chat_id, error = %e, "Session failed to answer");
                return;
            }
            Err(_) => {
                error!(chat_id, "Session dropped the request");
                return;
            }
        };

        if let Err(e) = telegram.send_message(&SendMessage::from_reply(chat_id, reply)).await {
            error!(chat_id, error = %e, "sendMessage failed");
        }
    });

    true
}
