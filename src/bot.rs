use crate::api_client::ApiClient;
use crate::config::Config;
use crate::handlers::Poller;
use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Recipient};
use tracing::{debug, error, info};

/// Outbound channel for chat notifications.
///
/// Delivery is best effort: implementations log their own failures and only
/// report whether the text actually went out.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> bool;
}

pub struct TelegramNotifier {
    bot: Bot,
    chat: Recipient,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: &str) -> Self {
        Self {
            bot,
            chat: chat_recipient(chat_id),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> bool {
        debug!("Попытка отправки сообщения в Telegram");
        match self.bot.send_message(self.chat.clone(), text).await {
            Ok(_) => {
                debug!("Бот отправил сообщение: {}", text);
                true
            }
            Err(e) => {
                error!("Бот не может отправить сообщение: {}", e);
                false
            }
        }
    }
}

/// Numeric ids address a chat directly, anything else is a channel username.
pub fn chat_recipient(chat_id: &str) -> Recipient {
    let chat_id = chat_id.trim();
    match chat_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat_id.to_string()),
    }
}

pub async fn start_bot(bot: Bot, config: Config) -> Result<()> {
    info!("Bot is starting...");

    let api_client = ApiClient::new(
        config.endpoint.clone(),
        config.practicum_token.clone(),
        config.request_timeout,
    )?;
    let notifier = TelegramNotifier::new(bot, &config.telegram_chat_id);

    let since = chrono::Utc::now().timestamp();
    info!(
        "Polling {} every {} seconds, starting from {}",
        config.endpoint,
        config.retry_period.as_secs(),
        since
    );

    let mut poller = Poller::new(api_client, notifier, since);
    poller.run(config.retry_period).await;

    Ok(())
}
