use {
    async_trait::async_trait,
    teloxide::{
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatId, MessageId, ReplyParameters},
    },
    tracing::debug,
};

use lungscan_channels::{Error as ChannelError, ReplyMessage, ReplySender};

/// Sends plain-text replies quoting the originating message.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send a standalone message that does not quote anything.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> crate::Result<()> {
        let sent = self.bot.send_message(ChatId(chat_id), text).await?;
        debug!(chat_id, message_id = sent.id.0, "telegram message delivered");
        Ok(())
    }
}

#[async_trait]
impl ReplySender for TelegramOutbound {
    async fn send_reply(&self, reply: &ReplyMessage) -> lungscan_channels::Result<()> {
        let sent = self
            .bot
            .send_message(ChatId(reply.chat_id), reply.text.clone())
            .reply_parameters(reply_params(reply.reply_to_message_id))
            .await
            .map_err(|e| ChannelError::send_failed(reply.chat_id, e))?;
        debug!(
            chat_id = reply.chat_id,
            message_id = sent.id.0,
            reply_to = reply.reply_to_message_id,
            "telegram reply delivered"
        );
        Ok(())
    }
}

/// Quote `message_id`, still sending if it was deleted meanwhile.
fn reply_params(message_id: i32) -> ReplyParameters {
    ReplyParameters::new(MessageId(message_id)).allow_sending_without_reply()
}
