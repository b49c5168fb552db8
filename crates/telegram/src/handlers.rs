use std::sync::Arc;

use {
    async_trait::async_trait,
    teloxide::{
        net::Download,
        prelude::*,
        types::{MediaKind, MessageKind},
    },
    tracing::{debug, info},
};

use {
    lungscan_auto_reply::Dispatcher,
    lungscan_channels::{
        Attachment, Delivery, DocumentRef, Error as ChannelError, FileFetcher, InboundImageEvent,
        PhotoVariant,
    },
};

use crate::{Result, outbound::TelegramOutbound};

pub const START_TEXT: &str = "Welcome to Classification bot, please talk to me!";
pub const HELP_TEXT: &str = "Send me your Xray image";

/// Bot commands answered without touching the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
}

impl Command {
    /// Command menu entries registered at startup.
    pub const MENU: [(&'static str, &'static str); 2] = [
        ("start", "Start the bot"),
        ("help", "How to use the bot"),
    ];

    #[must_use]
    pub fn reply_text(self) -> &'static str {
        match self {
            Self::Start => START_TEXT,
            Self::Help => HELP_TEXT,
        }
    }
}

/// Parse `/start`, `/help` and their `@botname` forms. Commands addressed to
/// another bot are not ours.
#[must_use]
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let cmd = text.trim().strip_prefix('/')?.split_whitespace().next()?;
    let (name, target) = match cmd.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (cmd, None),
    };
    if let (Some(target), Some(me)) = (target, bot_username)
        && !target.eq_ignore_ascii_case(me)
    {
        return None;
    }
    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        _ => None,
    }
}

fn message_text(msg: &Message) -> Option<&str> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(t.text.as_str()),
            _ => None,
        },
        _ => None,
    }
}

/// Photo or document carried by the message, if any.
fn message_attachment(msg: &Message) -> Option<Attachment> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Photo(p) => Some(Attachment::Photo(
                p.photo
                    .iter()
                    .map(|ps| PhotoVariant {
                        file_id: ps.file.id.clone(),
                        width: ps.width,
                        height: ps.height,
                    })
                    .collect(),
            )),
            MediaKind::Document(d) => Some(Attachment::Document(DocumentRef {
                file_id: d.document.file.id.clone(),
                mime_type: d.document.mime_type.as_ref().map(ToString::to_string),
                file_name: d.document.file_name.clone(),
            })),
            _ => None,
        },
        _ => None,
    }
}

/// Map a Telegram message onto the transport-agnostic event.
#[must_use]
pub fn to_event(msg: &Message) -> InboundImageEvent {
    let attachment = message_attachment(msg);
    let delivery = match msg.media_group_id() {
        Some(group) => Delivery::GroupItem {
            media_group_id: group.to_string(),
            attachment,
        },
        None => attachment.map_or(Delivery::None, Delivery::from),
    };
    InboundImageEvent {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        delivery,
    }
}

/// Everything a message handler needs, shared by all in-flight updates.
pub struct HandlerContext {
    pub dispatcher: Dispatcher,
    pub outbound: Arc<TelegramOutbound>,
    pub bot_username: Option<String>,
}

/// Handle one inbound message: answer a command or run the classifier.
pub async fn handle_message(msg: Message, ctx: &HandlerContext) -> Result<()> {
    if let Some(command) =
        message_text(&msg).and_then(|text| parse_command(text, ctx.bot_username.as_deref()))
    {
        info!(chat_id = msg.chat.id.0, ?command, "telegram command");
        ctx.outbound
            .send_text(msg.chat.id.0, command.reply_text())
            .await?;
        return Ok(());
    }

    let event = to_event(&msg);
    debug!(
        chat_id = event.chat_id,
        message_id = event.message_id,
        shape = ?event.delivery.shape(),
        "dispatching telegram message"
    );
    ctx.dispatcher.handle(&event).await;
    Ok(())
}

/// Downloads attachments through the Bot API file endpoint.
#[derive(Clone)]
pub struct TelegramFileFetcher {
    bot: Bot,
}

impl TelegramFileFetcher {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl FileFetcher for TelegramFileFetcher {
    async fn fetch(&self, file_id: &str) -> lungscan_channels::Result<Vec<u8>> {
        download_telegram_file(&self.bot, file_id)
            .await
            .map_err(|e| ChannelError::fetch_failed(file_id, e))
    }
}

/// Download a file from Telegram by file ID.
async fn download_telegram_file(bot: &Bot, file_id: &str) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;
    let mut data = Vec::new();
    bot.download_file(&file.path, &mut data).await?;
    debug!(file_id, bytes = data.len(), "downloaded telegram file");
    Ok(data)
}
