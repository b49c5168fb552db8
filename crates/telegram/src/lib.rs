//! Telegram transport for the classification bot.
//!
//! Long-polls the Bot API with teloxide, maps messages onto inbound image
//! events, downloads attachments and sends replies.

pub mod bot;
pub mod error;
pub mod handlers;
pub mod outbound;

pub use {
    bot::{ConnectedBot, connect, run_polling},
    error::{Error, Result},
    handlers::{HandlerContext, TelegramFileFetcher},
    outbound::TelegramOutbound,
};
