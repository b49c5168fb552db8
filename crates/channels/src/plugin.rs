use async_trait::async_trait;

use crate::{error::Result, event::ReplyMessage};

/// Resolve a transport file id to its bytes.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>>;
}

/// Send a reply back to the originating chat.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(&self, reply: &ReplyMessage) -> Result<()>;
}
