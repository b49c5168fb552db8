//! Transport-agnostic inbound event model, the traits a transport provides
//! (file download, reply delivery) and image extraction.

pub mod error;
pub mod event;
pub mod extract;
pub mod plugin;

pub use {
    error::{Error, Result},
    event::{
        Attachment, Delivery, DeliveryShape, DocumentRef, InboundImageEvent, PhotoVariant,
        ReplyMessage,
    },
    extract::{ExtractedImage, extract_image, select_file},
    plugin::{FileFetcher, ReplySender},
};
