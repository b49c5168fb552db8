/// One resolution of a compressed photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoVariant {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// A file sent as an uncompressed attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub file_id: String,
    /// MIME type declared by the sender. Not trusted.
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

/// Content of a single message that may hold an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Resolutions of the same photo, smallest first.
    Photo(Vec<PhotoVariant>),
    Document(DocumentRef),
}

/// How the image arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Photo(Vec<PhotoVariant>),
    Document(DocumentRef),
    /// Member of a multi-item album; `attachment` is `None` when the item is
    /// neither a photo nor a document (e.g. a video).
    GroupItem {
        media_group_id: String,
        attachment: Option<Attachment>,
    },
    None,
}

impl Delivery {
    #[must_use]
    pub fn shape(&self) -> Option<DeliveryShape> {
        match self {
            Self::Photo(_) => Some(DeliveryShape::Photo),
            Self::Document(_) => Some(DeliveryShape::Document),
            Self::GroupItem { .. } => Some(DeliveryShape::GroupMember),
            Self::None => None,
        }
    }

    /// Whether there is anything to extract at all.
    #[must_use]
    pub fn has_attachment(&self) -> bool {
        match self {
            Self::Photo(_) | Self::Document(_) => true,
            Self::GroupItem { attachment, .. } => attachment.is_some(),
            Self::None => false,
        }
    }
}

impl From<Attachment> for Delivery {
    fn from(attachment: Attachment) -> Self {
        match attachment {
            Attachment::Photo(variants) => Self::Photo(variants),
            Attachment::Document(doc) => Self::Document(doc),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryShape {
    Photo,
    Document,
    GroupMember,
}

impl DeliveryShape {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
            Self::GroupMember => "group-member",
        }
    }
}

impl std::fmt::Display for DeliveryShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message that should be answered with a classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundImageEvent {
    pub chat_id: i64,
    pub message_id: i32,
    pub delivery: Delivery,
}

/// Text reply to a specific message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyMessage {
    pub chat_id: i64,
    pub reply_to_message_id: i32,
    pub text: String,
}

impl ReplyMessage {
    #[must_use]
    pub fn to(event: &InboundImageEvent, text: impl Into<String>) -> Self {
        Self {
            chat_id: event.chat_id,
            reply_to_message_id: event.message_id,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_item_without_attachment_has_nothing_to_extract() {
        let delivery = Delivery::GroupItem {
            media_group_id: "album-1".into(),
            attachment: None,
        };
        assert!(!delivery.has_attachment());
        assert_eq!(delivery.shape(), Some(DeliveryShape::GroupMember));
        assert!(!Delivery::None.has_attachment());
        assert_eq!(Delivery::None.shape(), None);
    }

    #[test]
    fn reply_targets_originating_message() {
        let event = InboundImageEvent {
            chat_id: -100,
            message_id: 42,
            delivery: Delivery::None,
        };
        let reply = ReplyMessage::to(&event, "hi");
        assert_eq!(reply.chat_id, -100);
        assert_eq!(reply.reply_to_message_id, 42);
        assert_eq!(reply.text, "hi");
    }

    #[test]
    fn shape_names() {
        assert_eq!(DeliveryShape::GroupMember.to_string(), "group-member");
        assert_eq!(DeliveryShape::Photo.to_string(), "photo");
    }
}
