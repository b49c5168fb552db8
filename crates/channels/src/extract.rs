//! Image extraction: pick the file to download for an inbound message.
//!
//! Rules, first match wins:
//! 1. a photo: its largest (last) variant,
//! 2. a document: whatever was attached, the decoder validates it later,
//! 3. an album item: rules 1 and 2 applied to the item,
//! 4. anything else is not an image.

use tracing::debug;

use crate::{
    error::{Error, Result},
    event::{Attachment, Delivery, DeliveryShape, DocumentRef, PhotoVariant},
    plugin::FileFetcher,
};

/// Downloaded bytes of the selected file.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub bytes: Vec<u8>,
    pub shape: DeliveryShape,
    pub file_id: String,
}

fn largest_photo(variants: &[PhotoVariant]) -> Option<&str> {
    variants.last().map(|p| p.file_id.as_str())
}

fn document_file(doc: &DocumentRef) -> &str {
    &doc.file_id
}

/// File id to fetch and the shape it came in, without touching the network.
#[must_use]
pub fn select_file(delivery: &Delivery) -> Option<(&str, DeliveryShape)> {
    match delivery {
        Delivery::Photo(variants) => largest_photo(variants).map(|id| (id, DeliveryShape::Photo)),
        Delivery::Document(doc) => Some((document_file(doc), DeliveryShape::Document)),
        Delivery::GroupItem { attachment, .. } => {
            let id = match attachment.as_ref()? {
                Attachment::Photo(variants) => largest_photo(variants)?,
                Attachment::Document(doc) => document_file(doc),
            };
            Some((id, DeliveryShape::GroupMember))
        },
        Delivery::None => None,
    }
}

/// Select and download the image carried by `delivery`.
pub async fn extract_image(
    delivery: &Delivery,
    fetcher: &dyn FileFetcher,
) -> Result<ExtractedImage> {
    let (file_id, shape) = select_file(delivery).ok_or(Error::NotAnImage)?;
    debug!(file_id, %shape, "fetching image");
    let bytes = fetcher.fetch(file_id).await?;
    Ok(ExtractedImage {
        bytes,
        shape,
        file_id: file_id.to_string(),
    })
}
