//! Classification through an HTTP service.
//!
//! The image is posted as a multipart form with a single `xray_image` file
//! part. The service answers `{"classification": "<label>"}`.

use std::time::Duration;

use {
    async_trait::async_trait,
    lungscan_config::ReplyStyle,
    reqwest::{
        Client,
        multipart::{Form, Part},
    },
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::{
    backend::{ClassifierBackend, ClassifierInput, InputKind},
    error::{Error, Result},
    label::Label,
    result::Diagnosis,
};

/// Multipart field carrying the image.
pub const FIELD_NAME: &str = "xray_image";

const FILE_NAME: &str = "xray.jpg";
const MIME_TYPE: &str = "image/jpeg";

/// Most characters of an error body kept in [`Error::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    classification: String,
}

/// Backend delegating to a remote classification service.
#[derive(Debug, Clone)]
pub struct RemoteClassifier {
    client: Client,
    endpoint: String,
    timeout: Duration,
    jpeg_quality: u8,
}

impl RemoteClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, jpeg_quality: u8) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
            jpeg_quality,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Http(err)
        }
    }
}

#[async_trait]
impl ClassifierBackend for RemoteClassifier {
    fn id(&self) -> &'static str {
        "remote"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Jpeg {
            quality: self.jpeg_quality,
        }
    }

    fn reply_style(&self) -> ReplyStyle {
        ReplyStyle::Summary
    }

    async fn classify(&self, input: ClassifierInput) -> Result<Diagnosis> {
        let ClassifierInput::Jpeg(jpeg) = input else {
            return Err(Error::UnexpectedInput { expected: "jpeg" });
        };

        let part = Part::bytes(jpeg)
            .file_name(FILE_NAME)
            .mime_str(MIME_TYPE)?;
        let form = Form::new().part(FIELD_NAME, part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            warn!(status = status.as_u16(), endpoint = %self.endpoint, "classification service error");
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|e| self.map_transport(e))?;
        let parsed: ClassifyResponse =
            serde_json::from_slice(&body).map_err(Error::malformed_response)?;
        let label: Label = parsed.classification.parse()?;

        debug!(classification = %label, "remote classification");
        Ok(Diagnosis::TopLabel(label))
    }
}
