use std::sync::Arc;

use {
    lungscan_channels::{FileFetcher, InboundImageEvent, ReplyMessage, ReplySender, extract_image},
    lungscan_inference::{ClassifierBackend, ClassifierInput, Diagnosis, InputKind, format_reply},
    lungscan_media::image_ops,
    tracing::{debug, error, info, warn},
};

/// Pipeline step an event was in when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Preprocessing,
    Classifying,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Extracting => "extracting",
            Self::Preprocessing => "preprocessing",
            Self::Classifying => "classifying",
        })
    }
}

/// Why an event did not get a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotAnImage,
    UnsupportedFormat,
    InferenceError,
}

impl Rejection {
    /// Text sent back to the user.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::NotAnImage => "Please send a valid image.",
            Self::UnsupportedFormat => "Please send a valid image in one of the supported formats.",
            Self::InferenceError => "Error in classification. Please try again later.",
        }
    }
}

/// Result of handling one event. A reply has been attempted in every case.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Classified(Diagnosis),
    Rejected { stage: Stage, rejection: Rejection },
}

impl Outcome {
    #[must_use]
    pub fn is_classified(&self) -> bool {
        matches!(self, Self::Classified(_))
    }
}

struct Stopped {
    stage: Stage,
    rejection: Rejection,
    cause: String,
}

impl Stopped {
    fn new(stage: Stage, rejection: Rejection, cause: impl std::fmt::Display) -> Self {
        Self {
            stage,
            rejection,
            cause: cause.to_string(),
        }
    }
}

/// Runs the pipeline for each inbound event and answers it exactly once.
///
/// Holds only shared, immutable collaborators, so one instance serves any
/// number of concurrent events.
pub struct Dispatcher {
    backend: Arc<dyn ClassifierBackend>,
    fetcher: Arc<dyn FileFetcher>,
    sender: Arc<dyn ReplySender>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        backend: Arc<dyn ClassifierBackend>,
        fetcher: Arc<dyn FileFetcher>,
        sender: Arc<dyn ReplySender>,
    ) -> Self {
        Self {
            backend,
            fetcher,
            sender,
        }
    }

    /// Process `event` and send the reply. Send failures are logged, never
    /// retried.
    pub async fn handle(&self, event: &InboundImageEvent) -> Outcome {
        let (outcome, text) = match self.run(event).await {
            Ok(diagnosis) => {
                let text = format_reply(&diagnosis, self.backend.reply_style());
                (Outcome::Classified(diagnosis), text)
            },
            Err(stopped) => {
                warn!(
                    chat_id = event.chat_id,
                    message_id = event.message_id,
                    stage = %stopped.stage,
                    rejection = ?stopped.rejection,
                    error = %stopped.cause,
                    "image rejected"
                );
                let text = stopped.rejection.user_message().to_string();
                (
                    Outcome::Rejected {
                        stage: stopped.stage,
                        rejection: stopped.rejection,
                    },
                    text,
                )
            },
        };

        let reply = ReplyMessage::to(event, text);
        match self.sender.send_reply(&reply).await {
            Ok(()) => info!(
                chat_id = event.chat_id,
                message_id = event.message_id,
                classified = outcome.is_classified(),
                "reply sent"
            ),
            Err(e) => error!(
                chat_id = event.chat_id,
                message_id = event.message_id,
                error = %e,
                "failed to send reply"
            ),
        }
        outcome
    }

    async fn run(&self, event: &InboundImageEvent) -> Result<Diagnosis, Stopped> {
        if !event.delivery.has_attachment() {
            return Err(Stopped::new(
                Stage::Extracting,
                Rejection::NotAnImage,
                "no photo or document",
            ));
        }

        let extracted = extract_image(&event.delivery, self.fetcher.as_ref())
            .await
            .map_err(|e| {
                let rejection = match e {
                    lungscan_channels::Error::NotAnImage => Rejection::NotAnImage,
                    _ => Rejection::InferenceError,
                };
                Stopped::new(Stage::Extracting, rejection, e)
            })?;
        debug!(
            chat_id = event.chat_id,
            shape = %extracted.shape,
            bytes = extracted.bytes.len(),
            "image extracted"
        );

        // Decode and resize in blocking context; the raw bytes and decoded
        // image are dropped there.
        let kind = self.backend.input_kind();
        let input = tokio::task::spawn_blocking(move || prepare_input(&extracted.bytes, kind))
            .await
            .map_err(|e| Stopped::new(Stage::Preprocessing, Rejection::InferenceError, e))??;
        debug!(
            chat_id = event.chat_id,
            backend = self.backend.id(),
            input = input.kind_name(),
            "image prepared"
        );

        // A panicking backend must not take the reply down with it.
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move { backend.classify(input).await })
            .await
            .map_err(|e| Stopped::new(Stage::Classifying, Rejection::InferenceError, e))?
            .map_err(|e| Stopped::new(Stage::Classifying, Rejection::InferenceError, e))
    }
}

fn prepare_input(bytes: &[u8], kind: InputKind) -> Result<ClassifierInput, Stopped> {
    let image = image_ops::decode_image(bytes).map_err(|e| {
        let rejection = if e.is_unsupported_format() {
            Rejection::UnsupportedFormat
        } else {
            Rejection::InferenceError
        };
        Stopped::new(Stage::Preprocessing, rejection, e)
    })?;
    kind.prepare(&image)
        .map_err(|e| Stopped::new(Stage::Preprocessing, Rejection::InferenceError, e))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        lungscan_channels::{Attachment, Delivery, DocumentRef, PhotoVariant},
        lungscan_config::ReplyStyle,
        lungscan_inference::{Label, LocalClassifier, ProbabilityModel, RemoteClassifier},
        lungscan_media::{DynamicImage, Normalization, NormalizedTensor},
        std::{
            collections::HashMap,
            sync::{
                Mutex,
                atomic::{AtomicUsize, Ordering},
            },
            time::Duration,
        },
    };

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct Failure(&'static str);

    #[derive(Default)]
    struct MapFetcher {
        files: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl MapFetcher {
        fn with(file_id: &str, bytes: Vec<u8>) -> Self {
            Self {
                files: HashMap::from([(file_id.to_string(), bytes)]),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FileFetcher for MapFetcher {
        async fn fetch(&self, file_id: &str) -> lungscan_channels::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.files
                .get(file_id)
                .cloned()
                .ok_or_else(|| lungscan_channels::Error::fetch_failed(file_id, Failure("404")))
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<ReplyMessage>>,
        fail: bool,
    }

    impl RecordingSender {
        fn failing() -> Self {
            Self {
                sent: Mutex::default(),
                fail: true,
            }
        }

        fn sent(&self) -> Vec<ReplyMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReplySender for RecordingSender {
        async fn send_reply(&self, reply: &ReplyMessage) -> lungscan_channels::Result<()> {
            self.sent.lock().unwrap().push(reply.clone());
            if self.fail {
                return Err(lungscan_channels::Error::send_failed(
                    reply.chat_id,
                    Failure("blocked by user"),
                ));
            }
            Ok(())
        }
    }

    /// Answers with a fixed label and remembers which input kinds it saw.
    struct StubBackend {
        kind: InputKind,
        seen: Mutex<Vec<&'static str>>,
    }

    impl StubBackend {
        fn new(kind: InputKind) -> Self {
            Self {
                kind,
                seen: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl ClassifierBackend for StubBackend {
        fn id(&self) -> &'static str {
            "stub"
        }

        fn input_kind(&self) -> InputKind {
            self.kind
        }

        fn reply_style(&self) -> ReplyStyle {
            ReplyStyle::Summary
        }

        async fn classify(&self, input: ClassifierInput) -> lungscan_inference::Result<Diagnosis> {
            self.seen.lock().unwrap().push(input.kind_name());
            Ok(Diagnosis::TopLabel(Label::Normal))
        }
    }

    struct FixedModel(Vec<f32>);

    impl ProbabilityModel for FixedModel {
        fn predict(&self, _tensor: &NormalizedTensor) -> lungscan_inference::Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct PanickingModel;

    impl ProbabilityModel for PanickingModel {
        fn predict(&self, _tensor: &NormalizedTensor) -> lungscan_inference::Result<Vec<f32>> {
            panic!("model crashed");
        }
    }

    /// Panics inside `classify` itself, outside any blocking task.
    struct PanickingBackend;

    #[async_trait]
    impl ClassifierBackend for PanickingBackend {
        fn id(&self) -> &'static str {
            "panicking"
        }

        fn input_kind(&self) -> InputKind {
            InputKind::Jpeg { quality: 80 }
        }

        fn reply_style(&self) -> ReplyStyle {
            ReplyStyle::Summary
        }

        async fn classify(&self, _input: ClassifierInput) -> lungscan_inference::Result<Diagnosis> {
            panic!("backend crashed");
        }
    }

    fn jpeg_bytes() -> Vec<u8> {
        image_ops::encode_jpeg(&DynamicImage::new_rgb8(64, 48), 90).unwrap()
    }

    fn event(delivery: Delivery) -> InboundImageEvent {
        InboundImageEvent {
            chat_id: 1001,
            message_id: 77,
            delivery,
        }
    }

    fn document(file_id: &str) -> Delivery {
        Delivery::Document(DocumentRef {
            file_id: file_id.into(),
            mime_type: Some("image/png".into()),
            file_name: Some("xray.png".into()),
        })
    }

    fn photo(file_id: &str) -> Delivery {
        Delivery::Photo(vec![
            PhotoVariant {
                file_id: "thumb".into(),
                width: 90,
                height: 90,
            },
            PhotoVariant {
                file_id: file_id.into(),
                width: 1280,
                height: 1280,
            },
        ])
    }

    struct Harness {
        fetcher: Arc<MapFetcher>,
        sender: Arc<RecordingSender>,
        dispatcher: Dispatcher,
    }

    fn harness(backend: Arc<dyn ClassifierBackend>, fetcher: MapFetcher) -> Harness {
        harness_with_sender(backend, fetcher, RecordingSender::default())
    }

    fn harness_with_sender(
        backend: Arc<dyn ClassifierBackend>,
        fetcher: MapFetcher,
        sender: RecordingSender,
    ) -> Harness {
        let fetcher = Arc::new(fetcher);
        let sender = Arc::new(sender);
        let dispatcher = Dispatcher::new(backend, fetcher.clone(), sender.clone());
        Harness {
            fetcher,
            sender,
            dispatcher,
        }
    }

    fn stub_tensor_backend() -> Arc<StubBackend> {
        Arc::new(StubBackend::new(InputKind::Tensor(Normalization::Raw)))
    }

    #[tokio::test]
    async fn invalid_document_gets_unsupported_format_reply() {
        let backend = stub_tensor_backend();
        let h = harness(
            backend.clone(),
            MapFetcher::with("doc", b"this is not an image".to_vec()),
        );

        let outcome = h.dispatcher.handle(&event(document("doc"))).await;

        assert_eq!(outcome, Outcome::Rejected {
            stage: Stage::Preprocessing,
            rejection: Rejection::UnsupportedFormat,
        });
        let sent = h.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].text,
            "Please send a valid image in one of the supported formats."
        );
        assert_eq!(sent[0].reply_to_message_id, 77);
        assert_eq!(sent[0].chat_id, 1001);
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn message_without_image_gets_not_an_image_reply() {
        let h = harness(stub_tensor_backend(), MapFetcher::default());

        let outcome = h.dispatcher.handle(&event(Delivery::None)).await;

        assert_eq!(outcome, Outcome::Rejected {
            stage: Stage::Extracting,
            rejection: Rejection::NotAnImage,
        });
        assert_eq!(h.sender.sent()[0].text, "Please send a valid image.");
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_group_item_is_rejected_without_fetching() {
        let h = harness(stub_tensor_backend(), MapFetcher::default());
        let delivery = Delivery::GroupItem {
            media_group_id: "album".into(),
            attachment: None,
        };

        let outcome = h.dispatcher.handle(&event(delivery)).await;

        assert!(matches!(outcome, Outcome::Rejected {
            rejection: Rejection::NotAnImage,
            ..
        }));
        assert_eq!(h.sender.sent().len(), 1);
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn group_document_is_classified() {
        let backend = stub_tensor_backend();
        let h = harness(backend.clone(), MapFetcher::with("d1", jpeg_bytes()));
        let delivery = Delivery::GroupItem {
            media_group_id: "album".into(),
            attachment: Some(Attachment::Document(DocumentRef {
                file_id: "d1".into(),
                mime_type: None,
                file_name: None,
            })),
        };

        let outcome = h.dispatcher.handle(&event(delivery)).await;

        assert!(outcome.is_classified());
        assert_eq!(
            h.sender.sent()[0].text,
            "I detect potential Normal in the X-ray."
        );
        assert_eq!(*backend.seen.lock().unwrap(), vec!["tensor"]);
    }

    #[tokio::test]
    async fn local_model_reply_is_ranked() {
        let backend = Arc::new(LocalClassifier::new(
            Arc::new(FixedModel(vec![0.7, 0.1, 0.1, 0.05, 0.05])),
            Normalization::Raw,
            ReplyStyle::Ranked,
        ));
        let h = harness(backend, MapFetcher::with("big", jpeg_bytes()));

        let outcome = h.dispatcher.handle(&event(photo("big"))).await;

        let Outcome::Classified(diagnosis) = outcome else {
            panic!("expected a classification");
        };
        assert_eq!(diagnosis.label(), Label::Pneumonia);
        let text = &h.sender.sent()[0].text;
        assert!(text.starts_with("Pneumonia: 0.70\n"), "{text}");
        assert_eq!(text.lines().count(), 5);
    }

    #[tokio::test]
    async fn remote_server_error_gets_inference_error_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/classify")
            .with_status(500)
            .create_async()
            .await;
        let backend = Arc::new(
            RemoteClassifier::new(
                format!("{}/classify", server.url()),
                Duration::from_secs(5),
                90,
            )
            .unwrap(),
        );
        let h = harness(backend, MapFetcher::with("big", jpeg_bytes()));

        let outcome = h.dispatcher.handle(&event(photo("big"))).await;

        assert_eq!(outcome, Outcome::Rejected {
            stage: Stage::Classifying,
            rejection: Rejection::InferenceError,
        });
        assert_eq!(
            h.sender.sent()[0].text,
            "Error in classification. Please try again later."
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn remote_backend_receives_jpeg() {
        let backend = Arc::new(StubBackend::new(InputKind::Jpeg { quality: 85 }));
        let h = harness(backend.clone(), MapFetcher::with("big", jpeg_bytes()));

        h.dispatcher.handle(&event(photo("big"))).await;

        assert_eq!(*backend.seen.lock().unwrap(), vec!["jpeg"]);
    }

    #[tokio::test]
    async fn fetch_failure_gets_inference_error_reply() {
        let h = harness(stub_tensor_backend(), MapFetcher::default());

        let outcome = h.dispatcher.handle(&event(photo("missing"))).await;

        assert_eq!(outcome, Outcome::Rejected {
            stage: Stage::Extracting,
            rejection: Rejection::InferenceError,
        });
        assert_eq!(
            h.sender.sent()[0].text,
            Rejection::InferenceError.user_message()
        );
    }

    #[tokio::test]
    async fn send_failure_does_not_change_outcome() {
        let h = harness_with_sender(
            stub_tensor_backend(),
            MapFetcher::with("big", jpeg_bytes()),
            RecordingSender::failing(),
        );

        let outcome = h.dispatcher.handle(&event(photo("big"))).await;

        assert!(outcome.is_classified());
        assert_eq!(h.sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn panicking_model_still_gets_inference_error_reply() {
        let backend = Arc::new(LocalClassifier::new(
            Arc::new(PanickingModel),
            Normalization::Raw,
            ReplyStyle::Ranked,
        ));
        let h = harness(backend, MapFetcher::with("big", jpeg_bytes()));

        let outcome = h.dispatcher.handle(&event(photo("big"))).await;

        assert_eq!(outcome, Outcome::Rejected {
            stage: Stage::Classifying,
            rejection: Rejection::InferenceError,
        });
        let sent = h.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].text,
            "Error in classification. Please try again later."
        );
        assert_eq!(sent[0].reply_to_message_id, 77);
    }

    #[tokio::test]
    async fn panicking_backend_still_gets_one_reply() {
        let h = harness(Arc::new(PanickingBackend), MapFetcher::with("big", jpeg_bytes()));

        let outcome = h.dispatcher.handle(&event(photo("big"))).await;

        assert_eq!(outcome, Outcome::Rejected {
            stage: Stage::Classifying,
            rejection: Rejection::InferenceError,
        });
        assert_eq!(h.sender.sent().len(), 1);
        assert_eq!(
            h.sender.sent()[0].text,
            Rejection::InferenceError.user_message()
        );
    }
}
