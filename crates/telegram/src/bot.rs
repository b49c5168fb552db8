use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio::task::JoinSet,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use lungscan_config::TelegramConfig;

use crate::{
    Error, Result,
    handlers::{self, Command, HandlerContext},
};

/// Pause after a failed `getUpdates` before polling again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// A bot whose credentials have been verified.
pub struct ConnectedBot {
    pub bot: Bot,
    pub username: Option<String>,
}

/// Build the bot client, verify the token, clear any webhook so long
/// polling works and register the command menu.
pub async fn connect(config: &TelegramConfig) -> Result<ConnectedBot> {
    // Client timeout must outlast the long-poll timeout.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(config.poll_timeout_secs) + 15))
        .build()
        .map_err(Error::HttpClient)?;
    let bot = Bot::with_client(config.token.expose_secret(), client);

    let me = bot.get_me().await?;
    let username = me.username.clone();

    bot.delete_webhook().send().await?;

    if config.register_commands {
        let commands: Vec<_> = Command::MENU
            .iter()
            .map(|(name, description)| BotCommand::new(*name, *description))
            .collect();
        if let Err(e) = bot.set_my_commands(commands).await {
            warn!(error = %e, "failed to register bot commands");
        }
    }

    info!(username = ?username, "telegram bot connected (webhook cleared)");
    Ok(ConnectedBot { bot, username })
}

/// Long-poll for updates until `cancel` fires. Each message is handled in
/// its own task; in-flight tasks are awaited before returning.
pub async fn run_polling(
    bot: Bot,
    poll_timeout_secs: u32,
    ctx: Arc<HandlerContext>,
    cancel: CancellationToken,
) -> Result<()> {
    info!("starting telegram polling loop");
    let mut offset: i32 = 0;
    let mut tasks = JoinSet::new();

    let outcome = loop {
        while tasks.try_join_next().is_some() {}

        let request = bot
            .get_updates()
            .offset(offset)
            .timeout(poll_timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message])
            .send();

        let result = tokio::select! {
            () = cancel.cancelled() => {
                info!("telegram polling stopped");
                break Ok(());
            },
            result = request => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    match update.kind {
                        UpdateKind::Message(msg) => {
                            let ctx = Arc::clone(&ctx);
                            tasks.spawn(async move {
                                let chat_id = msg.chat.id.0;
                                if let Err(e) = handlers::handle_message(msg, &ctx).await {
                                    error!(chat_id, error = %e, "error handling telegram message");
                                }
                            });
                        },
                        other => {
                            debug!("ignoring non-message update: {other:?}");
                        },
                    }
                }
            },
            Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                break Err(Error::PollingConflict);
            },
            Err(e) => {
                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    () = cancel.cancelled() => break Ok(()),
                    () = tokio::time::sleep(POLL_RETRY_DELAY) => {},
                }
            },
        }
    };

    if !tasks.is_empty() {
        info!(in_flight = tasks.len(), "waiting for in-flight messages");
    }
    while tasks.join_next().await.is_some() {}
    outcome
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{TelegramFileFetcher, TelegramOutbound},
        axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::any},
        lungscan_auto_reply::Dispatcher,
        lungscan_config::ReplyStyle,
        lungscan_inference::{LocalClassifier, ProbabilityModel},
        lungscan_media::{Normalization, NormalizedTensor},
        serde_json::json,
    };

    struct EvenModel;

    impl ProbabilityModel for EvenModel {
        fn predict(&self, _tensor: &NormalizedTensor) -> lungscan_inference::Result<Vec<f32>> {
            Ok(vec![0.2; 5])
        }
    }

    async fn conflict() -> impl IntoResponse {
        (
            StatusCode::CONFLICT,
            Json(json!({
                "ok": false,
                "error_code": 409,
                "description": "Conflict: terminated by other getUpdates request; make sure that only one bot instance is running",
            })),
        )
    }

    async fn bot_against(app: Router) -> Bot {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let api_url = reqwest::Url::parse(&format!("http://{addr}/")).unwrap();
        Bot::new("test-token").set_api_url(api_url)
    }

    fn context(bot: &Bot) -> Arc<HandlerContext> {
        let outbound = Arc::new(TelegramOutbound::new(bot.clone()));
        let backend = Arc::new(LocalClassifier::new(
            Arc::new(EvenModel),
            Normalization::Raw,
            ReplyStyle::Summary,
        ));
        Arc::new(HandlerContext {
            dispatcher: Dispatcher::new(
                backend,
                Arc::new(TelegramFileFetcher::new(bot.clone())),
                outbound.clone(),
            ),
            outbound,
            bot_username: None,
        })
    }

    #[tokio::test]
    async fn competing_poller_stops_the_loop() {
        let bot = bot_against(Router::new().route("/{*path}", any(conflict))).await;

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            run_polling(bot.clone(), 1, context(&bot), CancellationToken::new()),
        )
        .await
        .expect("conflict must end polling without retrying");

        assert!(matches!(result, Err(Error::PollingConflict)), "{result:?}");
    }

    #[tokio::test]
    async fn cancelled_loop_returns_ok() {
        let bot = bot_against(Router::new().route("/{*path}", any(conflict))).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = run_polling(bot.clone(), 1, context(&bot), cancel).await;

        assert!(result.is_ok());
    }
}
