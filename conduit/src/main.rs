#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;
mod logging;

use std::io::Write;
use std::path::Path;

use args::{Args, Command, PromptArgs};
use clap::Parser;
use conduit_client::{Callbacks, ChatMessage, ChatRequest, GatewayClient, GatewayError, ModelParams};
use conduit_config::GatewayConfig;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init(args.log_filter.as_deref(), args.json_logs)?;

    let config = GatewayConfig::load(&args.config)?;
    let client = GatewayClient::new(&config)?;

    tracing::debug!(config_path = %args.config.display(), endpoint = %client.endpoint(), "client ready");

    // Ctrl-C aborts the in-flight call instead of killing the process
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling request");
            trigger.cancel();
        }
    });

    match args.command {
        Command::Chat { prompt, stream: false } => {
            let response = client.chat(&request(prompt, cancel)).await?;
            println!("{}", response.content);
        }
        Command::Chat { prompt, stream: true } => stream_chat(&client, request(prompt, cancel)).await?,
        Command::Json {
            prompt,
            schema,
            schema_name,
        } => {
            let schema = read_schema(&schema)?;
            let response = client
                .chat_json::<Value>(&request(prompt, cancel), &schema_name, schema)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response.parsed)?);
        }
    }

    Ok(())
}

/// Print deltas as they arrive
async fn stream_chat(client: &GatewayClient, request: ChatRequest) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    let mut failure: Option<GatewayError> = None;

    let mut callbacks = Callbacks::new(
        |delta: &str| {
            // A closed stdout is not worth aborting the call for
            let _ = stdout.write_all(delta.as_bytes()).and_then(|()| stdout.flush());
        },
        |response| {
            tracing::debug!(model = %response.model, chars = response.content.chars().count(), "stream finished");
        },
        |error| failure = Some(error),
    );
    client.chat_stream(&request, &mut callbacks).await;
    drop(callbacks);

    println!();
    failure.map_or(Ok(()), |e| Err(e.into()))
}

fn request(args: PromptArgs, cancel: CancellationToken) -> ChatRequest {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = args.system {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(args.prompt));

    let mut request = ChatRequest::new(messages).with_signal(cancel);
    if let Some(model) = args.model {
        request = request.with_model(model);
    }
    if args.temperature.is_some() || args.max_tokens.is_some() {
        request = request.with_params(ModelParams {
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            ..ModelParams::default()
        });
    }
    request
}

fn read_schema(path: &Path) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read schema file {}: {e}", path.display()))?;

    serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("schema file {} is not valid JSON: {e}", path.display()))
}
