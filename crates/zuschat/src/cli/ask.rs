//! One-shot backend commands: `ask`, `health` and `stats`.
use anyhow::{Error, Result, bail};
use zuschat_core::api::ApiClient;
use zuschat_core::commands::CommandRouter;
use zuschat_core::message::ChatMessage;

use crate::cli::ux::{ChatMessageType, WaitSpinner, render_message, style_chat_text};

/// Sends a single question without a session and returns the reply as a message.
async fn ask(api: &ApiClient, question: &str) -> Result<ChatMessage> {
    let reply = api
        .send_chat_message(question, None)
        .await
        .into_result()
        .map_err(Error::msg)?;
    Ok(reply.to_message())
}

async fn health_report(api: &ApiClient) -> Result<String> {
    let status = api
        .check_health()
        .await
        .into_result()
        .map_err(Error::msg)?;
    Ok(serde_json::to_string_pretty(&status)?)
}

async fn stats_report(api: &ApiClient, router: &CommandRouter) -> Result<String> {
    let stats = api.get_stats().await.into_result().map_err(Error::msg)?;
    Ok(router.stats_text(Some(&stats)))
}

/// Executes the ask command. Nothing is persisted.
pub async fn execute(api: &ApiClient, question: Vec<String>) -> Result<()> {
    let question = question.join(" ");
    let question = question.trim();
    if question.is_empty() {
        bail!("Nothing to ask, pass a question.");
    }

    let spinner = WaitSpinner::new("Thinking...");
    let reply = ask(api, question).await;
    spinner.clear();

    println!("{}", render_message(&reply?));
    Ok(())
}

pub async fn health(api: &ApiClient) -> Result<()> {
    let report = health_report(api).await?;
    eprintln!(
        "{}",
        style_chat_text(
            &format!("Backend at {} is up", api.base_url()),
            ChatMessageType::Footer
        )
    );
    println!("{report}");
    Ok(())
}

pub async fn stats(api: &ApiClient) -> Result<()> {
    println!("{}", stats_report(api, &CommandRouter::new()).await?);
    Ok(())
}
