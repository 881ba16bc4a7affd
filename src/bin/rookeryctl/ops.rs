// Replay Tool Operations
// "The keeper may inspect every roost, but the manager tends them"

use std::fmt::Write as _;

use rookery::manager::{DlqManager, DlqStats};
use rookery::message::DlqMessage;

pub async fn handle_list(manager: &DlqManager, channel: Option<&str>) -> String {
    let messages = match channel {
        Some(channel) => manager.get_messages_by_channel(channel).await,
        None => manager.get_all_messages().await,
    };
    render_list(&messages, channel)
}

pub async fn handle_stats(manager: &DlqManager) -> String {
    render_stats(&manager.get_stats().await)
}

pub async fn handle_replay(manager: &DlqManager, message_id: &str) -> String {
    match manager.get_message(message_id).await {
        Some(message) => {
            let mut out = render_message(&message);
            out.push_str(REPLAY_FOOTNOTE);
            out
        }
        None => format!("Message not found: {message_id}\n"),
    }
}

pub async fn handle_replay_channel(manager: &DlqManager, channel: &str) -> String {
    let messages = manager.get_messages_by_channel(channel).await;
    if messages.is_empty() {
        return format!("No messages for channel: {channel}\n");
    }

    let mut out = format!("Messages on channel {channel} ({}):\n", messages.len());
    for message in &messages {
        out.push_str(&render_message(message));
    }
    out.push_str(REPLAY_FOOTNOTE);
    out
}

pub async fn handle_clear(manager: &DlqManager) -> String {
    let exhausted = manager.get_exhausted_messages().await;
    let retention_days = manager.config().retention_days;

    if exhausted.is_empty() {
        return "No exhausted messages.\n".to_string();
    }

    let mut out = format!("Exhausted messages ({}):\n", exhausted.len());
    for message in &exhausted {
        let _ = writeln!(
            out,
            "- id: {}, channel: {}, subscriber: {}, retries: {}/{}, last error: {}",
            message.id,
            message.channel,
            message.subscriber_id,
            message.retry_count,
            message.max_retries,
            message.error_message
        );
    }
    let _ = writeln!(
        out,
        "Nothing was deleted; exhausted messages are retained until the {retention_days}-day retention window expires."
    );
    out
}

const REPLAY_FOOTNOTE: &str = "No subscriber callback is wired into rookeryctl; showing current \
state only.\nReplay from the service side via DlqManager::retry_message or replay_all.\n";

fn render_list(messages: &[DlqMessage], channel: Option<&str>) -> String {
    if messages.is_empty() {
        return match channel {
            Some(channel) => format!("No messages for channel: {channel}\n"),
            None => "No messages in the dead letter queue.\n".to_string(),
        };
    }

    let mut out = format!("Dead letter messages ({}):\n", messages.len());
    for message in messages {
        let _ = writeln!(
            out,
            "- id: {}, channel: {}, subscriber: {}, retries: {}/{}, retryable: {}, error: {}",
            message.id,
            message.channel,
            message.subscriber_id,
            message.retry_count,
            message.max_retries,
            if message.is_retryable() { "yes" } else { "no" },
            message.error_message
        );
    }
    out
}

fn render_message(message: &DlqMessage) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Message {} (channel: {}, subscriber: {})",
        message.id, message.channel, message.subscriber_id
    );
    let _ = writeln!(
        out,
        "  retries: {}/{}, retryable: {}, payload: {} bytes",
        message.retry_count,
        message.max_retries,
        if message.is_retryable() { "yes" } else { "no" },
        message.payload.len()
    );
    let _ = writeln!(
        out,
        "  last error [{}]: {}",
        message.error_type, message.error_message
    );
    let _ = writeln!(
        out,
        "  first published: {}, last failure: {}",
        message.original_timestamp, message.failure_timestamp
    );
    out
}

fn render_stats(stats: &DlqStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dead Letter Queue Statistics:");
    let _ = writeln!(out, "  Total messages:    {}", stats.total_messages);
    let _ = writeln!(out, "  Retryable:         {}", stats.retryable_messages);
    let _ = writeln!(out, "  Total failures:    {}", stats.total_failures);
    let _ = writeln!(out, "  Total retries:     {}", stats.total_retries);
    let _ = writeln!(out, "  Total successes:   {}", stats.total_successes);
    let _ = writeln!(out, "  Total discarded:   {}", stats.total_discarded);

    let mut channels: Vec<_> = stats.failures_by_channel.iter().collect();
    channels.sort();
    let _ = writeln!(out, "  Failures by channel:");
    for (channel, count) in channels {
        let _ = writeln!(out, "  - {channel}: {count}");
    }

    let mut subscribers: Vec<_> = stats.failures_by_subscriber.iter().collect();
    subscribers.sort();
    let _ = writeln!(out, "  Failures by subscriber:");
    for (subscriber, count) in subscribers {
        let _ = writeln!(out, "  - {subscriber}: {count}");
    }

    out
}
