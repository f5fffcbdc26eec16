//! Event Publisher Implementation
//!
//! 进度事件写入日志并广播给订阅者

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{ProgressEvent, ProgressReporterPort};

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<ProgressEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅进度事件
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.channel.subscribe()
    }

    fn log(event: &ProgressEvent) {
        match event {
            ProgressEvent::Info { message } => tracing::info!("{}", message),
            ProgressEvent::Step {
                step,
                total,
                message,
            } => tracing::info!(step = step, total = total, "[{}/{}] {}", step, total, message),
            ProgressEvent::Generating {
                index,
                total,
                attempt,
                text,
            } => tracing::info!(
                index = index,
                total = total,
                attempt = attempt,
                "Generating: {}",
                preview(text)
            ),
            ProgressEvent::Success { index, duration } => tracing::info!(
                index = index,
                duration_secs = duration.as_secs_f64(),
                "Generated"
            ),
            ProgressEvent::Skipped { index, duration } => tracing::info!(
                index = index,
                duration_secs = duration.as_secs_f64(),
                "Skipped, clip already exists"
            ),
            ProgressEvent::Retrying {
                index,
                attempt,
                delay,
                error,
            } => tracing::warn!(
                index = index,
                attempt = attempt,
                delay_secs = delay.as_secs_f64(),
                error = %error,
                "Retrying"
            ),
            ProgressEvent::Failed {
                index,
                attempts,
                error,
            } => tracing::error!(
                index = index,
                attempts = attempts,
                error = %error,
                "Failed"
            ),
            ProgressEvent::Summary {
                counts,
                total_duration,
            } => tracing::info!(
                generated = counts.generated,
                skipped = counts.skipped,
                failed = counts.failed,
                total_secs = total_duration.as_secs_f64(),
                "Summary"
            ),
        }
    }
}

/// 日志中只显示前 50 个字符
fn preview(text: &str) -> String {
    const LIMIT: usize = 50;
    if text.chars().count() <= LIMIT {
        return text.to_string();
    }
    let head: String = text.chars().take(LIMIT).collect();
    format!("{}...", head)
}

impl ProgressReporterPort for EventPublisher {
    fn report(&self, event: ProgressEvent) {
        Self::log(&event);
        if let Err(e) = self.channel.send(event) {
            tracing::trace!(error = %e, "Progress event dropped (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
