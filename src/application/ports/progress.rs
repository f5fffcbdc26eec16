//! Progress Reporter Port - 进度事件

use serde::Serialize;
use std::time::Duration;

use crate::domain::timeline::OutcomeCounts;

/// 进度事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Info {
        message: String,
    },
    Step {
        step: usize,
        total: usize,
        message: String,
    },
    Generating {
        index: usize,
        total: usize,
        attempt: u32,
        text: String,
    },
    Success {
        index: usize,
        duration: Duration,
    },
    Skipped {
        index: usize,
        duration: Duration,
    },
    Retrying {
        index: usize,
        /// 即将进行的尝试序号
        attempt: u32,
        delay: Duration,
        error: String,
    },
    Failed {
        index: usize,
        attempts: u32,
        error: String,
    },
    Summary {
        counts: OutcomeCounts,
        total_duration: Duration,
    },
}

impl ProgressEvent {
    pub fn info(message: impl Into<String>) -> Self {
        ProgressEvent::Info {
            message: message.into(),
        }
    }

    pub fn step(step: usize, total: usize, message: impl Into<String>) -> Self {
        ProgressEvent::Step {
            step,
            total,
            message: message.into(),
        }
    }

    /// 事件类型名
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Info { .. } => "info",
            ProgressEvent::Step { .. } => "step",
            ProgressEvent::Generating { .. } => "generating",
            ProgressEvent::Success { .. } => "success",
            ProgressEvent::Skipped { .. } => "skipped",
            ProgressEvent::Retrying { .. } => "retrying",
            ProgressEvent::Failed { .. } => "failed",
            ProgressEvent::Summary { .. } => "summary",
        }
    }
}

/// Progress Reporter Port
pub trait ProgressReporterPort: Send + Sync {
    fn report(&self, event: ProgressEvent);
}
