// ABOUTME: Notification intents emitted by pure engine code plus the presentation scheduler
// ABOUTME: Preserves submission order for equal delays; one active toast at a time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Notifications
//!
//! Engine code never owns timers. It emits [`NotificationIntent`] values with
//! relative delays (achievement staggering, deferred level-up banners); the
//! presentation layer feeds them into a [`NotificationScheduler`] which
//! resolves delivery order: earlier due time first, submission order breaking
//! ties. A later-submitted intent with a shorter delay legitimately overtakes
//! one with a longer delay. The consumer shows at most one toast at a time;
//! the last scheduled to fire wins the display slot.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep_until, Duration, Instant};

use crate::constants::notification_timing;

/// Visual category of a toast
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
    /// Spinner shown while an AI call is in flight
    Loading,
    /// XP gain toast
    Xp,
    /// Achievement unlock popup
    Achievement,
    /// Level-up banner
    LevelUp,
}

/// A notification the engine wants shown, with presentation timing attached
/// as data rather than as a timer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationIntent {
    /// Visual category
    pub kind: NotificationKind,
    /// Message text
    pub message: String,
    /// Delay before the toast appears, in milliseconds
    pub delay_ms: u64,
    /// How long the toast stays up, in milliseconds
    pub display_ms: u64,
}

impl NotificationIntent {
    /// An informational toast shown immediately
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
            delay_ms: 0,
            display_ms: notification_timing::SUCCESS_TOAST_MS,
        }
    }

    /// A success toast shown immediately
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            delay_ms: 0,
            display_ms: notification_timing::SUCCESS_TOAST_MS,
        }
    }

    /// An error toast shown immediately
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
            delay_ms: 0,
            display_ms: notification_timing::ERROR_TOAST_MS,
        }
    }

    /// A loading spinner toast, dismissed by the operation outcome
    #[must_use]
    pub fn loading(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Loading,
            message: message.into(),
            delay_ms: 0,
            display_ms: 0,
        }
    }

    /// An XP gain toast
    #[must_use]
    pub fn xp(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Xp,
            message: message.into(),
            delay_ms: 0,
            display_ms: notification_timing::XP_TOAST_MS,
        }
    }

    /// A level-up banner, deferred so it lands after the XP toast
    #[must_use]
    pub fn level_up(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::LevelUp,
            message: message.into(),
            delay_ms: notification_timing::LEVEL_UP_DELAY_MS,
            display_ms: notification_timing::LEVEL_UP_TOAST_MS,
        }
    }

    /// An achievement popup staggered by its position in the unlock batch
    #[must_use]
    pub fn achievement(message: impl Into<String>, batch_index: u64) -> Self {
        Self {
            kind: NotificationKind::Achievement,
            message: message.into(),
            delay_ms: batch_index * notification_timing::ACHIEVEMENT_STAGGER_MS,
            display_ms: notification_timing::SUCCESS_TOAST_MS,
        }
    }
}

/// A toast due for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Visual category
    pub kind: NotificationKind,
    /// Message text
    pub message: String,
    /// How long the toast stays up, in milliseconds
    pub display_ms: u64,
}

#[derive(Debug)]
struct Entry {
    due: Instant,
    seq: u64,
    intent: NotificationIntent,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}
impl Eq for Entry {}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Presentation-side scheduler draining intents in due order.
///
/// Single consumer; equal due times resolve in submission order.
#[derive(Debug, Default)]
pub struct NotificationScheduler {
    queue: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl NotificationScheduler {
    /// Create an empty scheduler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit an intent for later delivery
    pub fn submit(&mut self, intent: NotificationIntent) {
        let due = Instant::now() + Duration::from_millis(intent.delay_ms);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry { due, seq, intent }));
    }

    /// Submit a batch of intents, preserving their order
    pub fn submit_all(&mut self, intents: impl IntoIterator<Item = NotificationIntent>) {
        for intent in intents {
            self.submit(intent);
        }
    }

    /// Number of pending intents
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Await and return the next toast, or `None` when the queue is empty.
    ///
    /// Sleeps until the earliest entry is due; intents submitted while
    /// waiting are picked up on the next call.
    pub async fn next_toast(&mut self) -> Option<Toast> {
        let due = self.queue.peek().map(|Reverse(entry)| entry.due)?;
        sleep_until(due).await;
        self.queue.pop().map(|Reverse(entry)| Toast {
            kind: entry.intent.kind,
            message: entry.intent.message,
            display_ms: entry.intent.display_ms,
        })
    }

    /// Drain every intent already due at `now`, in delivery order, without
    /// sleeping. Intended for UI frameworks driving their own frame clock.
    pub fn drain_due(&mut self, now: Instant) -> Vec<Toast> {
        let mut toasts = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|Reverse(entry)| entry.due <= now)
        {
            if let Some(Reverse(entry)) = self.queue.pop() {
                toasts.push(Toast {
                    kind: entry.intent.kind,
                    message: entry.intent.message,
                    display_ms: entry.intent.display_ms,
                });
            }
        }
        toasts
    }
}
