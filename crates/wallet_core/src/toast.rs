use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_TOAST_DURATION_MS: i64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastSeverity {
    Success,
    Error,
    Warning,
    Info,
}

/// A button rendered inside a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastAction {
    pub label: String,
    pub action_id: String,
}

/// Auto-dismiss timer: `Running -> Paused -> Running -> Expired`.
/// Toasts with a non-positive duration stay `Sticky` until removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastTimer {
    Pending,
    Running { deadline: Instant },
    Paused { remaining: Duration },
    Sticky,
    Expired,
}

#[derive(Debug, Clone, Serialize)]
pub struct Toast {
    pub id: String,
    pub message: String,
    pub severity: ToastSeverity,
    pub duration_ms: i64,
    pub actions: Vec<ToastAction>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub timer: ToastTimer,
}

impl Toast {
    pub fn new(severity: ToastSeverity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message: message.into(),
            severity,
            duration_ms: DEFAULT_TOAST_DURATION_MS,
            actions: Vec::new(),
            created_at: Utc::now(),
            timer: ToastTimer::Pending,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastSeverity::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastSeverity::Error, message)
    }

    pub fn with_duration(mut self, duration_ms: i64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_action(mut self, label: impl Into<String>, action_id: impl Into<String>) -> Self {
        self.actions.push(ToastAction {
            label: label.into(),
            action_id: action_id.into(),
        });
        self
    }

    /// Start the auto-dismiss countdown.
    pub fn start(&mut self, now: Instant) {
        self.timer = if self.duration_ms <= 0 {
            ToastTimer::Sticky
        } else {
            ToastTimer::Running {
                deadline: now + Duration::from_millis(self.duration_ms as u64),
            }
        };
    }

    /// Freeze the countdown (pointer hover).
    pub fn pause(&mut self, now: Instant) {
        if let ToastTimer::Running { deadline } = self.timer {
            self.timer = ToastTimer::Paused {
                remaining: deadline.saturating_duration_since(now),
            };
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let ToastTimer::Paused { remaining } = self.timer {
            self.timer = ToastTimer::Running {
                deadline: now + remaining,
            };
        }
    }

    /// Advance the timer; returns `true` once the toast has expired.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let ToastTimer::Running { deadline } = self.timer
            && now >= deadline
        {
            self.timer = ToastTimer::Expired;
        }
        self.timer == ToastTimer::Expired
    }
}

/// In-memory toast queue, newest first.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    max_toasts: usize,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self {
            toasts: Vec::new(),
            max_toasts: 20,
        }
    }

    pub fn push(&mut self, mut toast: Toast, now: Instant) {
        toast.start(now);
        self.toasts.insert(0, toast);
        if self.toasts.len() > self.max_toasts {
            self.toasts.truncate(self.max_toasts);
        }
    }

    /// Remove a toast by id. Returns whether one was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    pub fn pause(&mut self, id: &str, now: Instant) {
        if let Some(t) = self.toasts.iter_mut().find(|t| t.id == id) {
            t.pause(now);
        }
    }

    pub fn resume(&mut self, id: &str, now: Instant) {
        if let Some(t) = self.toasts.iter_mut().find(|t| t.id == id) {
            t.resume(now);
        }
    }

    /// Drop every expired toast and return their ids.
    pub fn tick(&mut self, now: Instant) -> Vec<String> {
        let mut expired = Vec::new();
        self.toasts.retain_mut(|t| {
            if t.tick(now) {
                expired.push(t.id.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn all(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn clear(&mut self) {
        self.toasts.clear();
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn create_toast() {
        let t = Toast::new(ToastSeverity::Info, "Test message");
        assert_eq!(t.message, "Test message");
        assert_eq!(t.duration_ms, DEFAULT_TOAST_DURATION_MS);
        assert_eq!(t.timer, ToastTimer::Pending);
        assert!(t.actions.is_empty());
    }

    #[test]
    fn toast_with_action() {
        let t = Toast::success("Deployed").with_action("View", "open-explorer");
        assert_eq!(t.actions.len(), 1);
        assert_eq!(t.actions[0].action_id, "open-explorer");
    }

    #[test]
    fn timer_expires_after_duration() {
        let start = Instant::now();
        let mut t = Toast::error("boom").with_duration(1000);
        t.start(start);
        assert!(!t.tick(start + ms(999)));
        assert!(t.tick(start + ms(1000)));
        assert_eq!(t.timer, ToastTimer::Expired);
    }

    #[test]
    fn pause_freezes_remaining_time() {
        let start = Instant::now();
        let mut t = Toast::success("ok").with_duration(1000);
        t.start(start);
        t.pause(start + ms(400));
        assert_eq!(t.timer, ToastTimer::Paused { remaining: ms(600) });

        // Hovering for a long time never expires it.
        assert!(!t.tick(start + ms(10_000)));

        t.resume(start + ms(10_000));
        assert!(!t.tick(start + ms(10_599)));
        assert!(t.tick(start + ms(10_600)));
    }

    #[test]
    fn non_positive_duration_is_sticky() {
        let start = Instant::now();
        for duration in [0, -1] {
            let mut t = Toast::new(ToastSeverity::Warning, "stay").with_duration(duration);
            t.start(start);
            assert_eq!(t.timer, ToastTimer::Sticky);
            assert!(!t.tick(start + Duration::from_secs(3600)));
        }
    }

    #[test]
    fn queue_newest_first() {
        let now = Instant::now();
        let mut queue = ToastQueue::new();
        queue.push(Toast::success("first"), now);
        queue.push(Toast::success("second"), now);
        assert_eq!(queue.all()[0].message, "second");
        assert_eq!(queue.all()[1].message, "first");
    }

    #[test]
    fn queue_tick_removes_only_expired() {
        let now = Instant::now();
        let mut queue = ToastQueue::new();
        queue.push(Toast::success("short").with_duration(100), now);
        queue.push(Toast::success("long").with_duration(10_000), now);
        queue.push(Toast::error("sticky").with_duration(0), now);

        let expired = queue.tick(now + ms(500));
        assert_eq!(expired.len(), 1);
        assert_eq!(queue.all().len(), 2);
        assert!(queue.all().iter().all(|t| t.message != "short"));
    }

    #[test]
    fn queue_remove() {
        let now = Instant::now();
        let mut queue = ToastQueue::new();
        queue.push(Toast::success("a"), now);
        let id = queue.all()[0].id.clone();
        assert!(queue.remove(&id));
        assert!(!queue.remove(&id));
        assert!(queue.all().is_empty());
    }

    #[test]
    fn queue_truncates_at_max() {
        let now = Instant::now();
        let mut queue = ToastQueue::new();
        queue.max_toasts = 3;
        for i in 0..5 {
            queue.push(Toast::success(format!("msg{i}")), now);
        }
        assert_eq!(queue.all().len(), 3);
        assert_eq!(queue.all()[0].message, "msg4");
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&ToastSeverity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
