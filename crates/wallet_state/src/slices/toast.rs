use std::time::Instant;

use serde::Serialize;
use wallet_core::{Toast, ToastQueue};

#[derive(Debug, Clone, Default)]
pub struct ToastState {
    pub queue: ToastQueue,
}

impl Serialize for ToastState {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.queue.all().serialize(s)
    }
}

/// Toast actions carry the instant they happened at so the reducer stays
/// pure.
#[derive(Debug, Clone)]
pub enum ToastsAction {
    Add { toast: Toast, at: Instant },
    Remove(String),
    Pause { id: String, at: Instant },
    Resume { id: String, at: Instant },
    Tick(Instant),
    Clear,
}

impl ToastsAction {
    pub fn add(toast: Toast) -> Self {
        Self::Add {
            toast,
            at: Instant::now(),
        }
    }
}

impl ToastState {
    pub fn toasts(&self) -> &[Toast] {
        self.queue.all()
    }

    pub fn reduce(&mut self, action: ToastsAction) {
        match action {
            ToastsAction::Add { toast, at } => self.queue.push(toast, at),
            ToastsAction::Remove(id) => {
                self.queue.remove(&id);
            }
            ToastsAction::Pause { id, at } => self.queue.pause(&id, at),
            ToastsAction::Resume { id, at } => self.queue.resume(&id, at),
            ToastsAction::Tick(now) => {
                self.queue.tick(now);
            }
            ToastsAction::Clear => self.queue.clear(),
        }
    }
}
