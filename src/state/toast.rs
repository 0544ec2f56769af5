use std::time::{Duration, Instant};

pub const TOAST_VISIBLE_FOR: Duration = Duration::from_secs(5);
pub const TOAST_HIDE_DURATION: Duration = Duration::from_millis(300);

pub const NO_TOKEN_NOTICE: &str = "⚠️ No access token found. Please log in again.";
pub const BACKEND_UNREACHABLE_NOTICE: &str = "⚠️ Could not connect to backend. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastPhase {
    Visible,
    Hiding,
    Expired,
}

/// A transient user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub shown_at: Instant,
}

impl Toast {
    pub fn new(message: impl Into<String>, shown_at: Instant) -> Self {
        Self {
            message: message.into(),
            shown_at,
        }
    }

    pub fn phase(&self, now: Instant) -> ToastPhase {
        let elapsed = now.saturating_duration_since(self.shown_at);
        if elapsed < TOAST_VISIBLE_FOR {
            ToastPhase::Visible
        } else if elapsed < TOAST_VISIBLE_FOR + TOAST_HIDE_DURATION {
            ToastPhase::Hiding
        } else {
            ToastPhase::Expired
        }
    }
}
