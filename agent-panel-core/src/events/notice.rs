use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::events::types::Notice;

/// Holds the notice currently on display; a newer notice replaces it.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    current: Option<(Notice, DateTime<Utc>)>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, notice: Notice, posted_at: DateTime<Utc>) {
        self.current = Some((notice, posted_at));
    }

    /// The notice still visible at `now`, if any.
    pub fn visible_at(&self, now: DateTime<Utc>) -> Option<&Notice> {
        let (notice, posted_at) = self.current.as_ref()?;
        let elapsed = now.signed_duration_since(*posted_at).to_std().unwrap_or(Duration::ZERO);
        (elapsed < notice.dismiss_after).then_some(notice)
    }
}
