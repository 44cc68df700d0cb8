//! Append-only activity ledger.
//!
//! Every login, logout, card send, card delete and image upload lands here
//! as an immutable record. The ledger serves two purposes: the audit/history
//! views, and the lookup that lets a delete recover the room context of a
//! previously sent message (the upstream delete call returns no metadata).
//! There is no update or delete API.

mod store;

pub use store::{ActivityLedger, CardRecord, HistoryEntry, ImageRecord, SendStats};

use chrono::{DateTime, Utc};

/// Fixed activity vocabulary. The strings are the wire and storage format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activity {
    Login,
    Logout,
    SendCard,
    DeleteCard,
    UploadImage,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Login => "login",
            Activity::Logout => "logout",
            Activity::SendCard => "send card",
            Activity::DeleteCard => "delete card",
            Activity::UploadImage => "upload image",
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger entry. Optional fields apply only to some activities
/// (room/message context for cards, filename/link for images).
#[derive(Clone, Debug)]
pub struct ActivityRecord {
    pub email: String,
    pub activity: Activity,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub type_tag: Option<String>,
    pub room_id: Option<String>,
    pub room_title: Option<String>,
    pub message_id: Option<String>,
    pub filename: Option<String>,
    pub link: Option<String>,
}

impl ActivityRecord {
    /// A record stamped with the current time and no optional context.
    pub fn new(email: impl Into<String>, activity: Activity, success: bool) -> Self {
        Self {
            email: email.into(),
            activity,
            success,
            timestamp: Utc::now(),
            type_tag: None,
            room_id: None,
            room_title: None,
            message_id: None,
            filename: None,
            link: None,
        }
    }
}
