// ── Session message log ──

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::command::CommandKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Error,
}

/// One line of operator feedback. `command` is `None` for fetch results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionMessage {
    pub at: DateTime<Utc>,
    pub level: MessageLevel,
    pub command: Option<CommandKind>,
    pub text: String,
}

impl SessionMessage {
    pub fn is_error(&self) -> bool {
        self.level == MessageLevel::Error
    }
}

/// Append-only, cleared when a session opens or closes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageLog(Vec<SessionMessage>);

impl MessageLog {
    pub fn push(
        &mut self,
        at: DateTime<Utc>,
        level: MessageLevel,
        command: Option<CommandKind>,
        text: impl Into<String>,
    ) {
        self.0.push(SessionMessage {
            at,
            level,
            command,
            text: text.into(),
        });
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn entries(&self) -> &[SessionMessage] {
        &self.0
    }

    pub fn last(&self) -> Option<&SessionMessage> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
