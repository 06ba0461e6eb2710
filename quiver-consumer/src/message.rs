use std::fmt::{Debug, Display, Formatter};

use bytes::Bytes;

/// The number of bytes making up a message ID.
pub const MESSAGE_ID_LEN: usize = 16;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// The broker assigned ID of a message.
///
/// IDs are made of printable ASCII characters but this is not enforced.
pub struct MessageId([u8; MESSAGE_ID_LEN]);

impl MessageId {
    pub const fn new(id: [u8; MESSAGE_ID_LEN]) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; MESSAGE_ID_LEN] {
        &self.0
    }
}

impl From<[u8; MESSAGE_ID_LEN]> for MessageId {
    fn from(id: [u8; MESSAGE_ID_LEN]) -> Self {
        Self(id)
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl Debug for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessageId({})", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A message delivered by a broker node.
pub struct Message {
    /// The ID assigned by the broker node which received the message.
    pub id: MessageId,
    /// The time the message was published, in nanoseconds since the unix epoch.
    pub timestamp: i64,
    /// The number of times delivery of the message has been attempted.
    pub attempts: u16,
    /// The message payload.
    pub body: Bytes,
}

impl Message {
    /// Creates a new message on its first delivery attempt.
    pub fn new(id: impl Into<MessageId>, timestamp: i64, body: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            attempts: 1,
            body: body.into(),
        }
    }

    /// Set the number of delivery attempts.
    pub fn with_attempts(mut self, attempts: u16) -> Self {
        self.attempts = attempts;
        self
    }
}
