//! In-process mail bus: two typed broadcast lanes.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber
//! blocking the others.
//!
//! Traffic is partitioned into two lanes so the manager and the
//! backplane bridge never read each other's output back:
//!
//! | Lane | Typical traffic |
//! |---|---|
//! | mail | decoded inbound [`Mail`] from the backplane (or tests) |
//! | postings | outbound [`Posting`]s the manager wants published |

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use seaward_types::SeawardError;

use crate::mail::{Mail, Posting};

/// Default lane capacity (number of buffered messages before old ones
/// are dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Envelope wrapped around each piece of inbound mail for log
/// correlation across the bridge and the manager.
#[derive(Debug, Clone)]
pub struct MailEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub mail: Mail,
}

/// Envelope wrapped around each outbound posting.
#[derive(Debug, Clone)]
pub struct PostingEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub posting: Posting,
}

/// Shared bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct MailBus {
    mail: broadcast::Sender<MailEnvelope>,
    postings: broadcast::Sender<PostingEnvelope>,
}

impl MailBus {
    /// Create a new bus with the given capacity on each lane.
    pub fn new(capacity: usize) -> Self {
        let (mail, _) = broadcast::channel(capacity);
        let (postings, _) = broadcast::channel(capacity);
        Self { mail, postings }
    }

    /// Publish decoded inbound mail.
    ///
    /// Returns the number of active receivers, or a channel error when no
    /// one is listening (normal before the manager loop starts).
    pub fn publish_mail(&self, mail: Mail) -> Result<usize, SeawardError> {
        let envelope = MailEnvelope {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            mail,
        };
        self.mail
            .send(envelope)
            .map_err(|_| SeawardError::Channel("no mail subscribers".to_string()))
    }

    /// Subscribe to the inbound mail lane.
    pub fn subscribe_mail(&self) -> MailReceiver {
        MailReceiver {
            receiver: self.mail.subscribe(),
        }
    }

    /// Publish an outbound posting.
    ///
    /// Returns the number of active receivers, or a channel error when no
    /// one is listening (normal when running headless without a bridge).
    pub fn post(&self, posting: Posting) -> Result<usize, SeawardError> {
        let envelope = PostingEnvelope {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            posting,
        };
        self.postings
            .send(envelope)
            .map_err(|_| SeawardError::Channel("no posting subscribers".to_string()))
    }

    /// Subscribe to the outbound posting lane.
    pub fn subscribe_postings(&self) -> PostingReceiver {
        PostingReceiver {
            receiver: self.postings.subscribe(),
        }
    }
}

impl Default for MailBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Lane receivers
// ---------------------------------------------------------------------------

/// Receiver bound to the inbound mail lane.
///
/// Obtained via [`MailBus::subscribe_mail`].
pub struct MailReceiver {
    receiver: broadcast::Receiver<MailEnvelope>,
}

impl MailReceiver {
    /// Wait for the next piece of mail.
    ///
    /// Returns:
    /// * `Ok(envelope)` – a successfully received message.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber
    ///   fell behind and `n` messages were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus shut down.
    pub async fn recv(&mut self) -> Result<MailEnvelope, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking receive for drain-then-tick loops.
    pub fn try_recv(&mut self) -> Result<MailEnvelope, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Receiver bound to the outbound posting lane.
///
/// Obtained via [`MailBus::subscribe_postings`].
pub struct PostingReceiver {
    receiver: broadcast::Receiver<PostingEnvelope>,
}

impl PostingReceiver {
    /// Wait for the next posting.
    pub async fn recv(&mut self) -> Result<PostingEnvelope, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking receive, used by tests to inspect what was posted.
    pub fn try_recv(&mut self) -> Result<PostingEnvelope, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }
}
