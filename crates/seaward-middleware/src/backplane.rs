//! Backplane adapter: how mail enters and leaves the process.
//!
//! The manager never speaks WebSocket. It reads and writes the
//! [`MailBus`]; a [`Backplane`] implementation pumps frames between the
//! bus and the outside world and owns all transport concerns.
//! [`WsBackplane`] is the standard client for a fleet gateway that
//! carries one JSON [`WireFrame`] per WebSocket text message.
//!
//! Decode failures stop at this boundary: malformed mail is warned and
//! dropped here, so the manager only ever sees well-formed, typed
//! [`Mail`].

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{error, info, warn};

use seaward_types::SeawardError;

use crate::bus::MailBus;
use crate::codec::CodecError;
use crate::mail::{Mail, WireFrame};

/// Transport seam between the bus and the fleet.
#[async_trait]
pub trait Backplane: Send + Sync {
    /// Pump frames both ways until the connection or the bus closes.
    async fn run(&self, bus: MailBus) -> Result<(), SeawardError>;
}

/// WebSocket client backplane.
pub struct WsBackplane {
    url: String,
    community: String,
}

impl WsBackplane {
    /// Create a client for the gateway at `url`, stamping outbound
    /// frames with `community`.
    pub fn new(url: impl Into<String>, community: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            community: community.into(),
        }
    }

    /// Decode and publish one inbound text frame.
    ///
    /// An unrecognized key is the unhandled-mail warning; everything else
    /// that fails to decode is the malformed-mail warning. Neither is
    /// fatal and neither reaches the manager.
    fn deliver_inbound(&self, bus: &MailBus, text: &str) {
        let frame: WireFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "unparseable backplane frame");
                return;
            }
        };
        match Mail::decode(&frame) {
            Ok(mail) => {
                let _ = bus.publish_mail(mail);
            }
            Err(CodecError::UnrecognizedKey(key)) => {
                warn!(key, "unhandled mail key");
            }
            Err(e) => {
                warn!(key = %frame.key, error = %e, "dropping malformed mail");
            }
        }
    }
}

#[async_trait]
impl Backplane for WsBackplane {
    async fn run(&self, bus: MailBus) -> Result<(), SeawardError> {
        let (ws_stream, _) = connect_async(&self.url).await.map_err(|e| {
            SeawardError::Transport(format!("backplane connect to {}: {e}", self.url))
        })?;
        info!(url = %self.url, "backplane connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let mut postings = bus.subscribe_postings();

        loop {
            tokio::select! {
                // Forward manager postings out to the fleet.
                result = postings.recv() => {
                    match result {
                        Ok(envelope) => {
                            let frame = envelope.posting.to_frame(&self.community);
                            let json = serde_json::to_string(&frame)
                                .map_err(|e| SeawardError::Codec(e.to_string()))?;
                            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(lagged_by = n, "backplane publisher lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                // Deliver fleet traffic onto the bus.
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.deliver_inbound(&bus, text.as_str());
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("backplane connection closed");
                            break;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "backplane read error");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::keys;

    fn backplane() -> WsBackplane {
        WsBackplane::new("ws://localhost:9000", "alpha")
    }

    #[tokio::test]
    async fn inbound_frame_lands_on_the_bus() {
        let bus = MailBus::default();
        let mut rx = bus.subscribe_mail();

        let text = format!(r#"{{"key":"{}","dval":42.5}}"#, keys::NAV_X);
        backplane().deliver_inbound(&bus, &text);

        let envelope = rx.try_recv().expect("mail should have been published");
        assert_eq!(envelope.mail, Mail::NavX(42.5));
    }

    #[tokio::test]
    async fn unparseable_json_is_dropped() {
        let bus = MailBus::default();
        let mut rx = bus.subscribe_mail();

        backplane().deliver_inbound(&bus, "this is not json");

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unhandled_key_is_dropped() {
        let bus = MailBus::default();
        let mut rx = bus.subscribe_mail();

        backplane().deliver_inbound(&bus, r#"{"key":"DB_UPTIME","dval":100.0}"#);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_mail_is_dropped() {
        let bus = MailBus::default();
        let mut rx = bus.subscribe_mail();

        // An ack with a missing field must never reach the manager.
        let text = format!(
            r#"{{"key":"{}","sval":"vname=alpha,width=25,pd=0.9,pclass=0.91"}}"#,
            keys::CONFIG_ACK
        );
        backplane().deliver_inbound(&bus, &text);

        assert!(rx.try_recv().is_err());
    }
}
