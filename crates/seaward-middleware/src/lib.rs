//! `seaward-middleware` – The Nervous System
//!
//! Routes key/value mail between the fleet backplane and the hazard
//! manager without caring about the mail's meaning.
//!
//! # Modules
//!
//! - [`bus`] – [`MailBus`][bus::MailBus]: in-process publish/subscribe
//!   with separate inbound (mail) and outbound (posting) lanes built on
//!   Tokio broadcast channels.
//! - [`codec`] – the comma-separated `key=value` wire codec: hazards,
//!   hazard sets, polygons, routed node messages, and the sensor
//!   handshake messages.
//! - [`mail`] – [`Mail`][mail::Mail] / [`Posting`][mail::Posting]: the
//!   closed enums naming everything this process can hear or say, plus
//!   the JSON [`WireFrame`][mail::WireFrame] transport envelope.
//! - [`backplane`] – [`Backplane`][backplane::Backplane] adapter trait
//!   and the [`WsBackplane`][backplane::WsBackplane] WebSocket client
//!   that pumps frames between a fleet gateway and the bus.

pub mod backplane;
pub mod bus;
pub mod codec;
pub mod mail;

pub use backplane::{Backplane, WsBackplane};
pub use bus::{MailBus, MailEnvelope, MailReceiver, PostingEnvelope, PostingReceiver};
pub use codec::{CodecError, NodeMessage};
pub use mail::{Mail, Posting, RouteColor, WireFrame};
