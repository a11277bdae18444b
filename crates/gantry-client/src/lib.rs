// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client core for the GANTRY stack.
//!
//! This crate implements the client side of IEC 62541: the OPC UA TCP
//! transport with its Hello/Acknowledge handshake, the secure channel
//! state machine with request correlation and token renewal, session
//! management with user authentication, and the subscription pipeline
//! that keeps Publish requests in flight and fans notifications out to
//! consumers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Client                                │
//! │        (typed request helpers, lifecycle, subscriptions)        │
//! └─────────────────────────────────────────────────────────────────┘
//!           │                     │                      │
//!           ▼                     ▼                      ▼
//! ┌──────────────────┐ ┌───────────────────┐ ┌──────────────────────┐
//! │  SessionManager  │ │ SubscriptionReg.  │ │     publish pump     │
//! │ (active session, │ │ (id → notification│ │ (Publish in flight,  │
//! │   auth token)    │ │      queue)       │ │  acks, demux, fanout)│
//! └──────────────────┘ └───────────────────┘ └──────────────────────┘
//!           │                                           │
//!           └───────────────────┬───────────────────────┘
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SecureChannel                            │
//! │   (framing, chunking, correlation, token renewal, security)     │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     UacpTransport (TCP)                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use gantry_client::{ChannelConfig, Client, SessionConfig, SubscriptionParameters};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(
//!         "opc.tcp://localhost:4840",
//!         ChannelConfig::default(),
//!         SessionConfig::default(),
//!     )?;
//!     client.connect().await?;
//!
//!     let mut subscription = client
//!         .subscribe(&SubscriptionParameters::default())
//!         .await?;
//!     while let Some(notification) = subscription.recv().await {
//!         println!("{notification:?}");
//!     }
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod security;
pub mod session;
pub mod subscription;
pub mod transport;

pub use channel::{ChannelState, ChannelStats, SecureChannel};
pub use client::{monitored_item_with_defaults, Client};
pub use config::{
    ChannelConfig, ChannelConfigBuilder, IdentityToken, SessionConfig, SessionConfigBuilder,
    SignatureVerification,
};
pub use error::{
    ClientError, ClientResult, ContractError, ProtocolError, SecurityError, ServiceError,
    TransportError,
};
pub use security::{SecurityMode, SecurityPolicy};
pub use session::{Session, SessionManager, SessionStats};
pub use subscription::{
    NotificationPayload, PublishError, PublishNotification, Subscription, SubscriptionParameters,
    SubscriptionRegistry,
};
pub use transport::{EndpointUrl, TransportLimits, UacpTransport};

// The codec is part of the public API surface: requests and responses are
// built from its types.
pub use gantry_codec as codec;
