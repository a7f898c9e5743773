//! Host-side channel abstraction.
//!
//! The sandbox never assumes how it is embedded. Everything it can do
//! to the outside world goes through [`HostPort`]; a directly callable
//! host object, when one exists, is surfaced as a [`DirectHost`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::bridge::payload::ResultsPayload;

/// What the discovered channel supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCapability {
    /// A host object that can be invoked synchronously.
    DirectCall,
    /// Only the message channel answered.
    MessageOnly,
}

/// Where a posted message should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Scoped to one handshaken host session.
    Session(String),
    /// Unscoped; any listener may pick it up.
    Broadcast,
}

/// Outbound messages the sandbox can post.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum HostMessage {
    /// Announces the sandbox is loaded and ready to be adopted.
    Ready { api_version: u32 },
    /// The finished batch.
    Results(ResultsPayload),
    /// Asks the host to grow the embedded frame.
    FrameHeight { height: u32 },
}

/// Inbound host events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A host adopted us and scoped a session.
    Handshake { session_id: String },
}

/// A host object the sandbox can call into without going through the
/// message channel.
pub trait DirectHost: Send + Sync {
    fn deliver(&self, payload: &ResultsPayload) -> Result<(), ChannelError>;
    fn set_frame_height(&self, height: u32) -> Result<(), ChannelError>;
}

/// The sandbox's entire view of its embedding.
#[async_trait]
pub trait HostPort: Send + Sync {
    /// Probe for a directly callable host object. Cheap; polled.
    fn direct_host(&self) -> Option<Arc<dyn DirectHost>>;

    /// Post a message toward the host.
    async fn post(&self, message: HostMessage, destination: Destination) -> Result<(), ChannelError>;

    /// Navigate the embedding page to `url`.
    async fn navigate(&self, url: &str) -> Result<(), ChannelError>;
}

/// A delivery channel attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("direct host call failed: {0}")]
    DirectCall(String),

    #[error("message post failed: {0}")]
    Post(String),

    #[error("host navigation failed: {0}")]
    Navigate(String),

    #[error("all delivery channels failed")]
    AllChannelsFailed,
}

/// Port used when the binary runs on its own, with no embedding page.
/// No direct object ever appears, posts have no listener, and
/// navigation degrades to printing the redirect URL.
#[derive(Debug, Default)]
pub struct StandaloneHost;

#[async_trait]
impl HostPort for StandaloneHost {
    fn direct_host(&self) -> Option<Arc<dyn DirectHost>> {
        None
    }

    async fn post(&self, _message: HostMessage, _destination: Destination) -> Result<(), ChannelError> {
        Err(ChannelError::Post("no embedding host".into()))
    }

    async fn navigate(&self, url: &str) -> Result<(), ChannelError> {
        println!("{url}");
        Ok(())
    }
}
