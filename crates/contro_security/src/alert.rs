//! Alert handlers notified of significant responses.

use crate::{SecurityError, SecurityErrorKind, SecurityEvent, SecurityResponse, SecurityResult};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Receives every event that produced at least one non-ALLOW response.
#[async_trait]
pub trait AlertHandler: Send + Sync {
    /// Handle one alert. `responses` never contains ALLOW verdicts.
    async fn handle_alert(
        &self,
        event: &SecurityEvent,
        responses: &[SecurityResponse],
    ) -> SecurityResult<()>;
}

/// An owned alert, for handlers that forward alerts elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    /// Triggering event
    pub event: SecurityEvent,
    /// Significant responses
    pub responses: Vec<SecurityResponse>,
}

/// Writes alerts to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertHandler;

#[async_trait]
impl AlertHandler for LogAlertHandler {
    async fn handle_alert(
        &self,
        event: &SecurityEvent,
        responses: &[SecurityResponse],
    ) -> SecurityResult<()> {
        for response in responses {
            warn!(
                event_id = event.event_id(),
                guild_id = event.guild_id(),
                user_id = ?event.user_id(),
                action = %response.action,
                confidence = response.confidence,
                reason = %response.reason,
                "Security alert"
            );
        }
        Ok(())
    }
}

/// Forwards alerts into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelAlertHandler {
    sender: mpsc::UnboundedSender<Alert>,
}

impl ChannelAlertHandler {
    /// Create a handler and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl AlertHandler for ChannelAlertHandler {
    async fn handle_alert(
        &self,
        event: &SecurityEvent,
        responses: &[SecurityResponse],
    ) -> SecurityResult<()> {
        self.sender
            .send(Alert {
                event: event.clone(),
                responses: responses.to_vec(),
            })
            .map_err(|_| {
                info!("Alert receiver dropped");
                SecurityError::new(SecurityErrorKind::QueueClosed)
            })
    }
}

/// Adapts a closure into an [`AlertHandler`].
///
/// ```
/// use contro_security::FnAlertHandler;
///
/// let handler = FnAlertHandler::new(|event, responses| {
///     println!("{}: {} responses", event.event_id(), responses.len());
///     Ok(())
/// });
/// # let _ = handler;
/// ```
pub struct FnAlertHandler<F> {
    f: F,
}

impl<F> FnAlertHandler<F>
where
    F: Fn(&SecurityEvent, &[SecurityResponse]) -> SecurityResult<()> + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> AlertHandler for FnAlertHandler<F>
where
    F: Fn(&SecurityEvent, &[SecurityResponse]) -> SecurityResult<()> + Send + Sync,
{
    async fn handle_alert(
        &self,
        event: &SecurityEvent,
        responses: &[SecurityResponse],
    ) -> SecurityResult<()> {
        (self.f)(event, responses)
    }
}
