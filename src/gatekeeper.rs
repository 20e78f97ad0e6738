//! Composition of admission control and moderation for a connection handler.
//!
//! A connection layer calls [`Gatekeeper::on_connect`] when it accepts a
//! socket, [`Gatekeeper::on_disconnect`] when the socket closes, and
//! [`Gatekeeper::on_message`] for every inbound chat line. The gatekeeper owns
//! no transport; it only answers whether to keep going.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::admission::{AdmissionCounter, ResetHandle};
use crate::config::{GuardConfig, MessagePolicy};
use crate::error::Result;
use crate::moderation::{ContentFilter, DisallowedTokenSet};

/// Outcome of a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// The address is over its limit. The connection still counts until
    /// the caller reports its close.
    Rejected,
}

/// Outcome of moderating one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageVerdict {
    Clean,
    /// The message must be dropped; `token` is the first match
    Blocked { token: String },
    /// The message may be delivered as `text`
    Censored { text: String },
}

pub struct Gatekeeper {
    admission: Arc<AdmissionCounter>,
    filter: Arc<ContentFilter>,
    policy: MessagePolicy,
    reset: Mutex<Option<ResetHandle>>,
}

impl Gatekeeper {
    pub fn new(
        admission: Arc<AdmissionCounter>,
        filter: Arc<ContentFilter>,
        policy: MessagePolicy,
    ) -> Self {
        Self {
            admission,
            filter,
            policy,
            reset: Mutex::new(None),
        }
    }

    /// Build both components from configuration, loading any word file.
    pub fn from_config(config: &GuardConfig) -> Result<Self> {
        config.validate()?;

        let admission = Arc::new(AdmissionCounter::new(config.limiter.clone()));
        let tokens = DisallowedTokenSet::from_config(&config.filter)?;
        info!(
            max = config.limiter.max,
            reset_interval_ms = ?config.limiter.reset_interval().map(|d| d.as_millis()),
            tokens = tokens.len(),
            policy = ?config.filter.policy,
            "Gatekeeper configured"
        );

        Ok(Self::new(
            admission,
            Arc::new(ContentFilter::new(tokens)),
            config.filter.policy,
        ))
    }

    /// Start the counter's reset timer, if one is configured.
    ///
    /// Calling this again replaces the running timer. Must be called from
    /// within a Tokio runtime.
    pub fn start(&self) {
        let handle = self.admission.start_reset_timer();
        *self.reset.lock() = handle;
    }

    /// Stop the reset timer.
    pub async fn shutdown(&self) {
        let handle = self.reset.lock().take();
        if let Some(handle) = handle {
            handle.stop().await;
            info!("Gatekeeper reset timer stopped");
        }
    }

    pub fn on_connect(&self, address: Option<&str>) -> Admission {
        self.admission.increment(address);
        if self.admission.is_limited(address) {
            debug!(address = ?address, "Rejecting connection");
            Admission::Rejected
        } else {
            Admission::Accepted
        }
    }

    pub fn on_disconnect(&self, address: Option<&str>) {
        self.admission.decrement(address);
    }

    pub fn on_message(&self, text: &str) -> MessageVerdict {
        let Some(token) = self.filter.first_match(text) else {
            return MessageVerdict::Clean;
        };

        debug!(token = %token, policy = ?self.policy, "Message flagged");
        match self.policy {
            MessagePolicy::Block => MessageVerdict::Blocked {
                token: token.to_string(),
            },
            MessagePolicy::Censor => MessageVerdict::Censored {
                text: self.filter.censor(text),
            },
        }
    }

    pub fn admission(&self) -> &Arc<AdmissionCounter> {
        &self.admission
    }

    pub fn filter(&self) -> &Arc<ContentFilter> {
        &self.filter
    }

    pub fn policy(&self) -> MessagePolicy {
        self.policy
    }
}
