//! Memoizing capability probe

use std::time::Duration;

use tracing::{debug, warn};

use super::env::{detect_from_env, EnvSource, ProcessEnv};
use super::query::{parse_query_response, QueryChannel, TtyChannel, CAPABILITY_QUERY};
use super::{CapabilityProvider, TerminalCapabilities};
use crate::config::ProbeConfig;

/// Detects capabilities once and caches the result until [`refresh`]
///
/// [`refresh`]: CapabilityProvider::refresh
pub struct CapabilityProbe {
    env: Box<dyn EnvSource>,
    channel: Option<Box<dyn QueryChannel>>,
    timeout: Duration,
    cached: Option<TerminalCapabilities>,
}

impl CapabilityProbe {
    /// Probe the process environment and, if enabled, the controlling terminal
    pub fn new(config: &ProbeConfig) -> Self {
        let channel: Option<Box<dyn QueryChannel>> = if config.active_query {
            Some(Box::new(TtyChannel))
        } else {
            None
        };
        Self::with_sources(Box::new(ProcessEnv), channel, config)
    }

    /// Probe with caller-supplied environment and query channel
    pub fn with_sources(
        env: Box<dyn EnvSource>,
        channel: Option<Box<dyn QueryChannel>>,
        config: &ProbeConfig,
    ) -> Self {
        Self {
            env,
            channel,
            timeout: config.timeout(),
            cached: None,
        }
    }

    fn run_detection(&mut self) -> TerminalCapabilities {
        let mut caps = detect_from_env(self.env.as_ref());

        if let Some(channel) = self.channel.as_mut() {
            match channel.query(CAPABILITY_QUERY, self.timeout) {
                Ok(Some(bytes)) => {
                    let reply = parse_query_response(&bytes);
                    caps.kitty_graphics |= reply.kitty_graphics;
                    caps.sixel_graphics |= reply.sixel_graphics;
                    if !reply.complete {
                        debug!("capability query reply incomplete, using what arrived");
                    }
                }
                Ok(None) => debug!("no reply to capability query, using environment only"),
                Err(e) => warn!("capability query failed, using environment only: {}", e),
            }
        }

        debug!(
            terminal = %caps.terminal_id,
            kitty = caps.kitty_graphics,
            sixel = caps.sixel_graphics,
            unicode = caps.unicode,
            color_bits = caps.color_bits,
            "terminal capabilities detected"
        );
        caps
    }
}

impl CapabilityProvider for CapabilityProbe {
    fn detect(&mut self) -> &TerminalCapabilities {
        if self.cached.is_none() {
            let caps = self.run_detection();
            self.cached = Some(caps);
        }
        self.cached.get_or_insert_with(TerminalCapabilities::conservative)
    }

    fn refresh(&mut self) -> &TerminalCapabilities {
        self.cached = None;
        self.detect()
    }
}

impl std::fmt::Debug for CapabilityProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityProbe")
            .field("active_query", &self.channel.is_some())
            .field("timeout", &self.timeout)
            .field("cached", &self.cached)
            .finish()
    }
}
