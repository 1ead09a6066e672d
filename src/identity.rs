//! Caller-identity resolution.
//!
//! Every tool invocation needs to know whose list it is operating on. The
//! identity comes from an ordered list of resolver strategies; the first one
//! that produces a non-empty identity wins. The order is part of the
//! external contract: session hint, then explicit override, then OS account,
//! then a fixed fallback.

use crate::config::{FALLBACK_USER_ID, IdentityConfig};
use std::env;
use tracing::debug;

/// Per-request facts the transport layer contributes to resolution.
#[derive(Debug, Clone, Default)]
pub struct RequestIdentity {
    /// Client name from the session's initialize handshake, if any
    pub session_hint: Option<String>,
}

impl RequestIdentity {
    pub fn with_session_hint(hint: Option<String>) -> Self {
        Self { session_hint: hint }
    }
}

/// One strategy for working out who is calling.
pub trait IdentityResolver: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, request: &RequestIdentity) -> Option<String>;
}

/// The identity hint supplied by the calling session, when the host sends one.
pub struct SessionHint;

impl IdentityResolver for SessionHint {
    fn name(&self) -> &'static str {
        "session"
    }

    fn resolve(&self, request: &RequestIdentity) -> Option<String> {
        non_empty(request.session_hint.clone())
    }
}

/// Explicit override captured from configuration at startup.
pub struct EnvOverride {
    value: Option<String>,
}

impl EnvOverride {
    pub fn new(value: Option<String>) -> Self {
        Self { value }
    }
}

impl IdentityResolver for EnvOverride {
    fn name(&self) -> &'static str {
        "env-override"
    }

    fn resolve(&self, _request: &RequestIdentity) -> Option<String> {
        non_empty(self.value.clone())
    }
}

/// The host operating system's account name.
pub struct OsUser;

impl IdentityResolver for OsUser {
    fn name(&self) -> &'static str {
        "os-user"
    }

    fn resolve(&self, _request: &RequestIdentity) -> Option<String> {
        non_empty(env::var("USER").ok()).or_else(|| non_empty(env::var("USERNAME").ok()))
    }
}

/// Fixed last-resort identifier so resolution always succeeds.
pub struct Fallback {
    id: String,
}

impl Fallback {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl IdentityResolver for Fallback {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn resolve(&self, _request: &RequestIdentity) -> Option<String> {
        Some(self.id.clone())
    }
}

/// Ordered resolver chain; first non-empty result wins.
pub struct IdentityChain {
    resolvers: Vec<Box<dyn IdentityResolver>>,
}

impl IdentityChain {
    /// The standard chain: session hint, env override, OS account, fallback.
    pub fn from_config(identity: &IdentityConfig) -> Self {
        Self::with_resolvers(vec![
            Box::new(SessionHint),
            Box::new(EnvOverride::new(identity.override_user.clone())),
            Box::new(OsUser),
            Box::new(Fallback::new(FALLBACK_USER_ID)),
        ])
    }

    pub fn with_resolvers(resolvers: Vec<Box<dyn IdentityResolver>>) -> Self {
        Self { resolvers }
    }

    pub fn resolve(&self, request: &RequestIdentity) -> String {
        for resolver in &self.resolvers {
            if let Some(id) = resolver.resolve(request) {
                debug!(resolver = resolver.name(), user_id = %id, "Resolved caller identity");
                return id;
            }
        }
        // unreachable with the standard chain; kept total for custom chains
        FALLBACK_USER_ID.to_string()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
