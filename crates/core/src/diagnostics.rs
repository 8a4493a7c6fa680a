//! Diagnostics — the tracker never throws into the host page, so anything
//! that goes wrong while capturing or delivering is surfaced here instead.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

/// Something the tracker degraded around instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// No `requestUrl` configured; the envelope was not sent.
    MissingRequestUrl,
    /// The beacon did not accept the request.
    DeliveryRejected { url: String },
    /// A field could not be serialised and was left out of the envelope.
    SerializationFallback { field: String, reason: String },
    /// A promise rejection's reason could not be read; reported with an
    /// empty message.
    RejectionReasonUnavailable { reason: String },
    /// A caller option named like a configuration field was dropped.
    ShadowedOption { key: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequestUrl => write!(f, "requestUrl is not configured"),
            Self::DeliveryRejected { url } => write!(f, "beacon to '{url}' was not accepted"),
            Self::SerializationFallback { field, reason } => {
                write!(f, "field '{field}' dropped: {reason}")
            }
            Self::RejectionReasonUnavailable { reason } => {
                write!(f, "rejection reason unreadable: {reason}")
            }
            Self::ShadowedOption { key } => {
                write!(f, "option '{key}' names a configuration field and was ignored")
            }
        }
    }
}

/// Receives diagnostics. Implemented for any `Fn(&Diagnostic)`.
pub trait DiagnosticHook: Send + Sync {
    fn on_diagnostic(&self, diagnostic: &Diagnostic);
}

impl<F> DiagnosticHook for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Default hook: logs each diagnostic as a warning.
pub struct TracingHook;

impl DiagnosticHook for TracingHook {
    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        warn!(diagnostic = %diagnostic, "tracker degraded");
    }
}

pub fn tracing_hook() -> Arc<dyn DiagnosticHook> {
    Arc::new(TracingHook)
}
