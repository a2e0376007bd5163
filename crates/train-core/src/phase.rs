//! Lifecycle phases

use std::fmt;

/// Named stage of the per-request lifecycle
///
/// The order of [`LifecyclePhase::ALL`] is the order the pipeline runs them in.
/// Body initialization happens between `PreParsing` and `PreHandling`, response
/// preparation between `PostHandling` and `PreSending`, and transmission between
/// `PreSending` and `PostSending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecyclePhase {
    /// Request has arrived, nothing parsed yet
    OnRequest,
    /// Before query, body, cookies and session are parsed
    PreParsing,
    /// Request is fully initialized
    PreHandling,
    /// Application logic; the only guarded phase
    OnHandle,
    /// After the handling result has been resolved
    PostHandling,
    /// Response has been prepared, not yet sent
    PreSending,
    /// Response has been handed to the transport
    PostSending,
}

impl LifecyclePhase {
    /// Number of phases
    pub const COUNT: usize = 7;

    /// Every phase, in execution order
    pub const ALL: [LifecyclePhase; Self::COUNT] = [
        LifecyclePhase::OnRequest,
        LifecyclePhase::PreParsing,
        LifecyclePhase::PreHandling,
        LifecyclePhase::OnHandle,
        LifecyclePhase::PostHandling,
        LifecyclePhase::PreSending,
        LifecyclePhase::PostSending,
    ];

    /// Phase name as used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnRequest => "onRequest",
            Self::PreParsing => "preParsing",
            Self::PreHandling => "preHandling",
            Self::OnHandle => "onHandle",
            Self::PostHandling => "postHandling",
            Self::PreSending => "preSending",
            Self::PostSending => "postSending",
        }
    }

    /// Index into [`LifecyclePhase::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
