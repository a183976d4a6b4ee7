use std::fmt;

/// An error translating bytes to or from the wire protocol.
///
/// These indicate a state-machine desynchronization — an unexpected message
/// tag at a point where only a small, known set was possible — and are
/// always fatal to the session.
pub enum ProtocolError {
    Unexpected {
        expect: &'static str,
        found: u8,
        phase: &'static str,
    },
    UnsupportedAuth {
        code: u32,
    },
    Malformed {
        reason: &'static str,
    },
}

impl ProtocolError {
    pub(crate) fn unexpected(expect: &'static str, found: u8, phase: &'static str) -> Self {
        Self::Unexpected { expect, found, phase }
    }

    pub(crate) fn malformed(reason: &'static str) -> Self {
        Self::Malformed { reason }
    }
}

impl std::error::Error for ProtocolError {}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unexpected { expect, found, phase } => write!(
                f,
                "protocol error during {phase}: expected {expect}, found message tag {:?}",
                *found as char
            ),
            Self::UnsupportedAuth { code } => {
                write!(f, "unsupported authentication method requested by server: {code}")
            }
            Self::Malformed { reason } => write!(f, "malformed message: {reason}"),
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
