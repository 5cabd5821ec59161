//! Shared-secret access gateway.

use std::fmt;

use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::{ServerError, ServerResult};

/// Checks the application token on every mutating request.
///
/// Only the blake3 digest of the secret is kept. Comparing digests makes the
/// check constant time regardless of the provided value's length.
#[derive(Clone)]
pub struct AccessGateway {
    digest: [u8; 32],
}

impl AccessGateway {
    /// Creates a gateway accepting `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            digest: *blake3::hash(secret.as_bytes()).as_bytes(),
        }
    }

    /// Returns true if `provided` matches the configured secret.
    pub fn authorize(&self, provided: &str) -> bool {
        let candidate = blake3::hash(provided.as_bytes());
        let ok: bool = self.digest.ct_eq(candidate.as_bytes()).into();
        if !ok {
            warn!(provided_len = provided.len(), "rejected invalid application token");
        }
        ok
    }

    /// Like [`authorize`](Self::authorize), as a `Result` for handlers.
    pub fn require(&self, provided: &str) -> ServerResult<()> {
        if self.authorize(provided) {
            Ok(())
        } else {
            Err(ServerError::Unauthorized)
        }
    }
}

impl fmt::Debug for AccessGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGateway")
            .field("digest", &"[REDACTED]")
            .finish()
    }
}
