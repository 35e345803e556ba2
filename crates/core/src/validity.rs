use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time window in which an auth token is usable.
///
/// Tokens expose it through [`AuthToken::validity`](crate::AuthToken::validity);
/// expiry validators consume it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at, or out of range)")]
    InvalidTimeWindow,
}

impl Validity {
    pub fn new(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            issued_at,
            expires_at,
        }
    }

    /// Starting at `issued_at`, valid for `ttl`.
    ///
    /// Fails with [`TokenValidationError::InvalidTimeWindow`] when the expiry
    /// falls outside the representable date range.
    pub fn starting_at(
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<Self, TokenValidationError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or(TokenValidationError::InvalidTimeWindow)?;
        Ok(Self::new(issued_at, expires_at))
    }

    /// Deterministically check the window against `now`.
    ///
    /// `leeway` widens both ends of the window to absorb clock skew; a leeway
    /// reaching past the representable range saturates.
    pub fn check(
        &self,
        now: DateTime<Utc>,
        leeway: chrono::Duration,
    ) -> Result<(), TokenValidationError> {
        if self.expires_at <= self.issued_at {
            return Err(TokenValidationError::InvalidTimeWindow);
        }
        let latest = now.checked_add_signed(leeway).unwrap_or(DateTime::<Utc>::MAX_UTC);
        if latest < self.issued_at {
            return Err(TokenValidationError::NotYetValid);
        }
        let earliest = now.checked_sub_signed(leeway).unwrap_or(DateTime::<Utc>::MIN_UTC);
        if earliest >= self.expires_at {
            return Err(TokenValidationError::Expired);
        }
        Ok(())
    }
}
