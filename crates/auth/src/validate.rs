//! Validator aggregate and the built-in expiry validator.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use warden_core::{AuthError, AuthResult, AuthToken, AuthTokenValidator};

/// Merges many validators into one.
///
/// Validators run in order; the first failure is returned and the rest are
/// not consulted.
#[derive(Clone, Default)]
pub struct AuthTokenValidators(Vec<Arc<dyn AuthTokenValidator>>);

impl AuthTokenValidators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: Arc<dyn AuthTokenValidator>) -> Self {
        self.0.push(validator);
        self
    }

    pub fn push(&mut self, validator: Arc<dyn AuthTokenValidator>) {
        self.0.push(validator);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Arc<dyn AuthTokenValidator>>> for AuthTokenValidators {
    fn from(value: Vec<Arc<dyn AuthTokenValidator>>) -> Self {
        Self(value)
    }
}

#[async_trait]
impl AuthTokenValidator for AuthTokenValidators {
    async fn validate_pre_refill(&self, token: &dyn AuthToken) -> AuthResult<()> {
        for validator in &self.0 {
            validator.validate_pre_refill(token).await?;
        }
        Ok(())
    }

    async fn validate_after_refill(&self, token: &dyn AuthToken) -> AuthResult<()> {
        for validator in &self.0 {
            validator.validate_after_refill(token).await?;
        }
        Ok(())
    }
}

/// Checkpoint(s) at which [`ExpiryValidator`] checks the time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationStage {
    /// The window survives stripping, so it can be checked before refill.
    #[default]
    PreRefill,
    /// The window is only known once a refiller populated it.
    AfterRefill,
    Both,
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Rejects tokens whose [`Validity`](warden_core::Validity) window does not
/// contain the current time.
///
/// Tokens that do not expose a window pass unless
/// [`require_validity`](Self::require_validity) is set.
#[derive(Clone)]
pub struct ExpiryValidator {
    stage: ValidationStage,
    leeway: Duration,
    require_validity: bool,
    clock: Clock,
}

impl Default for ExpiryValidator {
    fn default() -> Self {
        Self {
            stage: ValidationStage::default(),
            leeway: Duration::zero(),
            require_validity: false,
            clock: Arc::new(Utc::now),
        }
    }
}

impl ExpiryValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at_stage(mut self, stage: ValidationStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Reject tokens that do not expose a validity window at all.
    pub fn require_validity(mut self) -> Self {
        self.require_validity = true;
        self
    }

    /// Replace the wall clock, mostly useful for tests.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn check(&self, token: &dyn AuthToken) -> AuthResult<()> {
        match token.validity() {
            Some(window) => Ok(window.check((self.clock)(), self.leeway)?),
            None if self.require_validity => {
                Err(AuthError::rejected("auth token has no validity window"))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AuthTokenValidator for ExpiryValidator {
    async fn validate_pre_refill(&self, token: &dyn AuthToken) -> AuthResult<()> {
        match self.stage {
            ValidationStage::PreRefill | ValidationStage::Both => self.check(token),
            ValidationStage::AfterRefill => Ok(()),
        }
    }

    async fn validate_after_refill(&self, token: &dyn AuthToken) -> AuthResult<()> {
        match self.stage {
            ValidationStage::AfterRefill | ValidationStage::Both => self.check(token),
            ValidationStage::PreRefill => Ok(()),
        }
    }
}
