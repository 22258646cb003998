//! Worker lifecycle

use parking_lot::RwLock;
use pwa_proxy::FetchRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cache::{ActivationReport, CacheInterceptor, Interception};
use crate::error::CoreError;

/// Error type for parsing a lifecycle state
#[derive(Debug, Clone)]
pub struct ParseLifecycleStateError(String);

impl fmt::Display for ParseLifecycleStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid lifecycle state: {}", self.0)
    }
}

impl std::error::Error for ParseLifecycleStateError {}

/// Lifecycle state of a worker
///
/// `uninstalled -> installing -> installed -> activating -> active`,
/// with `redundant` reached when install fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Uninstalled,
    Installing,
    /// Installed and waiting to take control
    Installed,
    Activating,
    Active,
    Redundant,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninstalled => "uninstalled",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = ParseLifecycleStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uninstalled" => Ok(LifecycleState::Uninstalled),
            "installing" => Ok(LifecycleState::Installing),
            "installed" => Ok(LifecycleState::Installed),
            "activating" => Ok(LifecycleState::Activating),
            "active" => Ok(LifecycleState::Active),
            "redundant" => Ok(LifecycleState::Redundant),
            _ => Err(ParseLifecycleStateError(s.to_string())),
        }
    }
}

/// Host driving an interceptor through its lifecycle
///
/// Requests only reach the interceptor once the worker is active; before
/// that they go straight to the network.
pub struct WorkerHost {
    interceptor: Arc<CacheInterceptor>,
    state: RwLock<LifecycleState>,
}

impl WorkerHost {
    pub fn new(interceptor: Arc<CacheInterceptor>) -> Self {
        Self {
            interceptor,
            state: RwLock::new(LifecycleState::Uninstalled),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    pub fn interceptor(&self) -> &Arc<CacheInterceptor> {
        &self.interceptor
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), CoreError> {
        let mut state = self.state.write();
        if *state != from {
            return Err(CoreError::InvalidTransition { from: *state, to });
        }
        info!("Worker {} -> {}", from, to);
        *state = to;
        Ok(())
    }

    /// Run the install phase. A failed install leaves the worker redundant.
    pub async fn install(&self) -> Result<usize, CoreError> {
        self.transition(LifecycleState::Uninstalled, LifecycleState::Installing)?;

        match self.interceptor.install().await {
            Ok(count) => {
                self.transition(LifecycleState::Installing, LifecycleState::Installed)?;
                Ok(count)
            }
            Err(e) => {
                error!("Install failed: {}", e);
                self.transition(LifecycleState::Installing, LifecycleState::Redundant)?;
                Err(e)
            }
        }
    }

    /// Run the activation phase. The worker takes control even if the
    /// stale partition cleanup could not run.
    pub async fn activate(&self) -> Result<ActivationReport, CoreError> {
        self.transition(LifecycleState::Installed, LifecycleState::Activating)?;

        let result = self.interceptor.activate().await;
        if let Err(e) = &result {
            warn!("Activation cleanup failed: {}", e);
        }

        self.transition(LifecycleState::Activating, LifecycleState::Active)?;
        result
    }

    /// Handle an outgoing request
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Interception {
        if self.state() == LifecycleState::Active {
            self.interceptor.intercept(request).await
        } else {
            self.interceptor.passthrough(request).await
        }
    }
}
