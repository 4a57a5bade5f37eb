use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
pub enum HealthStatus {
    #[serde(rename = "ok")]
    Healthy,
    #[serde(rename = "error")]
    Unhealthy,
}

/// Body of the `/health` route.
///
/// The proxy holds no connections of its own, so a responding server is
/// healthy. Upstream availability is not checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthState {
    pub health: HealthStatus,
}

impl HealthState {
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            health: HealthStatus::Healthy,
        }
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self.health, HealthStatus::Healthy)
    }
}
