/// Best-effort location tagging
///
/// A fix is raced against a deadline. Losing the race, or having no
/// provider at all, only means the photo is stored without coordinates.
use std::future::Future;
use std::time::Duration;

use crate::error::LocationUnavailable;
use crate::state::Coordinates;

/// Longest a capture waits for a location fix
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(5);

pub trait LocationProvider: Send + Sync {
    /// Ask the device for its current position
    fn current_fix(
        &self,
    ) -> impl Future<Output = Result<Coordinates, LocationUnavailable>> + Send;
}

/// Devices without any positioning
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    async fn current_fix(&self) -> Result<Coordinates, LocationUnavailable> {
        Err(LocationUnavailable::Unavailable("no location provider".into()))
    }
}

/// A position configured for the device (e.g. a crew truck's depot)
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

impl LocationProvider for FixedLocation {
    async fn current_fix(&self) -> Result<Coordinates, LocationUnavailable> {
        Ok(self.0)
    }
}

/// Either of the above, picked from config
#[derive(Debug, Clone, Copy)]
pub enum ConfiguredLocation {
    Fixed(FixedLocation),
    Unavailable(NoLocation),
}

impl ConfiguredLocation {
    pub fn from_config(coordinates: Option<Coordinates>) -> Self {
        match coordinates {
            Some(c) => ConfiguredLocation::Fixed(FixedLocation(c)),
            None => ConfiguredLocation::Unavailable(NoLocation),
        }
    }
}

impl LocationProvider for ConfiguredLocation {
    async fn current_fix(&self) -> Result<Coordinates, LocationUnavailable> {
        match self {
            ConfiguredLocation::Fixed(fixed) => fixed.current_fix().await,
            ConfiguredLocation::Unavailable(none) => none.current_fix().await,
        }
    }
}

/// Race a fix against `limit`. Never waits longer than `limit`.
pub async fn fix_within<L: LocationProvider>(
    provider: &L,
    limit: Duration,
) -> Result<Coordinates, LocationUnavailable> {
    match tokio::time::timeout(limit, provider.current_fix()).await {
        Ok(fix) => fix,
        Err(_) => Err(LocationUnavailable::TimedOut),
    }
}
