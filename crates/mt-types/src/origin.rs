use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hypocentre of a candidate source: where and when it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    /// Latitude in degrees north.
    pub latitude: f64,
    /// Longitude in degrees east.
    pub longitude: f64,
    /// Depth below the surface, in metres.
    pub depth_in_m: f64,
    pub time: DateTime<Utc>,
}

impl Origin {
    pub fn new(latitude: f64, longitude: f64, depth_in_m: f64, time: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            depth_in_m,
            time,
        }
    }

    /// Copy of this origin at a different depth; depth scans are built this way.
    pub fn with_depth(&self, depth_in_m: f64) -> Self {
        Self {
            depth_in_m,
            ..self.clone()
        }
    }
}
