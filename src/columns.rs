//! Column names of the migration dataset.

pub const WIND_SPEED: &str = "Wind_Speed_kmph";
pub const FLIGHT_DISTANCE: &str = "Flight_Distance_km";
pub const MIGRATION_SUCCESS: &str = "Migration_Success";
pub const FLOCK_SIZE: &str = "Flock_Size";
pub const SPECIES: &str = "Species";
pub const REGION: &str = "Region";
pub const AVERAGE_SPEED: &str = "Average_Speed_kmph";
pub const WEATHER_CONDITION: &str = "Weather_Condition";
pub const HABITAT: &str = "Habitat";
pub const MIGRATION_REASON: &str = "Migration_Reason";

/// Derived: `Migration_Success` encoded as 1/0
pub const MIGRATION_SUCCESS_ENCODED: &str = "Migration_Success_Encoded";
