//! Standard-atmosphere air density for the descent-rate model.
//!
//! The payload's effective descent rate depends on how much denser the air
//! is near the ground than at release altitude, so all this module exposes
//! is the ICAO Standard Atmosphere reduced to a sea-level-relative density
//! ratio. Layers cover the band a high-altitude platform operates in.

use crate::constants::{ATMOSPHERE_CEILING_M, G_ACCEL_MPS2, R_AIR, SEA_LEVEL_AIR_DENSITY};

/// ICAO Standard Atmosphere layer definition
#[derive(Debug, Clone)]
struct AtmosphereLayer {
    /// Base altitude of this layer (m)
    base_altitude: f64,
    /// Temperature at layer base (K)
    base_temperature: f64,
    /// Pressure at layer base (Pa)
    base_pressure: f64,
    /// Temperature lapse rate (K/m)
    lapse_rate: f64,
}

/// ICAO Standard Atmosphere layers up to the stratopause.
/// Base pressures follow the barometric formula between layers.
const ICAO_LAYERS: &[AtmosphereLayer] = &[
    // Troposphere (0 - 11 km)
    AtmosphereLayer {
        base_altitude: 0.0,
        base_temperature: 288.15,
        base_pressure: 101325.0,
        lapse_rate: -0.0065,
    },
    // Tropopause (11 - 20 km), isothermal
    AtmosphereLayer {
        base_altitude: 11000.0,
        base_temperature: 216.65,
        base_pressure: 22632.1,
        lapse_rate: 0.0,
    },
    // Stratosphere 1 (20 - 32 km)
    AtmosphereLayer {
        base_altitude: 20000.0,
        base_temperature: 216.65,
        base_pressure: 5474.89,
        lapse_rate: 0.001,
    },
    // Stratosphere 2 (32 - 47 km)
    AtmosphereLayer {
        base_altitude: 32000.0,
        base_temperature: 228.65,
        base_pressure: 868.02,
        lapse_rate: 0.0028,
    },
];

/// Temperature (K) and pressure (Pa) at an altitude, per the standard
/// atmosphere. Altitude is clamped to the modeled band.
fn standard_atmosphere(altitude_m: f64) -> (f64, f64) {
    let altitude = altitude_m.clamp(0.0, ATMOSPHERE_CEILING_M);

    let layer = ICAO_LAYERS
        .iter()
        .rev()
        .find(|layer| altitude >= layer.base_altitude)
        .unwrap_or(&ICAO_LAYERS[0]);

    let height_diff = altitude - layer.base_altitude;
    let temperature = layer.base_temperature + layer.lapse_rate * height_diff;

    let pressure = if layer.lapse_rate.abs() < 1e-10 {
        // Isothermal layer
        layer.base_pressure
            * (-G_ACCEL_MPS2 * height_diff / (R_AIR * layer.base_temperature)).exp()
    } else {
        let temp_ratio = temperature / layer.base_temperature;
        layer.base_pressure * temp_ratio.powf(-G_ACCEL_MPS2 / (layer.lapse_rate * R_AIR))
    };

    (temperature, pressure)
}

/// Air density (kg/m³) at an altitude under standard conditions.
pub fn air_density(altitude_m: f64) -> f64 {
    let (temperature_k, pressure_pa) = standard_atmosphere(altitude_m);
    pressure_pa / (R_AIR * temperature_k)
}

/// Air density at an altitude relative to sea level.
///
/// Equals 1.0 at the ground and decreases monotonically with altitude
/// (≈ 0.072 at 20 km).
pub fn density_ratio(altitude_m: f64) -> f64 {
    air_density(altitude_m) / SEA_LEVEL_AIR_DENSITY
}
