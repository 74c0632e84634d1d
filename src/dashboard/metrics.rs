//! Metric Renderer
//!
//! Writes the latest readings into the three reading targets.

use super::{Measurement, Metric};
use crate::render::DashboardSurface;

/// Temperature and humidity: one decimal place
pub fn format_one_decimal(value: f64) -> String {
    format!("{:.1}", value)
}

/// CO2: rounded to the nearest whole ppm, halves away from zero
pub fn format_co2(value: f64) -> String {
    format!("{:.0}", value.round())
}

/// Write the latest readings
///
/// An absent measurement leaves whatever is on screen. A measurement with a
/// missing field leaves only that reading untouched.
pub fn render_readings<S: DashboardSurface + ?Sized>(
    surface: &mut S,
    measurement: Option<&Measurement>,
) {
    let Some(measurement) = measurement else {
        tracing::debug!("No latest measurement, keeping previous readings");
        return;
    };

    let readings = [
        (Metric::Temperature, measurement.temperature.map(format_one_decimal)),
        (Metric::Humidity, measurement.humidity.map(format_one_decimal)),
        (Metric::Co2, measurement.co2.map(format_co2)),
    ];

    for (metric, text) in readings {
        match text {
            Some(text) => surface.set_reading(metric, &text),
            None => tracing::debug!("Latest measurement has no {}", metric),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemorySurface;

    #[test]
    fn test_formatting() {
        assert_eq!(format_one_decimal(23.456), "23.5");
        assert_eq!(format_one_decimal(22.34), "22.3");
        assert_eq!(format_one_decimal(55.6), "55.6");
        assert_eq!(format_one_decimal(-3.0), "-3.0");
        assert_eq!(format_co2(412.6), "413");
        assert_eq!(format_co2(410.0), "410");
        assert_eq!(format_co2(412.5), "413");
    }

    #[test]
    fn test_renders_all_three() {
        let mut surface = MemorySurface::default();
        let measurement = Measurement {
            temperature: Some(22.34),
            humidity: Some(55.6),
            co2: Some(410.0),
            timestamp: None,
        };

        render_readings(&mut surface, Some(&measurement));

        assert_eq!(surface.readings[&Metric::Temperature], "22.3");
        assert_eq!(surface.readings[&Metric::Humidity], "55.6");
        assert_eq!(surface.readings[&Metric::Co2], "410");
    }

    #[test]
    fn test_absent_measurement_keeps_previous() {
        let mut surface = MemorySurface::default();
        surface.set_reading(Metric::Temperature, "19.0");
        surface.set_reading(Metric::Co2, "700");

        render_readings(&mut surface, None);

        assert_eq!(surface.readings[&Metric::Temperature], "19.0");
        assert_eq!(surface.readings[&Metric::Co2], "700");
        assert!(!surface.readings.contains_key(&Metric::Humidity));
    }

    #[test]
    fn test_missing_field_keeps_that_reading() {
        let mut surface = MemorySurface::default();
        surface.set_reading(Metric::Humidity, "40.0");

        let measurement = Measurement {
            temperature: Some(20.04),
            humidity: None,
            co2: Some(999.4),
            timestamp: None,
        };
        render_readings(&mut surface, Some(&measurement));

        assert_eq!(surface.readings[&Metric::Temperature], "20.0");
        assert_eq!(surface.readings[&Metric::Humidity], "40.0");
        assert_eq!(surface.readings[&Metric::Co2], "999");
    }
}
