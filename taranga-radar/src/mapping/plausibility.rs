//! Plausibility gating for radar returns.
//!
//! Three sigmoid gates (range, azimuth off boresight, amplitude) are
//! combined into one weight in `[0, 1]` that scales occupancy updates.

use crate::core::math::{rad_to_deg, wrap_deg_to_180};

use super::settings::{GridSettings, PlausibilityCombination};

/// Slope constant chosen so the sigmoid covers 90% of its swing across one
/// bandwidth: `ln(0.9 / 0.1) * 2`.
const GROWTH_SCALE: f32 = 4.394_449_15;

/// Precomputed plausibility evaluator for one settings generation.
#[derive(Clone, Copy, Debug)]
pub struct PlausibilityModel {
    enabled: bool,
    range_growth: f32,
    range_midpoint: f32,
    azimuth_growth: f32,
    azimuth_midpoint: f32,
    amplitude_growth: f32,
    amplitude_midpoint: f32,
    combination: PlausibilityCombination,
    custom_range_threshold_m: f32,
}

impl PlausibilityModel {
    pub fn new(settings: &GridSettings) -> PlausibilityModel {
        PlausibilityModel {
            enabled: settings.enable_plausibility_scaling,
            // Range and azimuth gates fall off with the signal; amplitude rises.
            range_growth: -growth_rate(settings.range_plausibility.bandwidth),
            range_midpoint: settings.range_plausibility.midpoint,
            azimuth_growth: -growth_rate(settings.azimuth_plausibility.bandwidth),
            azimuth_midpoint: settings.azimuth_plausibility.midpoint,
            amplitude_growth: growth_rate(settings.amplitude_plausibility.bandwidth),
            amplitude_midpoint: settings.amplitude_plausibility.midpoint,
            combination: settings.combination,
            custom_range_threshold_m: settings.custom_combination_range_threshold_m,
        }
    }

    /// Combined plausibility of a return, clamped to `[0, 1]`.
    pub fn evaluate(&self, range_m: f32, azimuth_rad: f32, amplitude_dbsm: f32) -> f32 {
        if !self.enabled {
            return 1.0;
        }

        let range = sigmoid(range_m, self.range_growth, self.range_midpoint);
        let azimuth_deg = wrap_deg_to_180(rad_to_deg(azimuth_rad)).abs();
        let azimuth = sigmoid(azimuth_deg, self.azimuth_growth, self.azimuth_midpoint);
        let amplitude = sigmoid(amplitude_dbsm, self.amplitude_growth, self.amplitude_midpoint);

        let combined = match self.combination {
            PlausibilityCombination::Average => (range + azimuth + amplitude) / 3.0,
            PlausibilityCombination::Product => range * azimuth * amplitude,
            PlausibilityCombination::Minimum => range.min(azimuth).min(amplitude),
            PlausibilityCombination::Custom => {
                if range_m > self.custom_range_threshold_m {
                    range.min(azimuth) * amplitude
                } else {
                    range * amplitude
                }
            }
        };

        combined.clamp(0.0, 1.0)
    }
}

fn growth_rate(bandwidth: f32) -> f32 {
    if bandwidth <= 0.0 {
        0.0
    } else {
        GROWTH_SCALE / bandwidth
    }
}

fn sigmoid(value: f32, growth: f32, midpoint: f32) -> f32 {
    1.0 / (1.0 + (-growth * (value - midpoint)).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model_with(combination: PlausibilityCombination) -> PlausibilityModel {
        let settings = GridSettings {
            combination,
            ..Default::default()
        };
        PlausibilityModel::new(&settings)
    }

    #[test]
    fn test_disabled_returns_one() {
        let settings = GridSettings {
            enable_plausibility_scaling: false,
            ..Default::default()
        };
        let model = PlausibilityModel::new(&settings);
        assert_relative_eq!(model.evaluate(500.0, 3.0, -80.0), 1.0);
    }

    #[test]
    fn test_monotonic_in_range() {
        let model = model_with(PlausibilityCombination::Minimum);
        let near = model.evaluate(2.0, 0.0, 10.0);
        let far = model.evaluate(40.0, 0.0, 10.0);
        assert!(near > far);
    }

    #[test]
    fn test_monotonic_in_amplitude() {
        let model = model_with(PlausibilityCombination::Minimum);
        let strong = model.evaluate(5.0, 0.0, 20.0);
        let weak = model.evaluate(5.0, 0.0, -60.0);
        assert!(strong > weak);
    }

    #[test]
    fn test_custom_switches_on_range_threshold() {
        let model = model_with(PlausibilityCombination::Custom);
        // Below the threshold the azimuth gate is ignored entirely.
        let wide_angle = model.evaluate(5.0, 3.0, 10.0);
        let boresight = model.evaluate(5.0, 0.0, 10.0);
        assert_relative_eq!(wide_angle, boresight, epsilon = 1e-6);

        // Beyond the threshold a wide angle costs plausibility.
        let wide_far = model.evaluate(20.0, 3.0, 10.0);
        let boresight_far = model.evaluate(20.0, 0.0, 10.0);
        assert!(wide_far < boresight_far);
    }

    #[test]
    fn test_combination_relationships() {
        let range = 12.0;
        let azimuth = 0.4;
        let amplitude = -10.0;
        let product = model_with(PlausibilityCombination::Product).evaluate(
            range, azimuth, amplitude,
        );
        let minimum = model_with(PlausibilityCombination::Minimum).evaluate(
            range, azimuth, amplitude,
        );
        let average = model_with(PlausibilityCombination::Average).evaluate(
            range, azimuth, amplitude,
        );
        assert!(product <= minimum + 1e-6);
        assert!(minimum <= average + 1e-6);
    }

    #[test]
    fn test_zero_bandwidth_disables_axis() {
        let mut settings = GridSettings {
            combination: PlausibilityCombination::Minimum,
            ..Default::default()
        };
        settings.range_plausibility.bandwidth = 0.0;
        let model = PlausibilityModel::new(&settings);
        // Flat range gate contributes exactly one half everywhere.
        let near = model.evaluate(1.0, 0.0, 50.0);
        let far = model.evaluate(90.0, 0.0, 50.0);
        assert_relative_eq!(near, far, epsilon = 1e-6);
    }
}
