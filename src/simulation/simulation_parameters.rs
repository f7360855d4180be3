use crate::{floating_type_mod::FT, vec2f, V2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Construction-time configuration failure. Bad configuration is fatal at
/// simulation creation, never a per-step condition.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("invalid scene: {0}")]
    InvalidScene(String),
}

/// All tuning constants of the simulation. Fixed at construction; there is no
/// per-step parameter injection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub gravity: V2,
    pub dt: FT,

    /// Desired rest distance between two particles.
    pub target_separation: FT,

    /// Distance threshold for neighbor discovery, compared as squared
    /// distance. Deliberately distinct from `target_separation` (usually
    /// twice as large) so the solver sees pairs approaching violation, not
    /// only pairs already violating.
    pub radius_of_interest: FT,

    /// Number of Gauss-Seidel relaxation passes per step.
    pub iteration_count: usize,

    /// Fraction (0-1) of the computed separation correction applied per
    /// contact per pass.
    pub stiffness: FT,

    /// Amplitude of the uniform positional jitter injected each step.
    pub heat_constant: FT,

    pub damping: FT,

    pub seabed_gradient: FT,
    pub seabed_start_x: FT,

    /// RNG seed for the shared random stream. `None` seeds from entropy,
    /// `Some` gives reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        let target_separation = 20.;
        SimulationParams {
            gravity: vec2f(0., 1.),
            dt: 0.1,
            target_separation,
            radius_of_interest: 2. * target_separation,
            iteration_count: 2,
            stiffness: 0.5,
            heat_constant: 0.2,
            damping: 1.0,
            seabed_gradient: 0.05,
            seabed_start_x: 800.,
            seed: None,
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive_finite(name: &str, value: FT) -> Result<(), ConfigError> {
            if !value.is_finite() || value <= 0. {
                return Err(ConfigError::InvalidParam(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
            Ok(())
        }

        positive_finite("dt", self.dt)?;
        positive_finite("target_separation", self.target_separation)?;
        positive_finite("radius_of_interest", self.radius_of_interest)?;

        for (name, value) in [
            ("stiffness", self.stiffness),
            ("heat_constant", self.heat_constant),
            ("damping", self.damping),
            ("seabed_gradient", self.seabed_gradient),
            ("seabed_start_x", self.seabed_start_x),
            ("gravity.x", self.gravity.x),
            ("gravity.y", self.gravity.y),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidParam(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

#[test]
fn default_params_pass_validation() {
    let params = SimulationParams::default();
    params.validate().unwrap();
    assert_eq!(params.radius_of_interest, 2. * params.target_separation);
}

#[test]
fn non_positive_dt_is_rejected() {
    let mut params = SimulationParams::default();
    params.dt = 0.;
    assert!(params.validate().is_err());
    params.dt = -0.1;
    assert!(params.validate().is_err());
    params.dt = FT::NAN;
    assert!(params.validate().is_err());
}

#[test]
fn non_finite_stiffness_is_rejected() {
    let mut params = SimulationParams::default();
    params.stiffness = FT::INFINITY;
    assert!(params.validate().is_err());
}

#[test]
fn params_yaml_roundtrip() {
    let mut params = SimulationParams::default();
    params.seed = Some(1234);
    params.stiffness = 0.75;

    let yaml = serde_yaml::to_string(&params).unwrap();
    let back: SimulationParams = serde_yaml::from_str(&yaml).unwrap();

    assert_eq!(back.seed, Some(1234));
    assert_eq!(back.stiffness, 0.75);
    assert_eq!(back.gravity, params.gravity);
    assert_eq!(back.iteration_count, params.iteration_count);
}

#[test]
fn missing_yaml_fields_take_defaults() {
    let params: SimulationParams = serde_yaml::from_str("stiffness: 0.9").unwrap();
    assert_eq!(params.stiffness, 0.9);
    assert_eq!(params.dt, SimulationParams::default().dt);
    assert_eq!(params.seed, None);
}
