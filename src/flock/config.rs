// Initialization-time parameters for the flock simulation.
//
// Everything here is fixed for the lifetime of a FlockSimulation except the
// steering weights, which can be retuned live through set_weights().

use std::path::Path;

use glam::{DVec3, Vec3};
use serde::{Deserialize, Serialize};

use super::error::{FlockError, Result};

/// Scale of each steering force before they are summed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringWeights {
    /// Push away from the cell's mean position.
    pub separation: f32,
    /// Pull toward the cell's mean heading.
    pub alignment: f32,
    /// Pull toward the nearest target.
    pub target: f32,
}

impl Default for SteeringWeights {
    fn default() -> Self {
        Self {
            separation: 0.7,
            alignment: 1.0,
            target: 0.8,
        }
    }
}

/// Periodic modulation of the target weight ("the shoal breathes").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breathing {
    /// Relative swing in [0, 1]. 0 keeps the target weight constant.
    pub amplitude: f32,
    pub period_secs: f32,
}

impl Breathing {
    pub const NONE: Breathing = Breathing {
        amplitude: 0.0,
        period_secs: 1.0,
    };

    /// Multiplier applied to the target weight at world time `t`.
    pub fn factor(&self, t: f64) -> f32 {
        if self.amplitude == 0.0 {
            return 1.0;
        }
        let phase = std::f64::consts::TAU * t / self.period_secs as f64;
        1.0 + self.amplitude * phase.sin() as f32
    }
}

impl Default for Breathing {
    fn default() -> Self {
        Self {
            amplitude: 0.6,
            period_secs: 9.0,
        }
    }
}

/// A point moving independently along each axis:
/// `center + amplitude * sin(angular_speed * t + phase)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub center: Vec3,
    pub amplitude: Vec3,
    /// Radians per second, per axis.
    pub angular_speed: Vec3,
    pub phase: Vec3,
}

impl Orbit {
    pub fn position(&self, t: f64) -> Vec3 {
        let angle = self.angular_speed.as_dvec3() * t + self.phase.as_dvec3();
        let wave = DVec3::new(angle.x.sin(), angle.y.sin(), angle.z.sin());
        self.center + self.amplitude * wave.as_vec3()
    }
}

/// Where the steering targets come from each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetPattern {
    /// Targets follow their orbits as world time advances.
    Orbiting(Vec<Orbit>),
    /// Targets never move.
    Static(Vec<Vec3>),
}

impl TargetPattern {
    pub fn len(&self) -> usize {
        match self {
            TargetPattern::Orbiting(orbits) => orbits.len(),
            TargetPattern::Static(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TargetPattern {
    fn default() -> Self {
        TargetPattern::Orbiting(vec![
            Orbit {
                center: Vec3::ZERO,
                amplitude: Vec3::new(6.0, 2.0, 6.0),
                angular_speed: Vec3::new(0.31, 0.53, 0.31),
                phase: Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            },
            Orbit {
                center: Vec3::new(0.0, 1.0, 0.0),
                amplitude: Vec3::new(4.0, 4.0, 3.0),
                angular_speed: Vec3::new(0.23, 0.17, 0.41),
                phase: Vec3::new(1.3, 0.4, 2.2),
            },
            Orbit {
                center: Vec3::new(0.0, -1.0, 0.0),
                amplitude: Vec3::new(7.0, 1.5, 5.0),
                angular_speed: Vec3::new(0.13, 0.29, 0.19),
                phase: Vec3::new(3.1, 2.0, 0.7),
            },
        ])
    }
}

/// Parameters fixed at initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub agent_count: usize,
    /// Side of one spatial-hash cube in world units.
    pub cell_radius: f32,
    pub weights: SteeringWeights,
    /// Spawn speeds are uniform in `[speed_min, speed_max]`.
    pub speed_min: f32,
    pub speed_max: f32,
    /// Agents spawn uniformly inside `[-spawn_extent, spawn_extent]^3`.
    pub spawn_extent: f32,
    pub targets: TargetPattern,
    pub breathing: Breathing,
    /// Worker threads. `None` uses one per hardware thread.
    pub threads: Option<usize>,
    /// RNG seed for spawning. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Frame deltas above this are clamped (resume from pause, debugger).
    pub max_frame_dt: f32,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            agent_count: 100_000,
            cell_radius: 0.5,
            weights: SteeringWeights::default(),
            speed_min: 0.8,
            speed_max: 1.6,
            spawn_extent: 8.0,
            targets: TargetPattern::default(),
            breathing: Breathing::default(),
            threads: None,
            seed: None,
            max_frame_dt: 0.1,
        }
    }
}

impl FlockConfig {
    /// Read a RON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    pub fn from_ron(text: &str) -> Result<Self> {
        let config: FlockConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_agent_count(mut self, agent_count: usize) -> Self {
        self.agent_count = agent_count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every parameter, reporting the first problem found.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: impl Into<String>) -> Result<()> {
            Err(FlockError::InvalidConfig(msg.into()))
        }

        if self.agent_count == 0 {
            return invalid("agent_count must be at least 1");
        }
        if self.agent_count > u32::MAX as usize {
            return invalid("agent_count must fit in 32 bits");
        }
        if !(self.cell_radius.is_finite() && self.cell_radius > 0.0) {
            return invalid(format!("cell_radius must be positive, got {}", self.cell_radius));
        }
        let w = self.weights;
        for (name, value) in [
            ("separation", w.separation),
            ("alignment", w.alignment),
            ("target", w.target),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(format!("{name} weight must be finite and >= 0, got {value}"));
            }
        }
        if !(self.speed_min.is_finite() && self.speed_max.is_finite()) {
            return invalid("speed range must be finite");
        }
        if self.speed_min < 0.0 || self.speed_min > self.speed_max {
            return invalid(format!(
                "speed range [{}, {}] is empty or negative",
                self.speed_min, self.speed_max
            ));
        }
        if !(self.spawn_extent.is_finite() && self.spawn_extent >= 0.0) {
            return invalid("spawn_extent must be finite and >= 0");
        }
        if !(0.0..=1.0).contains(&self.breathing.amplitude) {
            return invalid(format!(
                "breathing amplitude must be in [0, 1], got {}",
                self.breathing.amplitude
            ));
        }
        if !(self.breathing.period_secs.is_finite() && self.breathing.period_secs > 0.0) {
            return invalid("breathing period must be positive");
        }
        if !(self.max_frame_dt.is_finite() && self.max_frame_dt > 0.0) {
            return invalid("max_frame_dt must be positive");
        }
        if self.threads == Some(0) {
            return invalid("threads must be at least 1 when set");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        FlockConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            FlockConfig { agent_count: 0, ..Default::default() },
            FlockConfig { cell_radius: 0.0, ..Default::default() },
            FlockConfig { cell_radius: f32::NAN, ..Default::default() },
            FlockConfig {
                weights: SteeringWeights { alignment: -1.0, ..Default::default() },
                ..Default::default()
            },
            FlockConfig { speed_min: 2.0, speed_max: 1.0, ..Default::default() },
            FlockConfig {
                breathing: Breathing { amplitude: 1.5, period_secs: 2.0 },
                ..Default::default()
            },
            FlockConfig { max_frame_dt: 0.0, ..Default::default() },
            FlockConfig { threads: Some(0), ..Default::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(FlockError::InvalidConfig(_))),
                "accepted {config:?}"
            );
        }
    }

    #[test]
    fn parses_partial_ron() {
        let text = r#"(
            agent_count: 500,
            cell_radius: 2.0,
            weights: (alignment: 0.25),
            targets: Static([(10.0, 0.0, 0.0)]),
            seed: Some(9),
        )"#;
        let config = FlockConfig::from_ron(text).unwrap();
        assert_eq!(config.agent_count, 500);
        assert_eq!(config.cell_radius, 2.0);
        assert_eq!(config.weights.alignment, 0.25);
        assert_eq!(config.weights.separation, SteeringWeights::default().separation);
        assert_eq!(config.targets, TargetPattern::Static(vec![Vec3::new(10.0, 0.0, 0.0)]));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.threads, None);
    }

    #[test]
    fn invalid_ron_values_are_rejected() {
        let err = FlockConfig::from_ron("(agent_count: 0)").unwrap_err();
        assert!(matches!(err, FlockError::InvalidConfig(_)));
        let err = FlockConfig::from_ron("(agent_count: \"lots\")").unwrap_err();
        assert!(matches!(err, FlockError::ConfigParse(_)));
    }

    #[test]
    fn breathing_oscillates_around_one() {
        let b = Breathing { amplitude: 0.5, period_secs: 4.0 };
        assert!((b.factor(0.0) - 1.0).abs() < 1e-6);
        assert!((b.factor(1.0) - 1.5).abs() < 1e-6);
        assert!((b.factor(3.0) - 0.5).abs() < 1e-6);
        assert_eq!(Breathing::NONE.factor(123.4), 1.0);
    }

    #[test]
    fn orbit_moves_per_axis() {
        let orbit = Orbit {
            center: Vec3::new(1.0, 2.0, 3.0),
            amplitude: Vec3::new(2.0, 0.0, 1.0),
            angular_speed: Vec3::new(std::f32::consts::FRAC_PI_2, 1.0, 0.0),
            phase: Vec3::ZERO,
        };
        assert!((orbit.position(0.0) - orbit.center).length() < 1e-6);
        let p = orbit.position(1.0);
        assert!((p - Vec3::new(3.0, 2.0, 3.0)).length() < 1e-5);
    }
}
