//! Seedable random source for headless matches

use bevy::prelude::*;
use rand::prelude::*;

/// Match-wide RNG. Seeded matches replay identically.
#[derive(Resource)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic)
    pub seed: Option<u64>,
}

impl GameRng {
    /// Create a new GameRng with a specific seed for deterministic behavior
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Create a new GameRng with random entropy (non-deterministic)
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Build from an optional seed, logging which mode is in use
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => {
                info!("Using deterministic RNG with seed: {}", seed);
                Self::from_seed(seed)
            }
            None => {
                info!("Using non-deterministic RNG (no seed provided)");
                Self::from_entropy()
            }
        }
    }

    /// Uniform value in [0, 1)
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Uniform value in [min, max)
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random_f32() * (max - min)
    }

    /// Random offset on the XZ plane within a disc of `radius`
    pub fn planar_offset(&mut self, radius: f32) -> Vec3 {
        if radius <= 0.0 {
            return Vec3::ZERO;
        }
        let angle = self.random_range(0.0, std::f32::consts::TAU);
        let distance = radius * self.random_f32().sqrt();
        Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance)
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
