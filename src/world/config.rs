use serde::{Deserialize, Serialize};

use crate::collision::broadphase::IndexConfig;
use crate::error::PhysicsError;
use crate::math::scalar::TWO_PI;
use crate::math::vec2::Vec2;

/// Simulation constants consumed when the world is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub substeps: u32,
    /// Positive y points down, as on screen.
    pub gravity: Vec2,
    /// Fraction of linear velocity lost per second.
    pub position_damping: f64,
    /// Fraction of angular velocity lost per second.
    pub angular_damping: f64,
    pub max_position_velocity: f64,
    pub max_angular_velocity: f64,
    pub index: IndexConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            substeps: 5,
            gravity: Vec2::new(0.0, 800.0),
            position_damping: 0.10,
            angular_damping: 0.10,
            max_position_velocity: 4000.0,
            max_angular_velocity: 40.0 * TWO_PI,
            index: IndexConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Gravity off, no damping; handy for checking motion by hand.
    pub fn frictionless() -> Self {
        Self {
            gravity: Vec2::ZERO,
            position_damping: 0.0,
            angular_damping: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        if self.substeps == 0 {
            return Err(invalid("substeps must be at least 1"));
        }
        for (name, value) in [
            ("position_damping", self.position_damping),
            ("angular_damping", self.angular_damping),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(invalid(format!("{} must lie in [0, 1), got {}", name, value)));
            }
        }
        for (name, value) in [
            ("max_position_velocity", self.max_position_velocity),
            ("max_angular_velocity", self.max_angular_velocity),
            ("index.fat_size_factor", self.index.fat_size_factor),
            ("index.fat_velocity_factor", self.index.fat_velocity_factor),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(invalid(format!("{} must be non-negative, got {}", name, value)));
            }
        }
        if self.index.rebalance_interval == 0 {
            return Err(invalid("index.rebalance_interval must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> PhysicsError {
    PhysicsError::InvalidConfig(reason.into())
}
