use std::collections::HashSet;

use tracing::{info, trace, warn};

use crate::collision::broadphase::{KdTree, SpatialIndex};
use crate::collision::{collide, ClosestPoints, ContactHalf};
use crate::error::{IndexError, PhysicsError};
use crate::integration::integrator::{clamp_and_seed_history, integrate_substep, publish_velocities, VerletCoefficients};
use crate::math::scalar::EPS;
use crate::math::vec2::Vec2;
use crate::objects::rigid_body::{BodyId, RigidBody};

use super::config::WorldConfig;

/// Owns every body and the broad-phase index over them.
///
/// Bodies are addressed by [`BodyId`], which is their position in the body
/// list; ids are assigned when the world is built and never change.
#[derive(Debug)]
pub struct World<I = KdTree<BodyId>> {
    bodies: Vec<RigidBody>,
    index: I,
    config: WorldConfig,
    contacts: Vec<ContactHalf>,
    notables: Vec<Vec2>,
    // Scratch list reused by every broad-phase query.
    candidates: Vec<BodyId>,
    // Pairs already solved in the current substep, as (lower, higher).
    solved: HashSet<(usize, usize)>,
}

impl World {
    /// Builds a world indexed by a [`KdTree`] configured from `config.index`.
    pub fn new(config: WorldConfig, bodies: Vec<RigidBody>) -> Result<Self, PhysicsError> {
        Self::with_index(config, bodies, KdTree::new(config.index))
    }
}

impl<I: SpatialIndex<BodyId>> World<I> {
    /// Builds a world on top of any spatial index. The index must be empty.
    pub fn with_index(config: WorldConfig, mut bodies: Vec<RigidBody>, index: I) -> Result<Self, PhysicsError> {
        config.validate()?;
        if !index.is_empty() {
            return Err(PhysicsError::InvalidConfig(format!(
                "spatial index must start empty, it holds {} keys",
                index.len()
            )));
        }
        for (i, body) in bodies.iter_mut().enumerate() {
            body.id = BodyId(i);
            body.refresh_cache();
        }
        let mut world = Self {
            bodies,
            index,
            config,
            contacts: Vec::new(),
            notables: Vec::new(),
            candidates: Vec::new(),
            solved: HashSet::new(),
        };
        world.reindex_all()?;
        info!(
            bodies = world.bodies.len(),
            dynamic = world.bodies.iter().filter(|b| b.is_dynamic()).count(),
            substeps = config.substeps,
            "world created"
        );
        Ok(world)
    }

    // --- Accessors ---

    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    /// Mutable access for external edits. Call [`World::update_body`]
    /// afterwards so the cache and the index catch up.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.0)
    }

    /// Half contacts from the last substep of the last step.
    pub fn contacts(&self) -> &[ContactHalf] {
        &self.contacts
    }

    /// Candidate points the solver looked at during the last substep.
    pub fn notable_points(&self) -> &[Vec2] {
        &self.notables
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // --- External edits between steps ---

    /// Refreshes the body's cache from its position and angle and
    /// re-inserts it into the index.
    pub fn update_body(&mut self, id: BodyId) -> Result<(), PhysicsError> {
        let body = self.bodies.get_mut(id.0).ok_or(PhysicsError::UnknownBody(id))?;
        body.refresh_cache();
        self.index.add_or_update(&self.bodies[id.0])?;
        Ok(())
    }

    /// Moves a body to `position` and stops its linear motion.
    pub fn teleport(&mut self, id: BodyId, position: Vec2) -> Result<(), PhysicsError> {
        let body = self.bodies.get_mut(id.0).ok_or(PhysicsError::UnknownBody(id))?;
        body.position = position;
        body.last_position = position;
        body.linear_velocity = Vec2::ZERO;
        self.update_body(id)
    }

    pub fn set_inverse_mass(&mut self, id: BodyId, inv_mass: f64) -> Result<(), PhysicsError> {
        if inv_mass.is_nan() || inv_mass < 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "inverse mass must be non-negative, got {}",
                inv_mass
            )));
        }
        let body = self.bodies.get_mut(id.0).ok_or(PhysicsError::UnknownBody(id))?;
        body.inv_mass = inv_mass;
        Ok(())
    }

    // --- Simulation ---

    /// Advances the simulation by `full_dt` seconds split into substeps.
    ///
    /// Only fails on a structural index failure, which is a bug, or on a
    /// non-positive `full_dt`.
    pub fn step(&mut self, full_dt: f64) -> Result<(), PhysicsError> {
        if !(full_dt > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "step duration must be positive, got {}",
                full_dt
            )));
        }
        let config = self.config;
        let coeffs = VerletCoefficients::new(
            full_dt,
            config.substeps,
            config.gravity,
            config.position_damping,
            config.angular_damping,
        );

        for body in &mut self.bodies {
            let clamped = clamp_and_seed_history(
                body,
                config.max_position_velocity,
                config.max_angular_velocity,
                coeffs.dt,
            );
            if clamped {
                warn!(body = body.id.0, "velocity clamped");
            }
        }

        for _ in 0..config.substeps {
            for body in &mut self.bodies {
                integrate_substep(body, &coeffs);
            }
            self.reindex_all()?;
            self.resolve_contacts()?;
            self.reindex_all()?;
        }

        for body in &mut self.bodies {
            publish_velocities(body, coeffs.dt);
        }
        Ok(())
    }

    fn reindex_all(&mut self) -> Result<(), IndexError> {
        for body in &self.bodies {
            self.index.add_or_update(body)?;
        }
        Ok(())
    }

    /// Runs the narrow phase on every broad-phase pair once, correcting
    /// penetrations as they are found.
    ///
    /// Bodies are queried in id order and each query's hits in id order. A
    /// pair is solved the first time either of its bodies finds it, since a
    /// tight rect against a fat rect is not a symmetric test.
    fn resolve_contacts(&mut self) -> Result<(), IndexError> {
        self.contacts.clear();
        self.notables.clear();
        self.solved.clear();

        for i in 0..self.bodies.len() {
            let rect = self.bodies[i].fit_rect();
            self.candidates.clear();
            let candidates = &mut self.candidates;
            self.index.traverse_overlapping(&rect, &mut |id| candidates.push(id))?;
            self.candidates.sort_unstable();

            for k in 0..self.candidates.len() {
                let other = self.candidates[k].0;
                if other == i {
                    continue;
                }
                let (i, j) = (i.min(other), i.max(other));
                if !self.solved.insert((i, j)) {
                    continue;
                }
                let cp = collide(self.bodies[i].capsule(), self.bodies[j].capsule(), Some(&mut self.notables));
                if cp.degenerate {
                    trace!(body0 = i, body1 = j, "skipping degenerate pair");
                    continue;
                }
                ContactHalf::expand(BodyId(i), BodyId(j), &cp, &mut self.contacts);
                if cp.is_penetrating() {
                    self.correct_contact(i, j, &cp);
                }
            }
        }
        Ok(())
    }

    /// Pushes two penetrating bodies apart along the contact normal,
    /// splitting the depth by inverse mass and inertia. Requires `i < j`.
    fn correct_contact(&mut self, i: usize, j: usize, cp: &ClosestPoints) {
        let (left, right) = self.bodies.split_at_mut(j);
        let body0 = &mut left[i];
        let body1 = &mut right[0];

        let n = cp.normal;
        let r0n = (cp.point0 - body0.position).cross(n);
        let r1n = (cp.point1 - body1.position).cross(n);
        let inv_virtual_mass = body0.inv_mass
            + body1.inv_mass
            + body0.inv_inertia * r0n * r0n
            + body1.inv_inertia * r1n * r1n;
        if inv_virtual_mass < EPS {
            return;
        }
        let penetration = -cp.distance;
        let step = penetration / inv_virtual_mass;

        body0.position -= n * (step * body0.inv_mass);
        body1.position += n * (step * body1.inv_mass);
        body0.angle -= r0n * (step * body0.inv_inertia);
        body1.angle += r1n * (step * body1.inv_inertia);
        body0.refresh_cache();
        body1.refresh_cache();
        trace!(body0 = i, body1 = j, penetration, "corrected contact");
    }
}
