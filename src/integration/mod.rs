pub mod integrator;

pub use integrator::{clamp_and_seed_history, integrate_substep, publish_velocities, VerletCoefficients};
