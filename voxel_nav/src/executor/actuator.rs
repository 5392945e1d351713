//! # Movement Actuator
//!
//! The capability surface which actually moves an agent in the world. Implementations translate
//! these calls into whatever the world needs, for example game protocol packets.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::future::Future;

use nalgebra::Point3;

use crate::voxel::Voxel;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait MovementActuator: Send + Sync {
    /// Move the agent to the given voxel, resolving to `true` once it gets there or `false` if the
    /// move failed. May take an arbitrarily long time.
    fn move_toward(&self, target: Voxel) -> impl Future<Output = bool> + Send;

    /// Make the agent jump.
    fn jump(&self);

    /// Enable or disable sustained sprinting.
    fn set_sprint(&self, enabled: bool);

    /// Turn the agent to face the given voxel.
    fn look_at(&self, target: Voxel);

    /// The agent's current position.
    fn current_position(&self) -> Point3<f64>;
}
