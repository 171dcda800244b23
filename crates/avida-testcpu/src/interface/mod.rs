//! Organism interface
//!
//! The narrow capability set a virtual CPU uses to reach "the world". The
//! sandbox adapter ([`TestCpuInterface`]) answers from a test's private
//! execution context; a live-population adapter answers from world state.
//! The interpreter only ever sees the trait, so both paths share one
//! implementation of instruction semantics.

pub mod testcpu;

use avida_common::{Genome, ResourceLevels};
use serde::{Deserialize, Serialize};

use crate::hardware::Phenotype;

pub use testcpu::{DepthState, TestCpuInterface};

/// Identity of a live organism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganismId(pub u64);

/// Identity of an avatar proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvatarId(pub u64);

/// World capabilities available to an executing organism
pub trait OrganismInterface {
    /// Hand the offspring to the world; resets the parent's gestation state
    fn divide(&mut self, parent: &mut Phenotype, offspring: &Genome) -> bool;

    /// Explosive instruction affecting cells within `distance`
    fn kaboom(&mut self, distance: u32);

    /// Live organisms in the neighborhood
    fn live_org_list(&self) -> Vec<OrganismId>;

    /// Avatars in the faced cell; entries may be null
    fn faced_avatars(&self, count: usize) -> Vec<Option<AvatarId>>;

    /// Avatars in the organism's own cell; entries may be null
    fn cell_avatars(&self, count: usize) -> Vec<Option<AvatarId>>;

    /// Prey avatars in the faced cell; entries may be null
    fn faced_prey_avatars(&self, count: usize) -> Vec<Option<AvatarId>>;

    /// Push a new merit for the organism
    fn update_merit(&mut self, merit: f64) -> bool;

    /// Next received message value
    fn receive_value(&mut self) -> Option<i32>;

    /// Buy a value offered under `label` for `price`
    fn buy_value(&mut self, label: u32, price: i32) -> Option<i32>;

    /// Next environment input
    fn get_input(&mut self) -> i32;

    /// Ambient resource levels
    fn resources(&self) -> ResourceLevels;

    /// Resource levels of the organism's cell
    fn cell_resources(&self) -> ResourceLevels;

    /// Resource levels of the organism's deme
    fn deme_resources(&self) -> ResourceLevels;

    /// Resource levels of the faced cell
    fn faced_cell_resources(&self) -> ResourceLevels;

    /// Resource levels of the avatar's cell
    fn avatar_resources(&self) -> ResourceLevels;

    /// Resource levels of the cell the avatar faces
    fn faced_avatar_resources(&self) -> ResourceLevels;

    /// Levels frozen at the start of the run
    fn frozen_resources(&self) -> ResourceLevels;

    /// Apply a change to ambient resources
    fn update_resources(&mut self, delta: &[f64]);

    /// Apply a change to deme resources
    fn update_deme_resources(&mut self, delta: &[f64]);

    /// Apply a change to avatar-cell resources
    fn update_avatar_resources(&mut self, delta: &[f64]);

    /// State grid the organism navigates
    fn state_grid_id(&self) -> usize;
}
