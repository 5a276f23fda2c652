//! Candidate pairs supplied by the neighbor-list collaborator.

use crate::Vec3;
use crate::species::SpeciesId;

/// One candidate interaction between particles `i` and `j`.
///
/// Each unordered pair appears at most once per compute call. The displacement
/// points from `j` to `i`, so a positive `F/r` pushes `i` along `dr`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborPair {
    /// Index of the first particle.
    pub i: usize,
    /// Index of the second particle.
    pub j: usize,
    /// Species of particle `i`.
    pub species_i: SpeciesId,
    /// Species of particle `j`.
    pub species_j: SpeciesId,
    /// Squared distance |dr|².
    pub r2: f64,
    /// Displacement x_i - x_j (after any periodic wrapping).
    pub dr: Vec3,
}

impl NeighborPair {
    /// Build a pair from a displacement, computing the squared distance.
    pub fn new(i: usize, j: usize, species_i: SpeciesId, species_j: SpeciesId, dr: Vec3) -> Self {
        Self {
            i,
            j,
            species_i,
            species_j,
            r2: dr.norm_squared(),
            dr,
        }
    }

    /// Build a pair from two positions.
    pub fn from_positions(
        i: usize,
        j: usize,
        species_i: SpeciesId,
        species_j: SpeciesId,
        x_i: Vec3,
        x_j: Vec3,
    ) -> Self {
        Self::new(i, j, species_i, species_j, x_i - x_j)
    }
}
