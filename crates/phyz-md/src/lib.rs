//! Short-range pair potentials for molecular dynamics.
//!
//! Implements the truncated Lennard-Jones pair fix used by the MD driver:
//! - Per-species parameter table with Lorentz-Berthelot mixing and pair overrides
//! - Hard-truncated 12-6 force and energy on squared distances
//! - Prepare/run/post-run lifecycle with a read-only pair cache
//! - Data-parallel force, virial and per-particle energy accumulation
//! - Text restart chunks and JSON configuration
//!
//! # Example
//!
//! ```
//! use phyz_md::{Field, NeighborPair, PairFix, RestartFormat, Vec3};
//!
//! let mut fix = PairFix::new("lj");
//! let ar = fix.add_species("Ar")?;
//! fix.set_field(ar, Field::Epsilon, 1.0)?;
//! fix.set_field(ar, Field::Sigma, 1.0)?;
//! fix.set_field(ar, Field::RCut, 2.5)?;
//! fix.prepare_for_run()?;
//!
//! // The neighbor list must search at least this far.
//! assert_eq!(fix.max_r_cut(), 2.5);
//!
//! let x = [Vec3::zeros(), Vec3::new(1.1, 0.0, 0.0)];
//! let pairs = [NeighborPair::from_positions(0, 1, ar, ar, x[0], x[1])];
//! let mut forces = vec![Vec3::zeros(); 2];
//! let out = fix.compute(&pairs, &mut forces, true)?;
//! println!("E = {:.4}, W = {:?}", out.energy, out.virial);
//!
//! fix.post_run()?;
//! let chunk = fix.restart_chunk(RestartFormat::Fixed);
//! let restored = PairFix::from_restart("lj", &chunk)?;
//! assert_eq!(restored.table(), fix.table());
//! # Ok::<(), phyz_md::PairError>(())
//! ```

pub mod config;
pub mod error;
pub mod fix;
pub mod neighbor;
pub mod potential;
pub mod registry;
pub mod restart;
pub mod species;

pub use config::{FieldValues, PairConfig, PairStyleConfig, SpeciesConfig};
pub use error::{PairError, RestartFormatError, Result};
pub use fix::{ComputeOutput, Fix, FixState, PairFix, Virial};
pub use neighbor::NeighborPair;
pub use potential::{LennardJones, PairEval, PairPotential};
pub use registry::{FIELD_NAMES, FixRegistration, LJ_CUT_TAG};
pub use restart::{RestartFormat, read_chunk, write_chunk};
pub use species::{
    FIELD_COUNT, Field, PairOverride, PairParameters, PairTable, ParameterRecord, ParameterTable,
    SpeciesId,
};

/// 3D vector alias.
pub type Vec3 = nalgebra::Vector3<f64>;
