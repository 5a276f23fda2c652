//! Pair-potential fix: configuration, run lifecycle and force accumulation.

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::Vec3;
use crate::error::{PairError, Result};
use crate::neighbor::NeighborPair;
use crate::potential::{LennardJones, PairEval, PairPotential};
use crate::restart::{self, RestartFormat};
use crate::species::{Field, PairParameters, PairTable, ParameterTable, SpeciesId};

/// Lifecycle state of a fix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixState {
    /// No species registered yet.
    Unconfigured,
    /// Species and parameters may be changed.
    Configuring,
    /// Table frozen and pair cache built.
    Prepared,
    /// At least one compute call since preparation.
    Running,
    /// Run finished; run-scoped caches released.
    Finished,
}

impl FixState {
    pub fn as_str(self) -> &'static str {
        match self {
            FixState::Unconfigured => "unconfigured",
            FixState::Configuring => "configuring",
            FixState::Prepared => "prepared",
            FixState::Running => "running",
            FixState::Finished => "finished",
        }
    }
}

/// Symmetric pair virial W_ab = Σ F_a dr_b, stored as (xx, yy, zz, xy, xz, yz).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Virial(pub [f64; 6]);

impl Virial {
    #[inline]
    fn add_pair(&mut self, force_over_r: f64, dr: &Vec3) {
        let w = &mut self.0;
        w[0] += force_over_r * dr.x * dr.x;
        w[1] += force_over_r * dr.y * dr.y;
        w[2] += force_over_r * dr.z * dr.z;
        w[3] += force_over_r * dr.x * dr.y;
        w[4] += force_over_r * dr.x * dr.z;
        w[5] += force_over_r * dr.y * dr.z;
    }

    fn merge(mut self, other: Virial) -> Virial {
        for (a, b) in self.0.iter_mut().zip(other.0) {
            *a += b;
        }
        self
    }

    /// Trace W_xx + W_yy + W_zz.
    pub fn trace(&self) -> f64 {
        self.0[0] + self.0[1] + self.0[2]
    }
}

/// Result of one compute call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ComputeOutput {
    /// Total pair energy of all supplied pairs.
    pub energy: f64,
    /// Pair virial, when requested.
    pub virial: Option<Virial>,
}

/// Derived data valid for one run.
#[derive(Clone, Debug)]
struct RunCache {
    revision: u64,
    pairs: PairTable,
    r_cuts: Vec<f64>,
}

/// Per-thread force accumulator for the parallel pair loop.
struct ForceAccumulator {
    forces: Vec<Vec3>,
    energy: f64,
    virial: Option<Virial>,
}

impl ForceAccumulator {
    fn new(n: usize, virial: bool) -> Self {
        Self {
            forces: vec![Vec3::zeros(); n],
            energy: 0.0,
            virial: virial.then(Virial::default),
        }
    }

    fn add(mut self, pair: &NeighborPair, eval: PairEval) -> Self {
        let force_on_i = eval.force_over_r * pair.dr;

        // Newton's third law: F_j = -F_i
        self.forces[pair.i] += force_on_i;
        self.forces[pair.j] -= force_on_i;
        self.energy += eval.energy;
        if let Some(virial) = self.virial.as_mut() {
            virial.add_pair(eval.force_over_r, &pair.dr);
        }
        self
    }

    fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.forces.iter_mut().zip(&other.forces) {
            *a += b;
        }
        self.energy += other.energy;
        self.virial = match (self.virial, other.virial) {
            (Some(a), Some(b)) => Some(a.merge(b)),
            (a, b) => a.or(b),
        };
        self
    }
}

/// A truncated pair-potential fix over a per-species parameter table.
///
/// Parameters are mutable only while configuring. [`PairFix::prepare_for_run`]
/// validates the table and builds a read-only pair cache that the compute
/// loop shares across worker threads; any later mutation drops the cache and
/// returns the fix to [`FixState::Configuring`].
#[derive(Clone, Debug)]
pub struct PairFix<P: PairPotential = LennardJones> {
    handle: String,
    potential: P,
    table: ParameterTable,
    state: FixState,
    cache: Option<RunCache>,
}

impl PairFix<LennardJones> {
    /// Create a Lennard-Jones fix.
    pub fn new(handle: impl Into<String>) -> Self {
        Self::with_potential(handle, LennardJones)
    }

    /// Restore a Lennard-Jones fix from a restart chunk.
    pub fn from_restart(handle: impl Into<String>, chunk: &str) -> Result<Self> {
        Self::from_restart_with(handle, LennardJones, chunk)
    }
}

impl<P: PairPotential> PairFix<P> {
    /// Create a fix using the given force law.
    pub fn with_potential(handle: impl Into<String>, potential: P) -> Self {
        Self {
            handle: handle.into(),
            potential,
            table: ParameterTable::new(),
            state: FixState::Unconfigured,
            cache: None,
        }
    }

    /// Restore a fix from a restart chunk written by a fix with the same force law.
    pub fn from_restart_with(handle: impl Into<String>, potential: P, chunk: &str) -> Result<Self> {
        let table = restart::read_chunk(chunk, potential.name())?;
        let state = if table.is_empty() {
            FixState::Unconfigured
        } else {
            FixState::Configuring
        };
        Ok(Self {
            handle: handle.into(),
            potential,
            table,
            state,
            cache: None,
        })
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn state(&self) -> FixState {
        self.state
    }

    pub fn potential(&self) -> &P {
        &self.potential
    }

    /// The parameter table (read-only).
    pub fn table(&self) -> &ParameterTable {
        &self.table
    }

    /// Drop derived data after a table mutation.
    fn invalidate(&mut self) {
        if self.cache.take().is_some() {
            debug!("{}: parameters changed, pair cache dropped", self.handle);
        }
        self.state = FixState::Configuring;
    }

    /// Register a new species.
    pub fn add_species(&mut self, handle: &str) -> Result<SpeciesId> {
        let id = self.table.add_species(handle)?;
        debug!("{}: registered species '{}' as {}", self.handle, handle, id);
        self.invalidate();
        Ok(id)
    }

    /// Set one field of one species.
    pub fn set_field(&mut self, species: SpeciesId, field: Field, value: f64) -> Result<()> {
        self.table.set_field(species, field, value)?;
        self.invalidate();
        Ok(())
    }

    /// Set a field addressed by species handle and field name.
    pub fn set(&mut self, species: &str, field: &str, value: f64) -> Result<()> {
        self.table.set(species, field, value)?;
        self.invalidate();
        Ok(())
    }

    /// Override one field for a specific species pair.
    pub fn set_pair_field(
        &mut self,
        a: SpeciesId,
        b: SpeciesId,
        field: Field,
        value: f64,
    ) -> Result<()> {
        self.table.set_pair_field(a, b, field, value)?;
        self.invalidate();
        Ok(())
    }

    /// Effective parameters for a pair under this fix's force law.
    pub fn resolve_pair(&self, a: SpeciesId, b: SpeciesId) -> Result<PairParameters> {
        self.potential.resolve_pair(&self.table, a, b)
    }

    /// Per-species cutoffs in registration order.
    pub fn r_cuts(&self) -> Vec<f64> {
        match &self.cache {
            Some(cache) => cache.r_cuts.clone(),
            None => self.table.r_cuts(),
        }
    }

    /// Search radius the neighbor list must cover; the maximum of [`PairFix::r_cuts`].
    pub fn max_r_cut(&self) -> f64 {
        self.r_cuts().into_iter().fold(0.0, f64::max)
    }

    /// Validate the table and build the pair cache.
    ///
    /// Either succeeds completely or leaves the fix untouched. Repeated calls
    /// without intervening mutation are no-ops.
    pub fn prepare_for_run(&mut self) -> Result<()> {
        if let Some(cache) = &self.cache {
            if cache.revision == self.table.revision() {
                self.state = FixState::Prepared;
                return Ok(());
            }
        }

        self.table.validate()?;

        let n = self.table.len();
        let pairs = self.table.build_pair_table(&self.potential)?;

        for (_, record) in self.table.records() {
            if record.r_cut() == 0.0 {
                warn!(
                    "{}: species '{}' has no cutoff and will not interact with its own kind",
                    self.handle,
                    record.handle()
                );
            }
        }

        let cache = RunCache {
            revision: self.table.revision(),
            r_cuts: pairs.cover_r_cuts(self.table.r_cuts()),
            pairs,
        };
        info!(
            "{}: prepared {} ({} species, max cutoff {:.4})",
            self.handle,
            self.potential.name(),
            n,
            cache.pairs.max_r_cut()
        );
        self.cache = Some(cache);
        self.state = FixState::Prepared;
        Ok(())
    }

    /// Release run-scoped caches. Species records are kept.
    pub fn post_run(&mut self) -> Result<()> {
        if matches!(self.state, FixState::Prepared | FixState::Running) {
            self.cache = None;
            self.state = FixState::Finished;
            debug!("{}: run finished, pair cache released", self.handle);
        }
        Ok(())
    }

    fn run_cache(&self) -> Result<&RunCache> {
        match (&self.cache, self.state) {
            (Some(cache), FixState::Prepared | FixState::Running) => Ok(cache),
            _ => Err(PairError::NotPrepared(self.state.as_str())),
        }
    }

    /// Accumulate pair forces into `forces` (indexed by particle).
    ///
    /// Every pair index must be within `forces`, every species within the
    /// table, and every squared distance finite and non-zero.
    pub fn compute(
        &mut self,
        pairs: &[NeighborPair],
        forces: &mut [Vec3],
        virial: bool,
    ) -> Result<ComputeOutput> {
        let cache = self.run_cache()?;
        let potential = &self.potential;
        let n = forces.len();

        let acc = pairs
            .par_iter()
            .fold(
                || ForceAccumulator::new(n, virial),
                |acc, pair| {
                    let params = cache.pairs.get(pair.species_i, pair.species_j);
                    let eval = potential.evaluate(pair.r2, params);
                    acc.add(pair, eval)
                },
            )
            .reduce(|| ForceAccumulator::new(n, virial), ForceAccumulator::merge);

        for (f, df) in forces.iter_mut().zip(&acc.forces) {
            *f += df;
        }
        self.state = FixState::Running;

        Ok(ComputeOutput {
            energy: acc.energy,
            virial: acc.virial,
        })
    }

    /// Accumulate per-particle pair energy into `energies`.
    ///
    /// Each pair energy is split evenly between its two particles, so the sum
    /// over particles equals the energy reported by [`PairFix::compute`].
    pub fn single_point_eng(&mut self, pairs: &[NeighborPair], energies: &mut [f64]) -> Result<()> {
        let cache = self.run_cache()?;
        let potential = &self.potential;
        let n = energies.len();

        let per_particle = pairs
            .par_iter()
            .fold(
                || vec![0.0; n],
                |mut acc, pair| {
                    let params = cache.pairs.get(pair.species_i, pair.species_j);
                    let half = 0.5 * potential.evaluate(pair.r2, params).energy;
                    acc[pair.i] += half;
                    acc[pair.j] += half;
                    acc
                },
            )
            .reduce(
                || vec![0.0; n],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                    a
                },
            );

        for (e, de) in energies.iter_mut().zip(per_particle) {
            *e += de;
        }
        self.state = FixState::Running;
        Ok(())
    }

    /// Serialize the parameter table for a checkpoint.
    pub fn restart_chunk(&self, format: RestartFormat) -> String {
        restart::write_chunk(&self.table, self.potential.name(), format)
    }
}

/// Uniform driver-facing contract for a force-contributing fix.
pub trait Fix: Send + Sync {
    /// Instance handle.
    fn handle(&self) -> &str;
    /// Registration tag of the force law.
    fn kind(&self) -> &'static str;
    fn state(&self) -> FixState;
    fn add_species(&mut self, handle: &str) -> Result<SpeciesId>;
    fn set(&mut self, species: &str, field: &str, value: f64) -> Result<()>;
    fn prepare_for_run(&mut self) -> Result<()>;
    fn post_run(&mut self) -> Result<()>;
    fn compute(
        &mut self,
        pairs: &[NeighborPair],
        forces: &mut [Vec3],
        virial: bool,
    ) -> Result<ComputeOutput>;
    fn single_point_eng(&mut self, pairs: &[NeighborPair], energies: &mut [f64]) -> Result<()>;
    fn r_cuts(&self) -> Vec<f64>;
    /// Neighbor search radius.
    fn max_r_cut(&self) -> f64;
    fn restart_chunk(&self, format: RestartFormat) -> String;
}

impl<P: PairPotential> Fix for PairFix<P> {
    fn handle(&self) -> &str {
        PairFix::handle(self)
    }

    fn kind(&self) -> &'static str {
        self.potential.name()
    }

    fn state(&self) -> FixState {
        PairFix::state(self)
    }

    fn add_species(&mut self, handle: &str) -> Result<SpeciesId> {
        PairFix::add_species(self, handle)
    }

    fn set(&mut self, species: &str, field: &str, value: f64) -> Result<()> {
        PairFix::set(self, species, field, value)
    }

    fn prepare_for_run(&mut self) -> Result<()> {
        PairFix::prepare_for_run(self)
    }

    fn post_run(&mut self) -> Result<()> {
        PairFix::post_run(self)
    }

    fn compute(
        &mut self,
        pairs: &[NeighborPair],
        forces: &mut [Vec3],
        virial: bool,
    ) -> Result<ComputeOutput> {
        PairFix::compute(self, pairs, forces, virial)
    }

    fn single_point_eng(&mut self, pairs: &[NeighborPair], energies: &mut [f64]) -> Result<()> {
        PairFix::single_point_eng(self, pairs, energies)
    }

    fn r_cuts(&self) -> Vec<f64> {
        PairFix::r_cuts(self)
    }

    fn max_r_cut(&self) -> f64 {
        PairFix::max_r_cut(self)
    }

    fn restart_chunk(&self, format: RestartFormat) -> String {
        PairFix::restart_chunk(self, format)
    }
}
