//! Pair potentials evaluated on squared distances.

use crate::error::Result;
use crate::species::{PairParameters, ParameterTable, SpeciesId};

/// Force and energy of a single pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PairEval {
    /// Force magnitude divided by distance. Positive is repulsive.
    pub force_over_r: f64,
    /// Pair potential energy.
    pub energy: f64,
}

impl PairEval {
    pub const ZERO: PairEval = PairEval {
        force_over_r: 0.0,
        energy: 0.0,
    };
}

/// A short-range pair force law layered on a [`ParameterTable`].
///
/// Implementations must be pure: `evaluate` is called concurrently from the
/// compute loop with shared references only.
pub trait PairPotential: Send + Sync {
    /// Registration name of this force law.
    fn name(&self) -> &'static str;

    /// Effective parameters for a species pair. Defaults to the table's mixing rule.
    fn resolve_pair(
        &self,
        table: &ParameterTable,
        a: SpeciesId,
        b: SpeciesId,
    ) -> Result<PairParameters> {
        table.resolve_pair(a, b)
    }

    /// Force and energy at squared distance `r2`.
    ///
    /// `r2` must be finite and non-zero; the caller excludes self pairs.
    fn evaluate(&self, r2: f64, params: &PairParameters) -> PairEval;
}

/// Truncated Lennard-Jones 12-6 potential: V(r) = 4ε [(σ/r)^12 - (σ/r)^6] for r < r_cut.
///
/// No shift or smoothing is applied at the cutoff.
#[derive(Clone, Copy, Debug, Default)]
pub struct LennardJones;

impl PairPotential for LennardJones {
    fn name(&self) -> &'static str {
        crate::registry::LJ_CUT_TAG
    }

    #[inline]
    fn evaluate(&self, r2: f64, params: &PairParameters) -> PairEval {
        debug_assert!(r2.is_finite() && r2 > 0.0, "invalid squared distance {r2}");

        if r2 >= params.r_cut_sq() {
            return PairEval::ZERO;
        }

        let sr2 = params.sigma * params.sigma / r2;
        let sr6 = sr2 * sr2 * sr2;
        let sr12 = sr6 * sr6;

        // F/r = -dV/dr / r = 24ε (2 (σ/r)^12 - (σ/r)^6) / r²
        PairEval {
            force_over_r: 24.0 * params.epsilon * (2.0 * sr12 - sr6) / r2,
            energy: 4.0 * params.epsilon * (sr12 - sr6),
        }
    }
}
