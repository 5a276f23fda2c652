//! Per-species parameter storage and pair mixing.
//!
//! Every registered species owns one [`ParameterRecord`] holding the nine
//! scalar fields of the truncated Lennard-Jones family. Pair parameters are
//! never stored per species; they are derived by [`ParameterTable::resolve_pair`]
//! using the Lorentz-Berthelot combining rules, or taken from an explicit
//! pair override when one exists.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{PairError, Result};
use crate::potential::PairPotential;

/// Number of scalar fields carried per species.
pub const FIELD_COUNT: usize = 9;

/// Index of a species in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpeciesId(usize);

impl SpeciesId {
    /// Species id for the given registration index.
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Registration index (row/column in the pair table).
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the recognised per-species fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// Well depth ε.
    Epsilon,
    /// Zero-crossing distance σ.
    Sigma,
    /// Cutoff radius.
    RCut,
    SigmaR,
    RA,
    AlphaA,
    G,
    RG,
    SigmaG,
}

impl Field {
    /// All fields in persisted order.
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Epsilon,
        Field::Sigma,
        Field::RCut,
        Field::SigmaR,
        Field::RA,
        Field::AlphaA,
        Field::G,
        Field::RG,
        Field::SigmaG,
    ];

    /// Canonical field name as used by configuration and restart chunks.
    pub const fn name(self) -> &'static str {
        match self {
            Field::Epsilon => "epsilon",
            Field::Sigma => "sigma",
            Field::RCut => "rCut",
            Field::SigmaR => "sigma_R",
            Field::RA => "r_A",
            Field::AlphaA => "alpha_A",
            Field::G => "G",
            Field::RG => "r_G",
            Field::SigmaG => "sigma_G",
        }
    }

    /// Slot of this field in a record.
    pub const fn slot(self) -> usize {
        self as usize
    }

    /// Fields that must be set before a run.
    pub const fn is_required(self) -> bool {
        matches!(self, Field::Epsilon | Field::Sigma)
    }

    /// Fields that may not be negative.
    const fn is_non_negative(self) -> bool {
        matches!(self, Field::Epsilon | Field::Sigma | Field::RCut)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| PairError::UnknownField(s.to_string()))
    }
}

/// Check a value before it is stored in a record or an override.
fn check_value(field: Field, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(PairError::InvalidValue {
            field: field.name().to_string(),
            value,
            reason: "must be finite",
        });
    }
    if field.is_non_negative() && value < 0.0 {
        return Err(PairError::InvalidValue {
            field: field.name().to_string(),
            value,
            reason: "must be non-negative",
        });
    }
    Ok(())
}

/// Parameters registered for a single species.
///
/// Unset fields read as zero.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterRecord {
    handle: String,
    values: [Option<f64>; FIELD_COUNT],
}

impl ParameterRecord {
    fn new(handle: String) -> Self {
        Self {
            handle,
            values: [None; FIELD_COUNT],
        }
    }

    /// Handle the species was registered under.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Explicitly set value of a field, if any.
    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.slot()]
    }

    /// Value of a field, zero when unset.
    pub fn value(&self, field: Field) -> f64 {
        self.get(field).unwrap_or(0.0)
    }

    pub fn epsilon(&self) -> f64 {
        self.value(Field::Epsilon)
    }

    pub fn sigma(&self) -> f64 {
        self.value(Field::Sigma)
    }

    /// Cutoff radius; zero means the species does not interact with its own kind.
    pub fn r_cut(&self) -> f64 {
        self.value(Field::RCut)
    }
}

/// Resolved parameters for one species pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PairParameters {
    pub epsilon: f64,
    pub sigma: f64,
    pub r_cut: f64,
    pub sigma_r: f64,
    pub r_a: f64,
    pub alpha_a: f64,
    pub g: f64,
    pub r_g: f64,
    pub sigma_g: f64,
}

impl PairParameters {
    /// Squared cutoff radius.
    #[inline]
    pub fn r_cut_sq(&self) -> f64 {
        self.r_cut * self.r_cut
    }

    /// Value of a field.
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Epsilon => self.epsilon,
            Field::Sigma => self.sigma,
            Field::RCut => self.r_cut,
            Field::SigmaR => self.sigma_r,
            Field::RA => self.r_a,
            Field::AlphaA => self.alpha_a,
            Field::G => self.g,
            Field::RG => self.r_g,
            Field::SigmaG => self.sigma_g,
        }
    }

    fn set(&mut self, field: Field, value: f64) {
        match field {
            Field::Epsilon => self.epsilon = value,
            Field::Sigma => self.sigma = value,
            Field::RCut => self.r_cut = value,
            Field::SigmaR => self.sigma_r = value,
            Field::RA => self.r_a = value,
            Field::AlphaA => self.alpha_a = value,
            Field::G => self.g = value,
            Field::RG => self.r_g = value,
            Field::SigmaG => self.sigma_g = value,
        }
    }

    /// Parameters of a like pair: each field carried through unchanged.
    fn carry(record: &ParameterRecord) -> Self {
        let mut params = Self::default();
        for field in Field::ALL {
            params.set(field, record.value(field));
        }
        params
    }

    /// Lorentz-Berthelot mixing of two species.
    ///
    /// ε is the geometric mean, σ the arithmetic mean, the cutoff the larger of
    /// the two, and the shape fields the arithmetic mean.
    fn mix(a: &ParameterRecord, b: &ParameterRecord) -> Self {
        let mut params = Self::default();
        for field in Field::ALL {
            let (x, y) = (a.value(field), b.value(field));
            let mixed = match field {
                Field::Epsilon => (x * y).sqrt(),
                Field::RCut => x.max(y),
                _ => 0.5 * (x + y),
            };
            params.set(field, mixed);
        }
        params
    }
}

/// Explicit per-pair values overriding the mixing rule.
pub type PairOverride = [Option<f64>; FIELD_COUNT];

/// Per-species parameters, registered once per species and mutated only while
/// a fix is being configured.
#[derive(Clone, Debug, Default)]
pub struct ParameterTable {
    records: Vec<ParameterRecord>,
    index: HashMap<String, SpeciesId>,
    overrides: BTreeMap<(SpeciesId, SpeciesId), PairOverride>,
    revision: u64,
}

impl PartialEq for ParameterTable {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records && self.overrides == other.overrides
    }
}

impl ParameterTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered species.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Counter bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Register a new species with every field unset.
    pub fn add_species(&mut self, handle: &str) -> Result<SpeciesId> {
        if handle.is_empty() || handle.contains(|c: char| c.is_whitespace() || c == '=') {
            return Err(PairError::InvalidHandle(handle.to_string()));
        }
        if self.index.contains_key(handle) {
            return Err(PairError::DuplicateSpecies(handle.to_string()));
        }

        let id = SpeciesId(self.records.len());
        self.records.push(ParameterRecord::new(handle.to_string()));
        self.index.insert(handle.to_string(), id);
        self.revision += 1;
        Ok(id)
    }

    /// Look up a species by handle.
    pub fn species(&self, handle: &str) -> Result<SpeciesId> {
        self.index
            .get(handle)
            .copied()
            .ok_or_else(|| PairError::UnknownSpecies(handle.to_string()))
    }

    /// Record of a registered species.
    pub fn record(&self, id: SpeciesId) -> Result<&ParameterRecord> {
        self.records
            .get(id.0)
            .ok_or_else(|| PairError::UnknownSpecies(id.to_string()))
    }

    /// All records in registration order.
    pub fn records(&self) -> impl Iterator<Item = (SpeciesId, &ParameterRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| (SpeciesId(i), record))
    }

    /// Set one field of one species.
    pub fn set_field(&mut self, id: SpeciesId, field: Field, value: f64) -> Result<()> {
        check_value(field, value)?;
        let record = self
            .records
            .get_mut(id.0)
            .ok_or_else(|| PairError::UnknownSpecies(id.to_string()))?;
        record.values[field.slot()] = Some(value);
        self.revision += 1;
        Ok(())
    }

    /// Set a field addressed by species handle and field name.
    pub fn set(&mut self, handle: &str, field: &str, value: f64) -> Result<()> {
        let id = self.species(handle)?;
        let field = field.parse()?;
        self.set_field(id, field, value)
    }

    /// Override one field for a specific pair, bypassing the mixing rule.
    ///
    /// Overrides are symmetric: setting (a, b) also applies to (b, a).
    pub fn set_pair_field(
        &mut self,
        a: SpeciesId,
        b: SpeciesId,
        field: Field,
        value: f64,
    ) -> Result<()> {
        check_value(field, value)?;
        self.record(a)?;
        self.record(b)?;
        let entry = self
            .overrides
            .entry(pair_key(a, b))
            .or_insert([None; FIELD_COUNT]);
        entry[field.slot()] = Some(value);
        self.revision += 1;
        Ok(())
    }

    /// Explicit override for a pair, if any.
    pub fn pair_override(&self, a: SpeciesId, b: SpeciesId) -> Option<&PairOverride> {
        self.overrides.get(&pair_key(a, b))
    }

    /// All overrides, ordered by species pair.
    pub fn overrides(&self) -> impl Iterator<Item = ((SpeciesId, SpeciesId), &PairOverride)> {
        self.overrides.iter().map(|(&key, values)| (key, values))
    }

    /// Resolve the effective parameters of a pair.
    ///
    /// Pure and commutative: `resolve_pair(a, b) == resolve_pair(b, a)`.
    pub fn resolve_pair(&self, a: SpeciesId, b: SpeciesId) -> Result<PairParameters> {
        let ra = self.record(a)?;
        let rb = self.record(b)?;

        let mut params = if a == b {
            PairParameters::carry(ra)
        } else {
            PairParameters::mix(ra, rb)
        };

        if let Some(values) = self.pair_override(a, b) {
            for field in Field::ALL {
                if let Some(value) = values[field.slot()] {
                    params.set(field, value);
                }
            }
        }
        Ok(params)
    }

    /// One cutoff per species in registration order; unset cutoffs are zero.
    ///
    /// A pair override whose cutoff exceeds both species' own cutoffs raises
    /// the entry of the first species, so the maximum covers every pair.
    pub fn r_cuts(&self) -> Vec<f64> {
        let mut r_cuts: Vec<f64> = self.records.iter().map(|r| r.r_cut().max(0.0)).collect();
        for (&(a, b), values) in &self.overrides {
            if let Some(rc) = values[Field::RCut.slot()] {
                if rc > r_cuts[a.0].max(r_cuts[b.0]) {
                    r_cuts[a.0] = rc;
                }
            }
        }
        r_cuts
    }

    /// Largest cutoff over all species and pair overrides.
    pub fn max_r_cut(&self) -> f64 {
        self.r_cuts().into_iter().fold(0.0, f64::max)
    }

    /// Check that the table is complete enough to run.
    pub fn validate(&self) -> Result<()> {
        if self.records.is_empty() {
            return Err(PairError::NoSpecies);
        }
        for record in &self.records {
            for field in Field::ALL.into_iter().filter(|f| f.is_required()) {
                if record.get(field).is_none() {
                    return Err(PairError::MissingField {
                        species: record.handle.clone(),
                        field: field.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Materialise every pair, as resolved by `potential`, into a dense lookup table.
    pub fn build_pair_table<P: PairPotential + ?Sized>(&self, potential: &P) -> Result<PairTable> {
        let n = self.records.len();
        let mut entries = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                entries.push(potential.resolve_pair(self, SpeciesId(i), SpeciesId(j))?);
            }
        }
        Ok(PairTable { n, entries })
    }

    /// Insert a record wholesale; used when restoring from a restart chunk.
    pub(crate) fn restore_species(
        &mut self,
        handle: &str,
        values: [Option<f64>; FIELD_COUNT],
    ) -> Result<SpeciesId> {
        let id = self.add_species(handle)?;
        for (field, value) in Field::ALL.into_iter().zip(values) {
            if let Some(value) = value {
                self.set_field(id, field, value)?;
            }
        }
        Ok(id)
    }
}

fn pair_key(a: SpeciesId, b: SpeciesId) -> (SpeciesId, SpeciesId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Read-only dense n×n table of resolved pair parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct PairTable {
    n: usize,
    entries: Vec<PairParameters>,
}

impl PairTable {
    /// Parameters for a pair. Species indices must be in range.
    #[inline]
    pub fn get(&self, a: SpeciesId, b: SpeciesId) -> &PairParameters {
        debug_assert!(
            a.0 < self.n && b.0 < self.n,
            "species pair ({a}, {b}) outside table of {} species",
            self.n
        );
        &self.entries[a.0 * self.n + b.0]
    }

    /// Largest pair cutoff in the table.
    pub fn max_r_cut(&self) -> f64 {
        self.entries.iter().map(|p| p.r_cut).fold(0.0, f64::max)
    }

    /// Raise per-species cutoffs until every resolved pair cutoff is covered
    /// by the entry of one of its two species.
    pub fn cover_r_cuts(&self, mut r_cuts: Vec<f64>) -> Vec<f64> {
        debug_assert_eq!(r_cuts.len(), self.n);
        for i in 0..self.n {
            for j in 0..self.n {
                let rc = self.entries[i * self.n + j].r_cut;
                if rc > r_cuts[i].max(r_cuts[j]) {
                    r_cuts[i] = rc;
                }
            }
        }
        r_cuts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::potential::LennardJones;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn two_species() -> (ParameterTable, SpeciesId, SpeciesId) {
        let mut table = ParameterTable::new();
        let a = table.add_species("A").unwrap();
        let b = table.add_species("B").unwrap();
        table.set_field(a, Field::Epsilon, 1.0).unwrap();
        table.set_field(a, Field::Sigma, 1.0).unwrap();
        table.set_field(a, Field::RCut, 2.5).unwrap();
        table.set_field(b, Field::Epsilon, 4.0).unwrap();
        table.set_field(b, Field::Sigma, 2.0).unwrap();
        table.set_field(b, Field::RCut, 5.0).unwrap();
        (table, a, b)
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>().unwrap(), field);
        }
        assert!(matches!(
            "radius".parse::<Field>(),
            Err(PairError::UnknownField(name)) if name == "radius"
        ));
    }

    #[test]
    fn test_duplicate_species_rejected() {
        let mut table = ParameterTable::new();
        table.add_species("A").unwrap();
        let err = table.add_species("A").unwrap_err();
        assert!(matches!(err, PairError::DuplicateSpecies(ref h) if h == "A"));
        assert!(err.is_configuration());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_invalid_handles_rejected() {
        let mut table = ParameterTable::new();
        for handle in ["", "a b", "x=1", "tab\t"] {
            assert!(matches!(
                table.add_species(handle),
                Err(PairError::InvalidHandle(_))
            ));
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_fields_default_to_zero() {
        let mut table = ParameterTable::new();
        let a = table.add_species("A").unwrap();
        let record = table.record(a).unwrap();
        for field in Field::ALL {
            assert_eq!(record.get(field), None);
            assert_eq!(record.value(field), 0.0);
        }
        assert_eq!(table.r_cuts(), vec![0.0]);
    }

    #[test]
    fn test_set_by_name() {
        let mut table = ParameterTable::new();
        table.add_species("A").unwrap();
        table.set("A", "alpha_A", 0.25).unwrap();
        let a = table.species("A").unwrap();
        assert_eq!(table.record(a).unwrap().get(Field::AlphaA), Some(0.25));

        assert!(matches!(
            table.set("A", "alpha", 1.0),
            Err(PairError::UnknownField(_))
        ));
        assert!(matches!(
            table.set("B", "sigma", 1.0),
            Err(PairError::UnknownSpecies(_))
        ));
        assert!(matches!(
            table.set_field(SpeciesId::from_index(7), Field::Sigma, 1.0),
            Err(PairError::UnknownSpecies(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut table = ParameterTable::new();
        let a = table.add_species("A").unwrap();
        assert!(table.set_field(a, Field::RCut, -1.0).is_err());
        assert!(table.set_field(a, Field::Sigma, f64::NAN).is_err());
        assert!(table.set_field(a, Field::Epsilon, f64::INFINITY).is_err());
        // Shape parameters may be negative.
        table.set_field(a, Field::G, -3.0).unwrap();
        assert_eq!(table.record(a).unwrap().get(Field::RCut), None);
    }

    #[test]
    fn test_like_pair_carries_through() {
        let (table, a, _) = two_species();
        let p = table.resolve_pair(a, a).unwrap();
        assert_eq!(p.epsilon, 1.0);
        assert_eq!(p.sigma, 1.0);
        assert_eq!(p.r_cut, 2.5);
    }

    #[test]
    fn test_lorentz_berthelot_mixing() {
        let (table, a, b) = two_species();
        let p = table.resolve_pair(a, b).unwrap();
        assert_relative_eq!(p.epsilon, 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.sigma, 1.5, epsilon = 1e-12);
        assert_eq!(p.r_cut, 5.0);
        assert_eq!(p, table.resolve_pair(b, a).unwrap());
    }

    #[test]
    fn test_pair_override_wins_and_is_symmetric() {
        let (mut table, a, b) = two_species();
        table.set_pair_field(b, a, Field::Epsilon, 0.5).unwrap();
        table.set_pair_field(a, b, Field::RG, 1.25).unwrap();

        let ab = table.resolve_pair(a, b).unwrap();
        assert_eq!(ab.epsilon, 0.5);
        assert_eq!(ab.r_g, 1.25);
        assert_relative_eq!(ab.sigma, 1.5, epsilon = 1e-12);
        assert_eq!(ab, table.resolve_pair(b, a).unwrap());
        assert_eq!(table.overrides().count(), 1);

        // Like pairs are untouched.
        assert_eq!(table.resolve_pair(a, a).unwrap().epsilon, 1.0);
    }

    #[test]
    fn test_r_cuts_and_max() {
        let (mut table, _, _) = two_species();
        table.add_species("C").unwrap();
        assert_eq!(table.r_cuts(), vec![2.5, 5.0, 0.0]);
        assert_eq!(table.max_r_cut(), 5.0);
    }

    #[test]
    fn test_r_cuts_cover_pair_override() {
        let mut table = ParameterTable::new();
        let a = table.add_species("A").unwrap();
        let b = table.add_species("B").unwrap();
        table.set_field(a, Field::RCut, 1.5).unwrap();
        table.set_field(b, Field::RCut, 1.5).unwrap();
        table.set_pair_field(a, b, Field::RCut, 3.0).unwrap();
        assert_eq!(table.r_cuts(), vec![3.0, 1.5]);
        assert_eq!(table.max_r_cut(), 3.0);

        // A smaller override leaves the species cutoffs alone.
        table.set_pair_field(a, b, Field::RCut, 1.0).unwrap();
        assert_eq!(table.r_cuts(), vec![1.5, 1.5]);
    }

    #[test]
    fn test_validate() {
        let table = ParameterTable::new();
        assert!(matches!(table.validate(), Err(PairError::NoSpecies)));

        let mut table = ParameterTable::new();
        let a = table.add_species("A").unwrap();
        table.set_field(a, Field::Epsilon, 1.0).unwrap();
        table.set_field(a, Field::RCut, 2.5).unwrap();
        match table.validate() {
            Err(PairError::MissingField { species, field }) => {
                assert_eq!(species, "A");
                assert_eq!(field, "sigma");
            }
            other => panic!("expected missing sigma, got {other:?}"),
        }

        table.set_field(a, Field::Sigma, 1.0).unwrap();
        table.validate().unwrap();
    }

    #[test]
    fn test_pair_table_matches_resolve() {
        let (table, a, b) = two_species();
        let pairs = table.build_pair_table(&LennardJones).unwrap();
        for (x, y) in [(a, a), (a, b), (b, a), (b, b)] {
            assert_eq!(*pairs.get(x, y), table.resolve_pair(x, y).unwrap());
        }
        assert_eq!(pairs.max_r_cut(), 5.0);
    }

    #[test]
    fn test_revision_tracks_mutation() {
        let mut table = ParameterTable::new();
        let r0 = table.revision();
        let a = table.add_species("A").unwrap();
        let r1 = table.revision();
        assert!(r1 > r0);
        let _ = table.add_species("A");
        assert_eq!(table.revision(), r1);
        table.set_field(a, Field::Sigma, 1.0).unwrap();
        assert!(table.revision() > r1);
    }

    fn positive() -> impl Strategy<Value = f64> {
        0.01f64..10.0
    }

    proptest! {
        #[test]
        fn resolve_pair_commutative(
            eps in prop::collection::vec(positive(), 2..6),
            sig in prop::collection::vec(positive(), 2..6),
            shape in prop::collection::vec(-5.0f64..5.0, 2..6),
        ) {
            let n = eps.len().min(sig.len()).min(shape.len());
            let mut table = ParameterTable::new();
            for k in 0..n {
                let id = table.add_species(&format!("S{k}")).unwrap();
                table.set_field(id, Field::Epsilon, eps[k]).unwrap();
                table.set_field(id, Field::Sigma, sig[k]).unwrap();
                table.set_field(id, Field::RCut, 2.5 * sig[k]).unwrap();
                table.set_field(id, Field::SigmaG, shape[k]).unwrap();
            }
            for i in 0..n {
                for j in 0..n {
                    let (a, b) = (SpeciesId::from_index(i), SpeciesId::from_index(j));
                    prop_assert_eq!(
                        table.resolve_pair(a, b).unwrap(),
                        table.resolve_pair(b, a).unwrap()
                    );
                }
            }
        }

        #[test]
        fn max_r_cut_is_largest_set_cutoff(cuts in prop::collection::vec(0.0f64..20.0, 1..8)) {
            let mut table = ParameterTable::new();
            for (k, &rc) in cuts.iter().enumerate() {
                let id = table.add_species(&format!("S{k}")).unwrap();
                table.set_field(id, Field::RCut, rc).unwrap();
            }
            let r_cuts = table.r_cuts();
            prop_assert_eq!(r_cuts.len(), cuts.len());
            prop_assert!(r_cuts.iter().all(|&rc| rc >= 0.0));
            let expected = cuts.iter().copied().fold(0.0, f64::max);
            prop_assert_eq!(table.max_r_cut(), expected);
        }
    }
}
