//! Named constructors used by scripting front ends to create fixes by tag.

use crate::error::{PairError, Result};
use crate::fix::{Fix, PairFix};
use crate::species::{FIELD_COUNT, Field};

/// Registration tag of the truncated Lennard-Jones fix.
pub const LJ_CUT_TAG: &str = "LJCut";

/// Configuration field names accepted by every pair fix, in restart order.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = {
    let mut names = [""; FIELD_COUNT];
    let mut i = 0;
    while i < FIELD_COUNT {
        names[i] = Field::ALL[i].name();
        i += 1;
    }
    names
};

/// How a binding layer constructs and restores one kind of fix.
#[derive(Clone, Copy)]
pub struct FixRegistration {
    /// Tag the fix is created by.
    pub name: &'static str,
    /// Recognised per-species fields.
    pub fields: &'static [&'static str],
    /// Create an unconfigured fix with the given handle.
    pub construct: fn(&str) -> Box<dyn Fix>,
    /// Restore a fix from a restart chunk.
    pub restore: fn(&str, &str) -> Result<Box<dyn Fix>>,
}

fn construct_lj_cut(handle: &str) -> Box<dyn Fix> {
    Box::new(PairFix::new(handle))
}

fn restore_lj_cut(handle: &str, chunk: &str) -> Result<Box<dyn Fix>> {
    Ok(Box::new(PairFix::from_restart(handle, chunk)?))
}

static REGISTRY: [FixRegistration; 1] = [FixRegistration {
    name: LJ_CUT_TAG,
    fields: &FIELD_NAMES,
    construct: construct_lj_cut,
    restore: restore_lj_cut,
}];

/// All registered fix kinds.
pub fn registrations() -> &'static [FixRegistration] {
    &REGISTRY
}

/// Find a registration by tag.
pub fn lookup(name: &str) -> Option<&'static FixRegistration> {
    REGISTRY.iter().find(|r| r.name == name)
}

/// Construct a fix by tag.
pub fn create(name: &str, handle: &str) -> Result<Box<dyn Fix>> {
    let registration = lookup(name).ok_or_else(|| PairError::UnknownStyle(name.to_string()))?;
    Ok((registration.construct)(handle))
}
