//! Argon-krypton mixture driven through the LJ pair fix.
//!
//! The example plays the role of the simulation driver: it owns positions,
//! builds the candidate pair list, and integrates with velocity Verlet.

use phyz_md::{NeighborPair, PairFix, PairStyleConfig, RestartFormat, SpeciesId, Vec3};

const CONFIG: &str = r#"{
    "species": [
        { "handle": "Ar", "epsilon": 0.0103, "sigma": 3.4, "rCut": 8.5 },
        { "handle": "Kr", "epsilon": 0.0140, "sigma": 3.65, "rCut": 9.1 }
    ]
}"#;

/// Minimum-image displacement in a cubic box.
fn wrap(mut dr: Vec3, box_len: f64) -> Vec3 {
    for d in 0..3 {
        dr[d] -= box_len * (dr[d] / box_len).round();
    }
    dr
}

/// All pairs within `r_search`, each unordered pair once.
fn build_pairs(x: &[Vec3], species: &[SpeciesId], box_len: f64, r_search: f64) -> Vec<NeighborPair> {
    let r2_max = r_search * r_search;
    let mut pairs = Vec::new();
    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            let dr = wrap(x[i] - x[j], box_len);
            if dr.norm_squared() < r2_max {
                pairs.push(NeighborPair::new(i, j, species[i], species[j], dr));
            }
        }
    }
    pairs
}

fn main() -> phyz_md::Result<()> {
    env_logger::init();

    let mut fix: PairFix = PairStyleConfig::from_json(CONFIG)?.build("lj")?;
    let ar = fix.table().species("Ar")?;
    let kr = fix.table().species("Kr")?;
    fix.prepare_for_run()?;

    let r_search = fix.max_r_cut();
    println!("Neighbor search radius: {r_search:.2} Å");

    // Simple cubic lattice, alternating species
    let n_side = 6;
    let spacing = 4.0;
    let box_len = n_side as f64 * spacing;
    let mut x = Vec::new();
    let mut species = Vec::new();
    for ix in 0..n_side {
        for iy in 0..n_side {
            for iz in 0..n_side {
                x.push(Vec3::new(ix as f64, iy as f64, iz as f64) * spacing);
                species.push(if (ix + iy + iz) % 2 == 0 { ar } else { kr });
            }
        }
    }
    let mass = |s: SpeciesId| if s == ar { 39.948 } else { 83.798 };
    let mut v = vec![Vec3::zeros(); x.len()];
    let dt = 0.5;

    let mut pairs = build_pairs(&x, &species, box_len, r_search);
    let mut forces = vec![Vec3::zeros(); x.len()];
    fix.compute(&pairs, &mut forces, false)?;

    println!("{:>6} {:>14} {:>14}", "Step", "PE(eV)", "P_virial");
    for step in 1..=200 {
        for i in 0..x.len() {
            let a = forces[i] / mass(species[i]);
            v[i] += 0.5 * a * dt;
            x[i] += v[i] * dt;
            for d in 0..3 {
                x[i][d] = x[i][d].rem_euclid(box_len);
            }
        }

        pairs = build_pairs(&x, &species, box_len, r_search);
        forces.iter_mut().for_each(|f| *f = Vec3::zeros());
        let out = fix.compute(&pairs, &mut forces, step % 50 == 0)?;

        for i in 0..x.len() {
            v[i] += 0.5 * forces[i] / mass(species[i]) * dt;
        }

        if let Some(w) = out.virial {
            let p_virial = w.trace() / (3.0 * box_len.powi(3));
            println!("{step:6} {:14.6} {p_virial:14.6e}", out.energy);
        }
    }

    let mut per_particle = vec![0.0; x.len()];
    fix.single_point_eng(&pairs, &mut per_particle)?;
    let hottest = per_particle
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    println!("Highest per-particle energy: {hottest:.6} eV");

    fix.post_run()?;
    println!("\nRestart chunk:\n{}", fix.restart_chunk(RestartFormat::Exponential));
    Ok(())
}
