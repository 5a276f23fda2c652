//! Integration tests for the LJ pair fix.

use approx::assert_relative_eq;
use phyz_md::{
    Field, Fix, FixState, NeighborPair, PairError, PairFix, PairStyleConfig, RestartFormat,
    SpeciesId, Vec3, registry,
};

/// Species A (ε=1, σ=1, rc=2.5) and B (ε=4, σ=2, rc=5).
fn two_species_fix() -> (PairFix, SpeciesId, SpeciesId) {
    let mut fix = PairFix::new("lj");
    let a = fix.add_species("A").unwrap();
    let b = fix.add_species("B").unwrap();
    for (id, eps, sigma, rc) in [(a, 1.0, 1.0, 2.5), (b, 4.0, 2.0, 5.0)] {
        fix.set_field(id, Field::Epsilon, eps).unwrap();
        fix.set_field(id, Field::Sigma, sigma).unwrap();
        fix.set_field(id, Field::RCut, rc).unwrap();
    }
    (fix, a, b)
}

/// Small cluster with every unordered pair listed once.
fn cluster(a: SpeciesId, b: SpeciesId) -> (Vec<Vec3>, Vec<NeighborPair>) {
    let x = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.1, 0.0, 0.0),
        Vec3::new(0.0, 1.3, 0.2),
        Vec3::new(1.5, 1.5, 1.5),
        Vec3::new(-2.0, 0.4, 0.1),
    ];
    let species = [a, a, b, b, a];
    let mut pairs = Vec::new();
    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            pairs.push(NeighborPair::from_positions(
                i, j, species[i], species[j], x[i], x[j],
            ));
        }
    }
    (x, pairs)
}

#[test]
fn test_single_species_scenarios() {
    let mut fix = PairFix::new("lj");
    let a = fix.add_species("A").unwrap();
    fix.set("A", "epsilon", 1.0).unwrap();
    fix.set("A", "sigma", 1.0).unwrap();
    fix.set("A", "rCut", 2.5).unwrap();

    let p = fix.resolve_pair(a, a).unwrap();
    assert_eq!(p.epsilon, 1.0);
    assert_eq!(p.sigma, 1.0);

    fix.prepare_for_run().unwrap();

    // r² = 1: E = 0, F/r = 24 (repulsive)
    let pairs = [NeighborPair::new(0, 1, a, a, Vec3::new(1.0, 0.0, 0.0))];
    let mut forces = vec![Vec3::zeros(); 2];
    let out = fix.compute(&pairs, &mut forces, false).unwrap();
    assert_relative_eq!(out.energy, 0.0, epsilon = 1e-12);
    assert_relative_eq!(forces[0].x, 24.0, epsilon = 1e-12);

    // r² = rc² = 6.25: nothing
    let pairs = [NeighborPair::new(0, 1, a, a, Vec3::new(2.5, 0.0, 0.0))];
    let mut forces = vec![Vec3::zeros(); 2];
    let out = fix.compute(&pairs, &mut forces, true).unwrap();
    assert_eq!(out.energy, 0.0);
    assert_eq!(forces, vec![Vec3::zeros(); 2]);
    assert_eq!(out.virial.unwrap().0, [0.0; 6]);
}

#[test]
fn test_mixed_pair_scenario() {
    let (fix, a, b) = two_species_fix();
    let ab = fix.resolve_pair(a, b).unwrap();
    assert_relative_eq!(ab.epsilon, 2.0, epsilon = 1e-12);
    assert_relative_eq!(ab.sigma, 1.5, epsilon = 1e-12);
    assert_eq!(ab, fix.resolve_pair(b, a).unwrap());
}

#[test]
fn test_duplicate_species_and_missing_sigma() {
    let mut fix = PairFix::new("lj");
    fix.add_species("A").unwrap();
    assert!(matches!(
        fix.add_species("A"),
        Err(PairError::DuplicateSpecies(_))
    ));

    fix.set("A", "epsilon", 1.0).unwrap();
    fix.set("A", "rCut", 2.5).unwrap();
    let err = fix.prepare_for_run().unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(err, PairError::MissingField { ref field, .. } if field == "sigma"));
    assert_ne!(fix.state(), FixState::Prepared);
}

#[test]
fn test_r_cuts_feed_neighbor_search() {
    let (mut fix, _, _) = two_species_fix();
    fix.add_species("C").unwrap();
    fix.set("C", "epsilon", 0.5).unwrap();
    fix.set("C", "sigma", 0.8).unwrap();
    fix.prepare_for_run().unwrap();

    let r_cuts = fix.r_cuts();
    assert_eq!(r_cuts, vec![2.5, 5.0, 0.0]);
    assert_eq!(fix.max_r_cut(), 5.0);
}

#[test]
fn test_momentum_and_energy_consistency() {
    let (mut fix, a, b) = two_species_fix();
    fix.prepare_for_run().unwrap();
    let (x, pairs) = cluster(a, b);

    let mut forces = vec![Vec3::zeros(); x.len()];
    let out = fix.compute(&pairs, &mut forces, true).unwrap();

    let net: Vec3 = forces.iter().sum();
    assert!(net.norm() < 1e-9 * forces.iter().map(|f| f.norm()).sum::<f64>().max(1.0));

    let mut energies = vec![0.0; x.len()];
    fix.single_point_eng(&pairs, &mut energies).unwrap();
    assert_relative_eq!(
        energies.iter().sum::<f64>(),
        out.energy,
        max_relative = 1e-12
    );

    // Virial trace equals Σ r·F over pairs
    let w = out.virial.unwrap();
    let r_dot_f: f64 = x.iter().zip(&forces).map(|(xi, fi)| xi.dot(fi)).sum();
    assert_relative_eq!(w.trace(), r_dot_f, max_relative = 1e-9);
}

#[test]
fn test_forces_match_energy_gradient() {
    let (mut fix, a, b) = two_species_fix();
    fix.prepare_for_run().unwrap();
    let (x, _) = cluster(a, b);
    let species = [a, a, b, b, a];

    let total_energy = |fix: &mut PairFix, x: &[Vec3]| {
        let mut pairs = Vec::new();
        for i in 0..x.len() {
            for j in (i + 1)..x.len() {
                pairs.push(NeighborPair::from_positions(
                    i, j, species[i], species[j], x[i], x[j],
                ));
            }
        }
        let mut forces = vec![Vec3::zeros(); x.len()];
        let out = fix.compute(&pairs, &mut forces, false).unwrap();
        (out.energy, forces)
    };

    let (_, forces) = total_energy(&mut fix, &x);
    let h = 1e-6;
    for k in 0..x.len() {
        for d in 0..3 {
            let mut xp = x.clone();
            let mut xm = x.clone();
            xp[k][d] += h;
            xm[k][d] -= h;
            let grad = (total_energy(&mut fix, &xp).0 - total_energy(&mut fix, &xm).0) / (2.0 * h);
            assert_relative_eq!(forces[k][d], -grad, epsilon = 1e-4, max_relative = 1e-5);
        }
    }
}

#[test]
fn test_restart_round_trip_through_fix() {
    let (mut fix, a, b) = two_species_fix();
    fix.set_field(b, Field::SigmaG, 0.75).unwrap();
    fix.set_pair_field(a, b, Field::Epsilon, 1.5).unwrap();
    fix.prepare_for_run().unwrap();

    for format in ["fixed", "exp"] {
        let format: RestartFormat = format.parse().unwrap();
        let chunk = fix.restart_chunk(format);
        let mut restored = PairFix::from_restart("lj", &chunk).unwrap();
        assert_eq!(restored.table(), fix.table());
        assert_eq!(restored.state(), FixState::Configuring);
        restored.prepare_for_run().unwrap();
        assert_eq!(restored.r_cuts(), fix.r_cuts());
    }
}

#[test]
fn test_restart_rejects_arity_mismatch() {
    let (fix, _, _) = two_species_fix();
    let chunk = fix
        .restart_chunk(RestartFormat::Fixed)
        .replace(" sigma_G=-", "");
    let err = PairFix::from_restart("lj", &chunk).unwrap_err();
    assert!(err.is_restart());
}

#[test]
fn test_second_run_phase() {
    let (mut fix, a, b) = two_species_fix();
    let (x, pairs) = cluster(a, b);

    fix.prepare_for_run().unwrap();
    let mut first = vec![Vec3::zeros(); x.len()];
    fix.compute(&pairs, &mut first, false).unwrap();
    fix.post_run().unwrap();
    assert_eq!(fix.state(), FixState::Finished);

    // Same table, same forces in the next phase.
    fix.prepare_for_run().unwrap();
    let mut second = vec![Vec3::zeros(); x.len()];
    fix.compute(&pairs, &mut second, false).unwrap();
    for (f1, f2) in first.iter().zip(&second) {
        assert_relative_eq!(*f1, *f2, epsilon = 1e-12);
    }

    // Changing a parameter between phases forces a new prepare.
    fix.post_run().unwrap();
    fix.set_field(a, Field::Epsilon, 2.0).unwrap();
    let mut forces = vec![Vec3::zeros(); x.len()];
    assert!(matches!(
        fix.compute(&pairs, &mut forces, false),
        Err(PairError::NotPrepared(_))
    ));
}

#[test]
fn test_driver_through_registry_and_config() {
    let config = PairStyleConfig::from_json(
        r#"{ "style": "LJCut",
             "species": [ { "handle": "Ar", "epsilon": 1.0, "sigma": 1.0, "rCut": 2.5 } ] }"#,
    )
    .unwrap();
    let built = config.build("lj").unwrap();

    let mut fix: Box<dyn Fix> = registry::create(registry::LJ_CUT_TAG, "lj").unwrap();
    fix.add_species("Ar").unwrap();
    fix.set("Ar", "epsilon", 1.0).unwrap();
    fix.set("Ar", "sigma", 1.0).unwrap();
    fix.set("Ar", "rCut", 2.5).unwrap();
    fix.prepare_for_run().unwrap();

    assert_eq!(
        fix.restart_chunk(RestartFormat::Fixed),
        built.restart_chunk(RestartFormat::Fixed)
    );
}
