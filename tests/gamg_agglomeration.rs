//! Agglomeration hierarchy invariants on random and structured meshes.

use std::rc::Rc;
use std::sync::Arc;

use ldusolve::gamg::FaceRestrict;
use ldusolve::parallel::SerialComm;
use ldusolve::{GamgAgglomeration, GamgControls, GamgSolver, LduAddressing, LduError, LduMatrix, SelectionTables, SolverControls};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_addressing(rng: &mut StdRng, n: usize, n_faces: usize) -> Arc<LduAddressing> {
    let (mut owner, mut neighbour) = (Vec::new(), Vec::new());
    while owner.len() < n_faces {
        let (a, b) = (rng.gen_range(0..n), rng.gen_range(0..n));
        if a != b {
            owner.push(a);
            neighbour.push(b);
        }
    }
    Arc::new(LduAddressing::new(n, owner, neighbour).unwrap())
}

fn controls(threshold: usize) -> GamgControls {
    GamgControls { n_cells_in_coarsest_level: threshold, ..GamgControls::default() }
}

#[test]
fn restriction_is_surjective_on_random_meshes() {
    let mut rng = StdRng::seed_from_u64(42);
    for trial in 0..20 {
        let n = rng.gen_range(5..200);
        let n_faces = rng.gen_range(0..3 * n);
        let addr = random_addressing(&mut rng, n, n_faces);
        let weights: Vec<f64> = (0..n_faces).map(|_| rng.gen_range(0.0..1.0)).collect();
        let merge_levels = 1 + trial % 2;
        let c = GamgControls { merge_levels, ..controls(4) };
        let agg = GamgAgglomeration::from_face_weights(&addr, &[], &weights, &c, &SerialComm).unwrap();

        let mut fine = Arc::clone(&addr);
        for level in agg.levels() {
            let n_coarse = level.n_coarse_cells();
            assert_eq!(level.restrict_addressing().len(), fine.n_cells());
            let mut hits = vec![0usize; n_coarse];
            for &cell in level.restrict_addressing() {
                assert!(cell < n_coarse);
                hits[cell] += 1;
            }
            assert!(hits.iter().all(|&h| h > 0));
            assert!(hits.iter().all(|&h| h <= 1 << merge_levels));

            // every coarse face joins two distinct coarse cells, owner < neighbour
            let coarse = level.addressing();
            for f in 0..coarse.n_faces() {
                assert!(coarse.owner()[f] < coarse.neighbour()[f]);
            }
            for (f, fr) in level.face_restrict().iter().enumerate() {
                let (a, b) = (level.restrict_addressing()[fine.owner()[f]], level.restrict_addressing()[fine.neighbour()[f]]);
                match *fr {
                    FaceRestrict::Internal(cell) => assert!(a == b && a == cell),
                    FaceRestrict::Face { face, flipped } => {
                        assert_eq!((coarse.owner()[face], coarse.neighbour()[face]), (a.min(b), a.max(b)));
                        assert_eq!(flipped, a > b);
                    }
                }
            }
            fine = Arc::clone(coarse);
        }
    }
}

#[test]
fn three_cells_with_threshold_two_give_one_level() {
    let addr = Arc::new(LduAddressing::new(3, vec![0, 1], vec![1, 2]).unwrap());
    let m = LduMatrix::symmetric(Arc::clone(&addr), vec![2.0; 3], vec![-1.0; 2]).unwrap();
    let agg = GamgAgglomeration::algebraic_pair(&m, &controls(2)).unwrap();
    assert_eq!(agg.n_coarse_levels(), 1);
    assert_eq!(agg.level(0).n_coarse_cells(), 2);
}

#[test]
fn coarse_levels_never_drop_below_threshold() {
    for n in [11, 17, 33, 100] {
        // 11 cells would pair down to 6, so that candidate level is discarded
        let addr = Arc::new(LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap());
        let agg = GamgAgglomeration::from_face_weights(&addr, &[], &vec![1.0; n - 1], &controls(10), &SerialComm).unwrap();
        if n == 11 {
            assert_eq!(agg.n_coarse_levels(), 0);
        }
        for level in agg.levels() {
            assert!(level.n_coarse_cells() >= 10, "n = {n}");
        }
    }
}

#[test]
fn hierarchy_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(9);
    let addr = random_addressing(&mut rng, 150, 400);
    let weights: Vec<f64> = (0..400).map(|_| rng.gen_range(0.0..1.0)).collect();
    let a = GamgAgglomeration::from_face_weights(&addr, &[], &weights, &controls(5), &SerialComm).unwrap();
    let b = GamgAgglomeration::from_face_weights(&addr, &[], &weights, &controls(5), &SerialComm).unwrap();
    assert_eq!(a.n_coarse_levels(), b.n_coarse_levels());
    for (la, lb) in a.levels().iter().zip(b.levels()) {
        assert_eq!(la.restrict_addressing(), lb.restrict_addressing());
        assert_eq!(la.face_restrict(), lb.face_restrict());
    }
}

#[test]
fn rebuilt_mesh_needs_a_new_hierarchy() {
    let n = 40;
    let make = || Arc::new(LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap());
    let old = LduMatrix::symmetric(make(), vec![2.1; n], vec![-1.0; n - 1]).unwrap();
    let new = LduMatrix::symmetric(make(), vec![2.1; n], vec![-1.0; n - 1]).unwrap();

    let tables = SelectionTables::standard();
    let sc = SolverControls::new("GAMG");
    let agg = Rc::new(tables.new_agglomerator(&old, &sc.gamg).unwrap());
    assert!(GamgSolver::with_agglomeration(&tables, "p", &old, &sc, Rc::clone(&agg)).is_ok());
    assert!(matches!(
        GamgSolver::with_agglomeration(&tables, "p", &new, &sc, agg),
        Err(LduError::InvalidTopology(_))
    ));
}

#[test]
fn invalid_gamg_controls_are_rejected() {
    let addr = Arc::new(LduAddressing::new(4, vec![0, 1, 2], vec![1, 2, 3]).unwrap());
    let bad = GamgControls { n_cells_in_coarsest_level: 0, ..GamgControls::default() };
    assert!(matches!(
        GamgAgglomeration::from_face_weights(&addr, &[], &[1.0; 3], &bad, &SerialComm),
        Err(LduError::InvalidConfig(_))
    ));
    let bad = GamgControls { merge_levels: 0, ..GamgControls::default() };
    assert!(matches!(
        GamgAgglomeration::from_face_weights(&addr, &[], &[1.0; 3], &bad, &SerialComm),
        Err(LduError::InvalidConfig(_))
    ));
}
