//! Solver dictionaries read through serde and resolved through the selection tables.

use std::sync::Arc;

use ldusolve::{LduAddressing, LduError, LduMatrix, PreconditionerControls, SelectionTables, SolverControls};

fn chain(n: usize) -> LduMatrix {
    let addr = Arc::new(LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap());
    LduMatrix::symmetric(addr, vec![2.5; n], vec![-1.0; n - 1]).unwrap()
}

#[test]
fn camel_case_dictionary_with_flattened_gamg_keys() {
    let c: SolverControls = serde_json::from_str(
        r#"{
            "solver": "GAMG",
            "smoother": "DICGaussSeidel",
            "tolerance": 1e-7,
            "relTol": 0.01,
            "maxIter": 50,
            "nCellsInCoarsestLevel": 25,
            "mergeLevels": 2,
            "nPreSweeps": 1,
            "nPostSweeps": 3,
            "directSolveCoarsest": true,
            "scaleCorrection": false
        }"#,
    )
    .unwrap();
    assert_eq!(c.solver, "GAMG");
    assert_eq!(c.smoother, "DICGaussSeidel");
    assert_eq!((c.tolerance, c.rel_tol, c.max_iter, c.min_iter), (1e-7, 0.01, 50, 0));
    assert_eq!(c.gamg.n_cells_in_coarsest_level, 25);
    assert_eq!(c.gamg.merge_levels, 2);
    assert_eq!((c.gamg.n_pre_sweeps, c.gamg.n_post_sweeps), (1, 3));
    assert!(c.gamg.direct_solve_coarsest);
    assert_eq!(c.gamg.scale_correction, Some(false));
    // untouched keys keep their defaults
    assert_eq!(c.gamg.max_levels, 50);
    assert_eq!(c.gamg.agglomerator, "algebraicPair");
    assert!(c.validate().is_ok());
}

#[test]
fn empty_dictionary_takes_defaults() {
    let c: SolverControls = serde_json::from_str("{}").unwrap();
    assert_eq!(c, SolverControls::default());
    assert_eq!(c.preconditioner, PreconditionerControls::Name("none".into()));
}

#[test]
fn preconditioner_as_name_or_dictionary() {
    let c: SolverControls = serde_json::from_str(r#"{"solver": "PCG", "preconditioner": "DIC"}"#).unwrap();
    assert_eq!(c.preconditioner.name(), "DIC");

    let c: SolverControls = serde_json::from_str(
        r#"{
            "solver": "PCG",
            "tolerance": 1e-9,
            "preconditioner": {
                "preconditioner": "GAMG",
                "smoother": "GaussSeidel",
                "nCellsInCoarsestLevel": 4,
                "directSolveCoarsest": true,
                "nVcycles": 1
            }
        }"#,
    )
    .unwrap();
    assert_eq!(c.preconditioner.name(), "GAMG");
    let inner = c.preconditioner.controls(&c);
    assert_eq!(inner.gamg.n_cells_in_coarsest_level, 4);
    assert_eq!(inner.gamg.n_vcycles, 1);
    // the outer dictionary is unaffected by the nested one
    assert_eq!(c.gamg.n_cells_in_coarsest_level, 10);

    let m = chain(40);
    let source = vec![1.0; 40];
    let mut psi = vec![0.0; 40];
    let perf = SelectionTables::standard().solve("T", &m, &mut psi, &source, &c).unwrap();
    assert!(perf.converged);
    assert_eq!(perf.solver_name, "GAMGPCG");
}

#[test]
fn controls_serialise_back_to_camel_case() {
    let c = SolverControls::new("PBiCGStab").with_preconditioner("DILU").with_rel_tol(0.05);
    let json = serde_json::to_value(&c).unwrap();
    assert_eq!(json["solver"], "PBiCGStab");
    assert_eq!(json["preconditioner"], "DILU");
    assert_eq!(json["relTol"], 0.05);
    assert_eq!(json["nCellsInCoarsestLevel"], 10);
    let back: SolverControls = serde_json::from_value(json).unwrap();
    assert_eq!(back, c);
}

#[test]
fn out_of_range_values_are_invalid_config() {
    let c: SolverControls = serde_json::from_str(r#"{"solver": "PCG", "maxIter": 0}"#).unwrap();
    let m = chain(5);
    let mut psi = vec![0.0; 5];
    assert!(matches!(
        ldusolve::solve("T", &m, &mut psi, &[1.0; 5], &c),
        Err(LduError::InvalidConfig(_))
    ));

    let c: SolverControls =
        serde_json::from_str(r#"{"solver": "PCG", "preconditioner": {"preconditioner": "DIC", "tolerance": -1}}"#)
            .unwrap();
    assert!(matches!(c.validate(), Err(LduError::InvalidConfig(_))));
}

#[test]
fn unknown_solver_names_the_valid_ones() {
    let c: SolverControls = serde_json::from_str(r#"{"solver": "PBiCG"}"#).unwrap();
    let m = chain(5);
    let mut psi = vec![0.0; 5];
    match ldusolve::solve("T", &m, &mut psi, &[1.0; 5], &c) {
        Err(LduError::UnknownType { kind, name, valid }) => {
            assert_eq!(kind, "solver");
            assert_eq!(name, "PBiCG");
            assert!(valid.contains(&"PCG".to_string()));
            assert!(!valid.contains(&"PBiCG".to_string()));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(psi, vec![0.0; 5]);
}
