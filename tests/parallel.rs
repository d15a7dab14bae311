//! Two-rank solves over in-process channels, checked against the serial solve.

use std::rc::Rc;
use std::sync::Arc;
use std::thread;

use approx::assert_abs_diff_eq;
use ldusolve::parallel::ChannelComm;
use ldusolve::{
    Comm, InterfaceCoupling, LduAddressing, LduError, LduInterface, LduMatrix, ProcessorInterface, SolverControls,
    solve,
};

const N: usize = 20;

fn chain(n: usize) -> LduMatrix {
    let addr = Arc::new(LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap());
    LduMatrix::symmetric(addr, vec![2.1; n], vec![-1.0; n - 1]).unwrap()
}

fn global_source(i: usize) -> f64 {
    (i as f64 * 0.3).sin() + if i % 7 == 0 { 1.0 } else { 0.0 }
}

fn serial_solution(controls: &SolverControls) -> Vec<f64> {
    let m = chain(2 * N);
    let source: Vec<f64> = (0..2 * N).map(global_source).collect();
    let mut psi = vec![0.0; 2 * N];
    assert!(solve("T", &m, &mut psi, &source, controls).unwrap().converged);
    psi
}

/// Each rank owns `N` consecutive cells of the global chain.
fn distributed_solution(controls: &SolverControls) -> Vec<f64> {
    let handles: Vec<_> = ChannelComm::create(2)
        .into_iter()
        .map(|comm| {
            let controls = controls.clone();
            thread::spawn(move || {
                let rank = comm.rank();
                let comm: Rc<dyn Comm> = Rc::new(comm);
                let boundary_cell = if rank == 0 { N - 1 } else { 0 };
                let iface = ProcessorInterface::new(vec![boundary_cell], 1 - rank, 0, Rc::clone(&comm)).unwrap();
                let m = chain(N)
                    .with_interface(InterfaceCoupling::symmetric(Rc::new(iface), vec![1.0]))
                    .unwrap()
                    .with_comm(comm);

                let source: Vec<f64> = (0..N).map(|i| global_source(rank * N + i)).collect();
                let mut psi = vec![0.0; N];
                let perf = solve("T", &m, &mut psi, &source, &controls).unwrap();
                assert!(perf.converged, "rank {rank}: {perf:?}");
                (perf.n_iterations, psi)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    // every rank takes the same convergence decisions
    assert_eq!(results[0].0, results[1].0);
    results.into_iter().flat_map(|(_, psi)| psi).collect()
}

#[test]
fn pcg_on_two_ranks_matches_serial() {
    let controls = SolverControls::new("PCG").with_preconditioner("DIC").with_tolerance(1e-12);
    let serial = serial_solution(&controls);
    let parallel = distributed_solution(&controls);
    for i in 0..2 * N {
        assert_abs_diff_eq!(serial[i], parallel[i], epsilon = 1e-8);
    }
}

#[test]
fn pbicgstab_on_two_ranks_matches_serial() {
    let controls = SolverControls::new("PBiCGStab").with_preconditioner("DIC").with_tolerance(1e-12);
    let serial = serial_solution(&controls);
    let parallel = distributed_solution(&controls);
    for i in 0..2 * N {
        assert_abs_diff_eq!(serial[i], parallel[i], epsilon = 1e-8);
    }
}

#[test]
fn gamg_on_two_ranks_matches_serial() {
    let controls = SolverControls::new("GAMG").with_smoother("GaussSeidel").with_tolerance(1e-12).with_max_iter(200);
    let serial = serial_solution(&controls);
    let parallel = distributed_solution(&controls);
    for i in 0..2 * N {
        assert_abs_diff_eq!(serial[i], parallel[i], epsilon = 1e-8);
    }
}

#[test]
fn exchanges_must_alternate_init_and_complete() {
    let handles: Vec<_> = ChannelComm::create(2)
        .into_iter()
        .map(|comm| {
            thread::spawn(move || {
                let rank = comm.rank();
                let comm: Rc<dyn Comm> = Rc::new(comm);
                let a = ProcessorInterface::new(vec![0], 1 - rank, 0, Rc::clone(&comm)).unwrap();
                let b = ProcessorInterface::new(vec![1], 1 - rank, 1, comm).unwrap();
                let psi = [1.0, 2.0];
                let mut y = [0.0; 2];

                let pending = a.init_update(&psi, 0).unwrap();
                let second = a.init_update(&psi, 0);
                assert!(matches!(second, Err(LduError::CommunicationError(_))));

                // b has nothing outstanding even though a does
                let stolen = b.complete_update(pending, &mut y, &[1.0]);
                assert!(matches!(stolen, Err(LduError::CommunicationError(_))));
                assert_eq!(y, [0.0, 0.0]);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
