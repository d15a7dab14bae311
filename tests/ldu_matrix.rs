//! Algebraic properties of the LDU matrix products on random meshes.
//!
//! Meshes are random face lists (arbitrary orientation, coincident faces
//! allowed); products are checked against the dense view and for linearity.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use ldusolve::{LduAddressing, LduError, LduMatrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_matrix(rng: &mut StdRng, n: usize, n_faces: usize) -> LduMatrix {
    let mut owner = Vec::with_capacity(n_faces);
    let mut neighbour = Vec::with_capacity(n_faces);
    while owner.len() < n_faces {
        let (a, b) = (rng.gen_range(0..n), rng.gen_range(0..n));
        if a != b {
            owner.push(a);
            neighbour.push(b);
        }
    }
    let addr = Arc::new(LduAddressing::new(n, owner, neighbour).unwrap());
    let diag = (0..n).map(|_| rng.gen_range(1.0..5.0)).collect();
    let lower = (0..n_faces).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let upper = (0..n_faces).map(|_| rng.gen_range(-1.0..1.0)).collect();
    LduMatrix::asymmetric(addr, diag, lower, upper).unwrap()
}

fn random_vector(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

#[test]
fn amul_is_linear() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        let m = random_matrix(&mut rng, 30, 70);
        let x = random_vector(&mut rng, 30);
        let y = random_vector(&mut rng, 30);
        let xy: Vec<f64> = x.iter().zip(&y).map(|(a, b)| a + b).collect();

        let (mut ax, mut ay, mut axy) = (vec![0.0; 30], vec![0.0; 30], vec![0.0; 30]);
        m.amul(&x, 0, &mut ax).unwrap();
        m.amul(&y, 0, &mut ay).unwrap();
        m.amul(&xy, 0, &mut axy).unwrap();
        for i in 0..30 {
            assert_abs_diff_eq!(axy[i], ax[i] + ay[i], epsilon = 1e-12);
        }

        let mut a0 = vec![1.0; 30];
        m.amul(&vec![0.0; 30], 0, &mut a0).unwrap();
        assert!(a0.iter().all(|&v| v == 0.0));
    }
}

#[test]
fn unit_vectors_reproduce_dense_columns() {
    let mut rng = StdRng::seed_from_u64(11);
    let m = random_matrix(&mut rng, 12, 25);
    let dense = m.to_dense();
    let mut e = vec![0.0; 12];
    let mut col = vec![0.0; 12];
    for j in 0..12 {
        e[j] = 1.0;
        m.amul(&e, 0, &mut col).unwrap();
        for i in 0..12 {
            assert_abs_diff_eq!(col[i], dense[(i, j)], epsilon = 1e-14);
        }
        e[j] = 0.0;
    }
}

#[test]
fn tmul_is_the_transpose() {
    let mut rng = StdRng::seed_from_u64(3);
    let m = random_matrix(&mut rng, 15, 40);
    let x = random_vector(&mut rng, 15);
    let y = random_vector(&mut rng, 15);
    let (mut ax, mut aty) = (vec![0.0; 15], vec![0.0; 15]);
    m.amul(&x, 0, &mut ax).unwrap();
    m.tmul(&y, 0, &mut aty).unwrap();
    // y·(A x) == (Aᵀ y)·x
    let lhs: f64 = y.iter().zip(&ax).map(|(a, b)| a * b).sum();
    let rhs: f64 = aty.iter().zip(&x).map(|(a, b)| a * b).sum();
    assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-12);
}

#[test]
fn products_are_bitwise_repeatable() {
    let mut rng = StdRng::seed_from_u64(5);
    let m = random_matrix(&mut rng, 50, 120);
    let x = random_vector(&mut rng, 50);
    let (mut a, mut b) = (vec![0.0; 50], vec![0.0; 50]);
    m.amul(&x, 0, &mut a).unwrap();
    m.amul(&x, 0, &mut b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn wrong_vector_length_is_reported() {
    let mut rng = StdRng::seed_from_u64(1);
    let m = random_matrix(&mut rng, 6, 8);
    let mut y = vec![0.0; 6];
    assert!(matches!(m.amul(&[0.0; 5], 0, &mut y), Err(LduError::DimensionMismatch { .. })));
    assert!(matches!(
        LduMatrix::symmetric(Arc::clone(m.addressing()), vec![1.0; 6], vec![0.0; 3]),
        Err(LduError::DimensionMismatch { .. })
    ));
}

#[test]
fn malformed_addressing_is_rejected() {
    assert!(matches!(LduAddressing::new(3, vec![0, 2], vec![1, 2]), Err(LduError::InvalidTopology(_))));
    assert!(matches!(LduAddressing::new(3, vec![0], vec![3]), Err(LduError::InvalidTopology(_))));
}
