//! Reductions and updates over cell fields.
//!
//! Local reductions are generic over `num_traits::Float` and always sum in
//! ascending index order. The `g_*` variants add a global sum over the ranks
//! of a communicator.

use num_traits::Float;

use crate::error::LduError;
use crate::parallel::Comm;

/// Σ x
pub fn sum<T: Float>(x: &[T]) -> T {
    x.iter().fold(T::zero(), |acc, &v| acc + v)
}

/// Σ |x|
pub fn sum_mag<T: Float>(x: &[T]) -> T {
    x.iter().fold(T::zero(), |acc, &v| acc + v.abs())
}

/// Σ a·b
pub fn sum_prod<T: Float>(a: &[T], b: &[T]) -> T {
    a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Σ x²
pub fn sum_sqr<T: Float>(x: &[T]) -> T {
    x.iter().fold(T::zero(), |acc, &v| acc + v * v)
}

/// Add a small value of matching sign so `s` can be used as a divisor.
pub fn stabilise<T: Float>(s: T, small: T) -> T {
    if s >= T::zero() { s + small } else { s - small }
}

pub fn g_sum(comm: &dyn Comm, x: &[f64]) -> Result<f64, LduError> {
    comm.sum(sum(x))
}

pub fn g_sum_mag(comm: &dyn Comm, x: &[f64]) -> Result<f64, LduError> {
    comm.sum(sum_mag(x))
}

pub fn g_sum_prod(comm: &dyn Comm, a: &[f64], b: &[f64]) -> Result<f64, LduError> {
    comm.sum(sum_prod(a, b))
}

pub fn g_sum_sqr(comm: &dyn Comm, x: &[f64]) -> Result<f64, LduError> {
    comm.sum(sum_sqr(x))
}

/// Global mean of `x`; zero when no rank holds any cells.
pub fn g_average(comm: &dyn Comm, x: &[f64]) -> Result<f64, LduError> {
    let mut v = [sum(x), x.len() as f64];
    comm.all_reduce(&mut v)?;
    Ok(if v[1] > 0.0 { v[0] / v[1] } else { 0.0 })
}

/// y += a·x
pub fn axpy(a: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi += a * xi;
    }
}
