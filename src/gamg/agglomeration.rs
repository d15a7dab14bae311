//! Agglomeration hierarchy: cell and face maps between successive levels.
//!
//! Level `i` of the hierarchy maps the cells of mesh level `i` (0 = finest) to
//! the cells of mesh level `i + 1`. Coarse faces are the distinct pairs of
//! coarse cells joined by at least one fine face, numbered in ascending
//! (lower cell, higher cell) order with the lower cell as owner. Fine faces
//! whose two cells land in the same coarse cell become part of that cell's
//! diagonal.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::GamgControls;
use crate::error::LduError;
use crate::gamg::pair::pair_cells;
use crate::interface::{AgglomeratedInterface, InterfaceCoupling, LduInterface};
use crate::matrix::{LduAddressing, LduMatrix};
use crate::parallel::Comm;

/// Where a fine face ends up on the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceRestrict {
    /// Both cells are in this coarse cell.
    Internal(usize),
    /// Coarse face `face`. `flipped` when the fine owner maps to the coarse
    /// neighbour, so upper and lower swap roles.
    Face { face: usize, flipped: bool },
}

#[derive(Debug)]
pub struct GamgLevel {
    restrict_addressing: Vec<usize>,
    face_restrict: Vec<FaceRestrict>,
    addressing: Arc<LduAddressing>,
    interfaces: Vec<AgglomeratedInterface>,
}

impl GamgLevel {
    /// Fine cell to coarse cell.
    pub fn restrict_addressing(&self) -> &[usize] {
        &self.restrict_addressing
    }

    pub fn face_restrict(&self) -> &[FaceRestrict] {
        &self.face_restrict
    }

    /// Addressing of the coarse mesh level.
    pub fn addressing(&self) -> &Arc<LduAddressing> {
        &self.addressing
    }

    pub fn n_coarse_cells(&self) -> usize {
        self.addressing.n_cells()
    }

    pub fn interfaces(&self) -> &[AgglomeratedInterface] {
        &self.interfaces
    }
}

#[derive(Debug)]
pub struct GamgAgglomeration {
    fine: Arc<LduAddressing>,
    levels: Vec<GamgLevel>,
}

impl GamgAgglomeration {
    /// Agglomerate by matrix coefficients: the weight of a face is the larger
    /// of its upper and lower coefficient magnitudes.
    pub fn algebraic_pair(matrix: &LduMatrix, controls: &GamgControls) -> Result<Self, LduError> {
        let weights: Vec<f64> = matrix
            .upper()
            .iter()
            .zip(matrix.lower())
            .map(|(u, l)| u.abs().max(l.abs()))
            .collect();
        let interfaces: Vec<Rc<dyn LduInterface>> =
            matrix.interfaces().iter().map(|c| Rc::clone(&c.interface)).collect();
        Self::from_face_weights(matrix.addressing(), &interfaces, &weights, controls, matrix.comm().as_ref())
    }

    /// Build the hierarchy from per-face coupling weights.
    ///
    /// Coarsening stops once the global cell count is at most
    /// `nCellsInCoarsestLevel` or `maxLevels` is reached. A candidate level is
    /// discarded when it would drop below `nCellsInCoarsestLevel` or when it
    /// reduces the global cell count by less than `minCoarseningRatio`.
    ///
    /// This is collective when the mesh has processor interfaces.
    pub fn from_face_weights(
        fine: &Arc<LduAddressing>,
        interfaces: &[Rc<dyn LduInterface>],
        face_weights: &[f64],
        controls: &GamgControls,
        comm: &dyn Comm,
    ) -> Result<Self, LduError> {
        controls.validate()?;
        LduError::check_len("face weights", fine.n_faces(), face_weights.len())?;
        for interface in interfaces {
            interface.validate(fine.n_cells())?;
        }

        let threshold = controls.n_cells_in_coarsest_level;
        let mut levels: Vec<GamgLevel> = Vec::new();
        let mut addr = Arc::clone(fine);
        let mut weights = face_weights.to_vec();
        let mut level_interfaces: Vec<Rc<dyn LduInterface>> = interfaces.to_vec();
        let mut forward = true;

        while levels.len() + 1 < controls.max_levels {
            let n_fine = addr.n_cells();
            let n_fine_global = comm.sum_count(n_fine)?;
            if n_fine_global <= threshold {
                break;
            }

            let mut restrict: Vec<usize> = (0..n_fine).collect();
            let mut n_coarse = n_fine;
            let mut pass_addr = Arc::clone(&addr);
            let mut pass_weights = weights.clone();
            for pass in 0..controls.merge_levels {
                let (pass_restrict, pass_n) = pair_cells(&pass_addr, &pass_weights, forward);
                forward = !forward;
                for r in restrict.iter_mut() {
                    *r = pass_restrict[*r];
                }
                n_coarse = pass_n;
                if pass + 1 < controls.merge_levels {
                    let (coarse, face_restrict) = coarse_addressing(&pass_addr, &pass_restrict, pass_n)?;
                    pass_weights = restrict_face_values(&face_restrict, &pass_weights, coarse.n_faces());
                    pass_addr = Arc::new(coarse);
                }
            }

            let n_coarse_global = comm.sum_count(n_coarse)?;
            if n_coarse_global < threshold {
                log::debug!(
                    "GAMG: discarding level {} with {n_coarse_global} cells (below {threshold})",
                    levels.len() + 1
                );
                break;
            }
            if (n_fine_global as f64) < controls.min_coarsening_ratio * n_coarse_global as f64 {
                log::debug!(
                    "GAMG: agglomeration stalled at level {} ({n_fine_global} -> {n_coarse_global} cells)",
                    levels.len() + 1
                );
                break;
            }

            let (coarse, face_restrict) = coarse_addressing(&addr, &restrict, n_coarse)?;
            let coarse_interfaces = level_interfaces
                .iter()
                .map(|i| i.agglomerate(&restrict))
                .collect::<Result<Vec<_>, _>>()?;
            log::debug!(
                "GAMG: level {} has {n_coarse_global} cells and {} faces locally",
                levels.len() + 1,
                coarse.n_faces()
            );

            weights = restrict_face_values(&face_restrict, &weights, coarse.n_faces());
            level_interfaces = coarse_interfaces.iter().map(|a| Rc::clone(&a.interface)).collect();
            addr = Arc::new(coarse);
            levels.push(GamgLevel {
                restrict_addressing: restrict,
                face_restrict,
                addressing: Arc::clone(&addr),
                interfaces: coarse_interfaces,
            });
        }

        Ok(Self { fine: Arc::clone(fine), levels })
    }

    /// Number of coarse levels (the finest level is not counted).
    pub fn n_coarse_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[GamgLevel] {
        &self.levels
    }

    pub fn level(&self, i: usize) -> &GamgLevel {
        &self.levels[i]
    }

    pub fn fine_addressing(&self) -> &Arc<LduAddressing> {
        &self.fine
    }

    /// Fail unless the hierarchy was built for exactly this addressing object.
    pub fn check_addressing(&self, addressing: &Arc<LduAddressing>) -> Result<(), LduError> {
        if Arc::ptr_eq(&self.fine, addressing) {
            Ok(())
        } else {
            Err(LduError::InvalidTopology(
                "agglomeration was built for a different mesh".into(),
            ))
        }
    }

    /// `coarse[c] = Σ fine[i]` over the fine cells `i` of coarse cell `c`.
    pub fn restrict_field(&self, coarse: &mut [f64], fine: &[f64], level: usize) -> Result<(), LduError> {
        let lvl = self.level_checked(level)?;
        LduError::check_len("restricted fine field", lvl.restrict_addressing.len(), fine.len())?;
        LduError::check_len("restricted coarse field", lvl.n_coarse_cells(), coarse.len())?;
        coarse.fill(0.0);
        for (&c, &v) in lvl.restrict_addressing.iter().zip(fine) {
            coarse[c] += v;
        }
        Ok(())
    }

    /// `fine[i] = coarse[restrict[i]]`
    pub fn prolong_field(&self, fine: &mut [f64], coarse: &[f64], level: usize) -> Result<(), LduError> {
        let lvl = self.level_checked(level)?;
        LduError::check_len("prolonged fine field", lvl.restrict_addressing.len(), fine.len())?;
        LduError::check_len("prolonged coarse field", lvl.n_coarse_cells(), coarse.len())?;
        for (f, &c) in fine.iter_mut().zip(&lvl.restrict_addressing) {
            *f = coarse[c];
        }
        Ok(())
    }

    /// Galerkin coarse matrix of `fine` on level `level`.
    ///
    /// The coarse diagonal sums the fine diagonal and both coefficients of
    /// every face internal to a coarse cell. Off-diagonals sum onto their
    /// coarse face, swapping upper and lower for flipped faces. Interface
    /// coefficients are summed onto the coarse interface faces.
    pub fn coarse_matrix(&self, level: usize, fine: &LduMatrix) -> Result<LduMatrix, LduError> {
        let lvl = self.level_checked(level)?;
        LduError::check_len("fine matrix cells", lvl.restrict_addressing.len(), fine.n_cells())?;
        LduError::check_len("fine matrix faces", lvl.face_restrict.len(), fine.n_faces())?;
        if fine.interfaces().len() != lvl.interfaces.len() {
            return Err(LduError::InvalidTopology(format!(
                "matrix has {} interfaces but the agglomeration level has {}",
                fine.interfaces().len(),
                lvl.interfaces.len()
            )));
        }

        let n_faces = lvl.addressing.n_faces();
        let mut diag = vec![0.0; lvl.n_coarse_cells()];
        for (&c, &d) in lvl.restrict_addressing.iter().zip(fine.diag()) {
            diag[c] += d;
        }

        let (fine_upper, fine_lower) = (fine.upper(), fine.lower());
        let mut upper = vec![0.0; n_faces];
        let mut lower = vec![0.0; n_faces];
        for (f, fr) in lvl.face_restrict.iter().enumerate() {
            match *fr {
                FaceRestrict::Internal(c) => diag[c] += fine_upper[f] + fine_lower[f],
                FaceRestrict::Face { face, flipped: false } => {
                    upper[face] += fine_upper[f];
                    lower[face] += fine_lower[f];
                }
                FaceRestrict::Face { face, flipped: true } => {
                    upper[face] += fine_lower[f];
                    lower[face] += fine_upper[f];
                }
            }
        }

        let addressing = Arc::clone(&lvl.addressing);
        let mut coarse = if fine.symmetric_storage() {
            LduMatrix::symmetric(addressing, diag, upper)?
        } else {
            LduMatrix::asymmetric(addressing, diag, lower, upper)?
        };
        for (coupling, agg) in fine.interfaces().iter().zip(&lvl.interfaces) {
            coarse = coarse.with_interface(InterfaceCoupling::new(
                Rc::clone(&agg.interface),
                agg.restrict_coeffs(&coupling.internal_coeffs),
                agg.restrict_coeffs(&coupling.boundary_coeffs),
            ))?;
        }
        Ok(coarse.with_comm(Rc::clone(fine.comm())))
    }

    fn level_checked(&self, level: usize) -> Result<&GamgLevel, LduError> {
        self.levels.get(level).ok_or_else(|| {
            LduError::InvalidTopology(format!(
                "agglomeration level {level} requested but only {} exist",
                self.levels.len()
            ))
        })
    }
}

/// Coarse addressing induced by `restrict` and the fate of every fine face.
fn coarse_addressing(
    fine: &LduAddressing,
    restrict: &[usize],
    n_coarse: usize,
) -> Result<(LduAddressing, Vec<FaceRestrict>), LduError> {
    let pairs: Vec<(usize, usize)> = fine
        .owner()
        .iter()
        .zip(fine.neighbour())
        .map(|(&o, &n)| (restrict[o], restrict[n]))
        .collect();

    let mut index: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for &(a, b) in &pairs {
        if a != b {
            index.insert((a.min(b), a.max(b)), 0);
        }
    }
    let mut owner = Vec::with_capacity(index.len());
    let mut neighbour = Vec::with_capacity(index.len());
    for (i, (&(lo, hi), slot)) in index.iter_mut().enumerate() {
        *slot = i;
        owner.push(lo);
        neighbour.push(hi);
    }

    let face_restrict = pairs
        .iter()
        .map(|&(a, b)| {
            if a == b {
                FaceRestrict::Internal(a)
            } else {
                FaceRestrict::Face { face: index[&(a.min(b), a.max(b))], flipped: a > b }
            }
        })
        .collect();
    Ok((LduAddressing::new(n_coarse, owner, neighbour)?, face_restrict))
}

fn restrict_face_values(face_restrict: &[FaceRestrict], fine: &[f64], n_coarse_faces: usize) -> Vec<f64> {
    let mut coarse = vec![0.0; n_coarse_faces];
    for (fr, &v) in face_restrict.iter().zip(fine) {
        if let FaceRestrict::Face { face, .. } = *fr {
            coarse[face] += v;
        }
    }
    coarse
}
