//! One pairwise agglomeration pass.

use crate::matrix::LduAddressing;

const UNSET: usize = usize::MAX;

/// Merge every cell with its most strongly coupled unmerged neighbour.
///
/// Cells are visited in ascending order when `forward`, descending
/// otherwise. Coincident faces between the same two cells add their weights.
/// Equal weights go to the lowest neighbour index. A cell without unmerged
/// neighbours becomes a coarse cell of its own.
///
/// Returns the fine-to-coarse map and the number of coarse cells. Coarse cells
/// are numbered in the order of the fine cells that seeded them, so a backward
/// pass numbers them in reverse and the map is flipped afterwards.
pub(crate) fn pair_cells(addr: &LduAddressing, face_weights: &[f64], forward: bool) -> (Vec<usize>, usize) {
    let n = addr.n_cells();
    let mut map = vec![UNSET; n];
    let mut n_coarse = 0;
    let mut candidates: Vec<(usize, f64)> = Vec::new();

    for i in 0..n {
        let cell = if forward { i } else { n - 1 - i };
        if map[cell] != UNSET {
            continue;
        }

        candidates.clear();
        for &(f, other) in addr.cell_faces(cell) {
            if map[other] != UNSET {
                continue;
            }
            match candidates.iter_mut().find(|(c, _)| *c == other) {
                Some((_, w)) => *w += face_weights[f],
                None => candidates.push((other, face_weights[f])),
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for &(other, w) in &candidates {
            best = match best {
                Some((bo, bw)) if bw > w || (bw == w && bo < other) => Some((bo, bw)),
                _ => Some((other, w)),
            };
        }

        map[cell] = n_coarse;
        if let Some((other, _)) = best {
            map[other] = n_coarse;
        }
        n_coarse += 1;
    }

    if !forward {
        for m in map.iter_mut() {
            *m = n_coarse - 1 - *m;
        }
    }
    (map, n_coarse)
}
