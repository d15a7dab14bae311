//! Face-based owner/neighbour addressing shared by every matrix on a mesh level.

use crate::error::LduError;

/// Immutable LDU topology: face `f` couples cells `owner[f]` and `neighbour[f]`.
///
/// `owner[f] < neighbour[f]` is not required. Coincident faces (several faces
/// between the same pair of cells) are allowed and kept separate.
#[derive(Debug, Clone, PartialEq)]
pub struct LduAddressing {
    n_cells: usize,
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    cell_faces_start: Vec<usize>,
    cell_faces: Vec<(usize, usize)>,
    triangular_order: Vec<usize>,
    losort_order: Vec<usize>,
}

impl LduAddressing {
    pub fn new(n_cells: usize, owner: Vec<usize>, neighbour: Vec<usize>) -> Result<Self, LduError> {
        if owner.len() != neighbour.len() {
            return Err(LduError::InvalidTopology(format!(
                "owner has {} faces but neighbour has {}",
                owner.len(),
                neighbour.len()
            )));
        }
        for (f, (&o, &n)) in owner.iter().zip(&neighbour).enumerate() {
            if o >= n_cells || n >= n_cells {
                return Err(LduError::InvalidTopology(format!(
                    "face {f} references cells ({o}, {n}) outside [0, {n_cells})"
                )));
            }
            if o == n {
                return Err(LduError::InvalidTopology(format!(
                    "face {f} is a self-loop on cell {o}"
                )));
            }
        }

        // Counting sort of the face list into per-cell adjacency, ascending face order.
        let mut cell_faces_start = vec![0usize; n_cells + 1];
        for (&o, &n) in owner.iter().zip(&neighbour) {
            cell_faces_start[o + 1] += 1;
            cell_faces_start[n + 1] += 1;
        }
        for c in 0..n_cells {
            cell_faces_start[c + 1] += cell_faces_start[c];
        }
        let mut fill = cell_faces_start.clone();
        let mut cell_faces = vec![(0usize, 0usize); 2 * owner.len()];
        for (f, (&o, &n)) in owner.iter().zip(&neighbour).enumerate() {
            cell_faces[fill[o]] = (f, n);
            fill[o] += 1;
            cell_faces[fill[n]] = (f, o);
            fill[n] += 1;
        }

        let mut triangular_order: Vec<usize> = (0..owner.len()).collect();
        triangular_order.sort_by_key(|&f| (owner[f].min(neighbour[f]), owner[f].max(neighbour[f]), f));
        let mut losort_order: Vec<usize> = (0..owner.len()).collect();
        losort_order.sort_by_key(|&f| (owner[f].max(neighbour[f]), f));

        Ok(Self {
            n_cells,
            owner,
            neighbour,
            cell_faces_start,
            cell_faces,
            triangular_order,
            losort_order,
        })
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn n_faces(&self) -> usize {
        self.owner.len()
    }

    pub fn owner(&self) -> &[usize] {
        &self.owner
    }

    pub fn neighbour(&self) -> &[usize] {
        &self.neighbour
    }

    /// Faces of `cell` as `(face, other cell)` in ascending face order.
    pub fn cell_faces(&self, cell: usize) -> &[(usize, usize)] {
        &self.cell_faces[self.cell_faces_start[cell]..self.cell_faces_start[cell + 1]]
    }

    /// Start offsets into the flattened adjacency, length `n_cells + 1`.
    pub(crate) fn cell_faces_start(&self) -> &[usize] {
        &self.cell_faces_start
    }

    pub(crate) fn all_cell_faces(&self) -> &[(usize, usize)] {
        &self.cell_faces
    }

    /// Faces ordered by (lower cell, higher cell, face). Forward elimination
    /// order for incomplete factorisations.
    pub fn triangular_order(&self) -> &[usize] {
        &self.triangular_order
    }

    /// Faces ordered by (higher cell, face).
    pub fn losort_order(&self) -> &[usize] {
        &self.losort_order
    }

    /// Lower- and higher-numbered cell of face `f`.
    #[inline]
    pub fn lo_hi(&self, f: usize) -> (usize, usize) {
        let (o, n) = (self.owner[f], self.neighbour[f]);
        if o < n { (o, n) } else { (n, o) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_self_loop() {
        let err = LduAddressing::new(3, vec![0, 1], vec![1, 1]).unwrap_err();
        assert!(matches!(err, LduError::InvalidTopology(_)));
    }

    #[test]
    fn rejects_out_of_range() {
        let err = LduAddressing::new(2, vec![0], vec![2]).unwrap_err();
        assert!(matches!(err, LduError::InvalidTopology(_)));
        let err = LduAddressing::new(2, vec![0, 1], vec![1]).unwrap_err();
        assert!(matches!(err, LduError::InvalidTopology(_)));
    }

    #[test]
    fn adjacency_and_orders() {
        // faces: 0:(2,0) 1:(0,1) 2:(1,2)
        let a = LduAddressing::new(3, vec![2, 0, 1], vec![0, 1, 2]).unwrap();
        assert_eq!(a.n_cells(), 3);
        assert_eq!(a.n_faces(), 3);
        assert_eq!(a.cell_faces(0), &[(0, 2), (1, 1)]);
        assert_eq!(a.cell_faces(1), &[(1, 0), (2, 2)]);
        assert_eq!(a.cell_faces(2), &[(0, 0), (2, 1)]);
        // (0,1)=f1, (0,2)=f0, (1,2)=f2
        assert_eq!(a.triangular_order(), &[1, 0, 2]);
        // hi: f0->2, f1->1, f2->2
        assert_eq!(a.losort_order(), &[1, 0, 2]);
        assert_eq!(a.lo_hi(0), (0, 2));
    }

    #[test]
    fn coincident_faces_are_kept() {
        let a = LduAddressing::new(2, vec![0, 1], vec![1, 0]).unwrap();
        assert_eq!(a.n_faces(), 2);
        assert_eq!(a.cell_faces(0).len(), 2);
    }
}
