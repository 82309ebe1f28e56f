use serde::{Deserialize, Serialize};

/// Dense simulations × time-points matrix of simulated portfolio values.
///
/// Stored row-major: each path is a contiguous slice, which lets path
/// generation fill rows independently (and in parallel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathMatrix {
    num_paths: usize,
    num_points: usize,
    values: Vec<f64>,
}

impl PathMatrix {
    /// Matrix with every cell set to `value`.
    #[must_use]
    pub fn filled(num_paths: usize, num_points: usize, value: f64) -> Self {
        Self {
            num_paths,
            num_points,
            values: vec![value; num_paths * num_points],
        }
    }

    /// Build from equal-length rows. Returns `None` on ragged input.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let num_points = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != num_points) {
            return None;
        }
        let num_paths = rows.len();
        Some(Self {
            num_paths,
            num_points,
            values: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of time points (steps + 1).
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.num_paths, self.num_points)
    }

    #[must_use]
    pub fn path(&self, index: usize) -> &[f64] {
        let start = index * self.num_points;
        &self.values[start..start + self.num_points]
    }

    pub fn paths(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.num_points.max(1))
    }

    #[must_use]
    pub fn value(&self, path: usize, point: usize) -> f64 {
        self.values[path * self.num_points + point]
    }

    /// All path values at time index `point`.
    #[must_use]
    pub fn column(&self, point: usize) -> Vec<f64> {
        (0..self.num_paths).map(|p| self.value(p, point)).collect()
    }

    /// Values at the last time point, one per path.
    #[must_use]
    pub fn final_values(&self) -> Vec<f64> {
        match self.num_points {
            0 => Vec::new(),
            n => self.column(n - 1),
        }
    }

    #[cfg_attr(feature = "parallel", allow(dead_code))]
    pub(crate) fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, f64> {
        self.values.chunks_exact_mut(self.num_points.max(1))
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn par_rows_mut(&mut self) -> rayon::slice::ChunksExactMut<'_, f64> {
        use rayon::slice::ParallelSliceMut;
        self.values.par_chunks_exact_mut(self.num_points.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_and_accessors() {
        let m = PathMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![1.0, 0.5, 0.25]]).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.path(1), &[1.0, 0.5, 0.25]);
        assert_eq!(m.column(1), vec![2.0, 0.5]);
        assert_eq!(m.final_values(), vec![3.0, 0.25]);
        assert_eq!(m.paths().count(), 2);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(PathMatrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_none());
    }
}
