use std::fmt;

// Shape — N-dimensional shape representation
//
// A Shape describes the size of each dimension of an array. For the
// spatial transformer the shapes that matter are:
//   - FeatureMap:          [N, C, H, W]
//   - Theta:               [N, 6]
//   - TargetGrid:          [1, 3, H, W]
//   - SourceCoords:        [N, 2, H, W]
//   - NeighborhoodCache:   [N, H, W, 2]
//
// The shape determines the element count (product of dims) and the default
// row-major strides for memory layout.

/// N-dimensional shape of an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from a vector of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions (0 for scalar, 1 for vector, 2 for matrix, etc.).
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (product of all dimensions).
    /// A scalar shape [] has 1 element.
    pub fn elem_count(&self) -> usize {
        self.0.iter().product::<usize>().max(1)
    }

    /// Compute the contiguous (row-major / C-order) strides for this shape.
    ///
    /// For shape [2, 3, 4], strides are [12, 4, 1]: moving one step in dim 0
    /// jumps 12 elements, in dim 1 jumps 4, in dim 2 jumps 1.
    pub fn stride_contiguous(&self) -> Vec<usize> {
        let mut strides = vec![0usize; self.rank()];
        if self.rank() > 0 {
            strides[self.rank() - 1] = 1;
            for i in (0..self.rank() - 1).rev() {
                strides[i] = strides[i + 1] * self.0[i + 1];
            }
        }
        strides
    }

    /// Size of a specific dimension.
    pub fn dim(&self, d: usize) -> crate::Result<usize> {
        self.0.get(d).copied().ok_or(crate::Error::DimOutOfRange {
            dim: d,
            rank: self.rank(),
        })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

// Convenient From implementations, so call sites can write
// Shape::from((2, 3, 4, 4)) instead of Shape::new(vec![2, 3, 4, 4]).

impl From<usize> for Shape {
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((d0, d1): (usize, usize)) -> Self {
        Shape(vec![d0, d1])
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((d0, d1, d2): (usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2])
    }
}

impl From<(usize, usize, usize, usize)> for Shape {
    fn from((d0, d1, d2, d3): (usize, usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2, d3])
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_map_shape() {
        let s = Shape::from((2, 3, 4, 5));
        assert_eq!(s.rank(), 4);
        assert_eq!(s.elem_count(), 120);
        assert_eq!(s.stride_contiguous(), vec![60, 20, 5, 1]);
    }

    #[test]
    fn test_theta_shape() {
        let s = Shape::from((8, 6));
        assert_eq!(s.rank(), 2);
        assert_eq!(s.elem_count(), 48);
        assert_eq!(s.stride_contiguous(), vec![6, 1]);
    }

    #[test]
    fn test_dim_accessor() {
        let s = Shape::from((2, 3, 4, 5));
        assert_eq!(s.dim(2).unwrap(), 4);
        assert!(s.dim(4).is_err());
    }

    #[test]
    fn test_display() {
        let s = Shape::from((3, 4));
        assert_eq!(format!("{}", s), "[3, 4]");
    }
}
