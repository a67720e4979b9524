use crate::error::{Error, Result};
use crate::shape::Shape;

// Layout — Memory layout of an array (shape + strides + offset)
//
// The Layout decouples the logical shape of an array from how its data is
// arranged in flat storage. The sampler kernels index four-dimensional
// buffers (feature maps, coordinate grids, the neighborhood cache) and every
// one of those accesses reduces to the single formula
//
//   flat_index = offset + sum(index[i] * stride[i])
//
// All arrays in this workspace are contiguous row-major; the strides are
// kept explicit anyway so that offset computation stays uniform and a future
// view-taking operation does not force a redesign.

/// Layout describes how an array's logical shape maps to flat storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    shape: Shape,
    strides: Vec<usize>,
    /// Offset into the storage buffer where this array's data starts.
    offset: usize,
}

impl Layout {
    /// Create a new contiguous layout for the given shape.
    /// Strides are computed as row-major (C-order).
    pub fn contiguous(shape: Shape) -> Self {
        let strides = shape.stride_contiguous();
        Layout {
            shape,
            strides,
            offset: 0,
        }
    }

    /// Create a layout with explicit strides and offset.
    pub fn new(shape: Shape, strides: Vec<usize>, offset: usize) -> Self {
        Layout {
            shape,
            strides,
            offset,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn elem_count(&self) -> usize {
        self.shape.elem_count()
    }

    /// Check if this layout is contiguous (row-major, no gaps).
    pub fn is_contiguous(&self) -> bool {
        self.offset == 0 && self.strides == self.shape.stride_contiguous()
    }

    /// Compute the flat index into storage for a multi-dimensional index.
    ///
    /// Errors if the index has the wrong rank or any component is out of
    /// range for its dimension.
    pub fn flat_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.rank() {
            return Err(Error::RankMismatch {
                expected: self.rank(),
                got: index.len(),
            });
        }
        let mut flat = self.offset;
        for (i, &idx) in index.iter().enumerate() {
            if idx >= self.shape.dims()[i] {
                return Err(Error::DimOutOfRange {
                    dim: i,
                    rank: self.rank(),
                });
            }
            flat += idx * self.strides[i];
        }
        Ok(flat)
    }
}
