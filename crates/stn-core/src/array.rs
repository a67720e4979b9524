use crate::element::Element;
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::shape::Shape;

// NdArray — Owned, contiguous n-dimensional array
//
// This is the dense container everything in the layer flows through:
// feature maps, theta matrices, the target grid, source coordinates and the
// integer neighborhood cache. It deliberately owns its data outright (no
// reference counting, no views, no autograd bookkeeping): the layer manages
// its own scratch buffers and gradients are returned as fresh arrays.
//
// Element access goes through the Layout so indexing stays uniform, but the
// hot kernels grab `as_slice`/`as_mut_slice` and compute offsets inline.

/// An owned n-dimensional array of `T` in contiguous row-major storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray<T: Element> {
    data: Vec<T>,
    layout: Layout,
}

impl<T: Element> NdArray<T> {
    /// Allocate an array filled with zeros.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let count = shape.elem_count();
        NdArray {
            data: vec![T::ZERO; count],
            layout: Layout::contiguous(shape),
        }
    }

    /// Allocate an array filled with a constant value.
    pub fn full(shape: impl Into<Shape>, value: T) -> Self {
        let shape = shape.into();
        let count = shape.elem_count();
        NdArray {
            data: vec![value; count],
            layout: Layout::contiguous(shape),
        }
    }

    /// Create an array from a flat vec. The vec length must match the
    /// shape's element count exactly.
    pub fn from_vec(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        let expected = shape.elem_count();
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(NdArray {
            data,
            layout: Layout::contiguous(shape),
        })
    }

    pub fn shape(&self) -> &Shape {
        self.layout.shape()
    }

    pub fn dims(&self) -> &[usize] {
        self.layout.dims()
    }

    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    pub fn elem_count(&self) -> usize {
        self.layout.elem_count()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Flat storage offset for a multi-dimensional index.
    pub fn offset(&self, index: &[usize]) -> Result<usize> {
        self.layout.flat_index(index)
    }

    /// Read a single element.
    pub fn get(&self, index: &[usize]) -> Result<T> {
        Ok(self.data[self.offset(index)?])
    }

    /// Write a single element.
    pub fn set(&mut self, index: &[usize], value: T) -> Result<()> {
        let flat = self.offset(index)?;
        self.data[flat] = value;
        Ok(())
    }

    /// The flat data as a slice (row-major logical order).
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The flat data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: T) {
        for v in self.data.iter_mut() {
            *v = value;
        }
    }

    /// Reinterpret the array under a new shape with the same element count.
    /// Storage is contiguous, so this only swaps the layout.
    pub fn reshape(&mut self, shape: impl Into<Shape>) -> Result<()> {
        let shape = shape.into();
        let dst = shape.elem_count();
        if dst != self.data.len() {
            return Err(Error::ReshapeElementMismatch {
                src: self.data.len(),
                dst,
                dst_shape: shape,
            });
        }
        self.layout = Layout::contiguous(shape);
        Ok(())
    }

    /// Copy the contents out as f64 (for inspection and tests).
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.iter().map(|v| v.to_f64()).collect()
    }
}
