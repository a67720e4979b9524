//! # stn-core
//!
//! Dense array primitives consumed by the spatial transformer layer.
//!
//! This crate provides:
//! - [`Shape`] / [`Layout`] — shape, strides, and memory layout
//! - [`NdArray`] — owned, contiguous n-dimensional array
//! - [`Element`] / [`FloatElement`] — element-type traits (f32, f64, f16, i32)
//! - [`gemm`] — general matrix multiply with transposed operands and
//!   alpha/beta scale-accumulate factors
//! - elementwise slice helpers ([`fill`], [`add_scalar`], [`scale`])
//!
//! Everything here is single-threaded reference code: the layer crate builds
//! its forward and backward kernels on top of these primitives, and any
//! accelerated execution strategy must reproduce their semantics exactly.

pub mod array;
pub mod element;
pub mod error;
pub mod layout;
pub mod linalg;
pub mod shape;

pub use array::NdArray;
pub use element::{Element, FloatElement};
pub use error::{Error, Result};
pub use layout::Layout;
pub use linalg::{add_scalar, fill, gemm, scale, Transpose};
pub use shape::Shape;
