use crate::element::FloatElement;
use crate::error::{Error, Result};

// linalg — the one gemm everything reuses, plus elementwise slice helpers
//
// Both linear-algebra steps of the spatial transformer are instances of the
// same general matrix multiply:
//
//   grid generation:      source[n]     = theta[n] (2x3) @ grid   (3xHW)
//   parameter reduction:  theta_grad[n] = coord_grad[n] (2xHW) @ grid^T (HWx3)
//
// so there is exactly one routine here, row-major, with optional
// transposition of either operand and BLAS-style alpha/beta factors:
//
//   C = alpha * op(A) @ op(B) + beta * C
//
// beta == 0 overwrites C without reading it (BLAS convention, so C may be
// uninitialized garbage on entry).

/// Whether a gemm operand is used as stored or transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    No,
    Yes,
}

/// General matrix multiply: `C (m x n) = alpha * op(A) @ op(B) + beta * C`.
///
/// `A` holds `m x k` values (`k x m` when `trans_a` is `Yes`), `B` holds
/// `k x n` values (`n x k` when `trans_b` is `Yes`), all row-major and
/// contiguous. Slice lengths are validated up front.
pub fn gemm<T: FloatElement>(
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    a: &[T],
    b: &[T],
    beta: T,
    c: &mut [T],
) -> Result<()> {
    if a.len() != m * k {
        return Err(Error::MatmulShapeMismatch {
            m,
            k1: a.len() / m.max(1),
            k2: k,
            n,
        });
    }
    if b.len() != k * n {
        return Err(Error::MatmulShapeMismatch {
            m,
            k1: k,
            k2: b.len() / n.max(1),
            n,
        });
    }
    if c.len() != m * n {
        return Err(Error::msg(format!(
            "gemm output slice has {} elements, expected {}x{}",
            c.len(),
            m,
            n
        )));
    }

    for i in 0..m {
        for j in 0..n {
            let mut acc = T::zero();
            for p in 0..k {
                // Row-major index of op(A)[i, p] and op(B)[p, j].
                let av = match trans_a {
                    Transpose::No => a[i * k + p],
                    Transpose::Yes => a[p * m + i],
                };
                let bv = match trans_b {
                    Transpose::No => b[p * n + j],
                    Transpose::Yes => b[j * k + p],
                };
                acc = acc + av * bv;
            }
            let out = &mut c[i * n + j];
            *out = if beta == T::zero() {
                alpha * acc
            } else {
                alpha * acc + beta * *out
            };
        }
    }
    Ok(())
}

/// Overwrite every element of `dst` with `value`.
pub fn fill<T: Copy>(dst: &mut [T], value: T) {
    for v in dst.iter_mut() {
        *v = value;
    }
}

/// Add a scalar to every element of `dst` in place.
pub fn add_scalar<T: FloatElement>(dst: &mut [T], value: T) {
    for v in dst.iter_mut() {
        *v = *v + value;
    }
}

/// Scale every element of `dst` by a scalar in place.
pub fn scale<T: FloatElement>(dst: &mut [T], value: T) {
    for v in dst.iter_mut() {
        *v = *v * value;
    }
}
