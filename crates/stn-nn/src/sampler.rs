use stn_core::FloatElement;

// Bilinear sampler — forward and backward kernels for a single sample
//
// Forward: every output pixel (h, w) carries a continuous source location
// (x, y). Its 2x2 source neighborhood starts at
//
//   w_min = max(0, floor(x))        h_min = max(0, floor(y))
//   w_max = min(W-1, ceil(x))       h_max = min(H-1, ceil(y))
//
// and the output value is the bilinear average over the four logical
// corners ww in {w_min, w_min+1}, hh in {h_min, h_min+1}:
//
//   out = sum T(hh, ww) * (1 - |x - ww|) * (1 - |y - hh|)
//
// If the clamped range is empty (w_max < w_min or h_max < h_min) the sample
// is out of range: the output stays at its pre-initialized zero, the
// neighborhood cache records the sentinel, and no input pixel is read.
//
// When w_min+1 or h_min+1 would index one past the array, the memory read
// is clamped to the last valid index while the weight keeps the logical
// corner position (replicate-border). Coordinates in the open bands
// (-1, 0) and (dim-1, dim) still have a valid clamped neighborhood and are
// not special-cased further, so weights outside [0, 1] can occur there.
//
// Backward: the forward weights are piecewise-smooth in (x, y) with kinks
// at integer grid lines. Gradients w.r.t. the source pixels reuse the
// forward weights; gradients w.r.t. the coordinates use the signum
// sub-gradient of the |.| terms, with sign(0) fixed to +1 for determinism.
// Forward and backward are exact adjoints of each other by construction.

/// Sentinel stored in the neighborhood cache for out-of-range pixels.
pub const OUT_OF_RANGE: i32 = -1;

/// Signum sub-gradient convention: sign(0) = +1.
#[inline]
fn subgrad_sign<T: FloatElement>(v: T) -> T {
    if v < T::zero() {
        -T::one()
    } else {
        T::one()
    }
}

/// Resolve the 2x2 neighborhood origin for a source location, or `None`
/// when the clamped range is empty.
#[inline]
fn neighborhood(x: f64, y: f64, height: usize, width: usize) -> Option<(usize, usize)> {
    let w_min = x.floor().max(0.0);
    let w_max = x.ceil().min((width - 1) as f64);
    let h_min = y.floor().max(0.0);
    let h_max = y.ceil().min((height - 1) as f64);
    if w_max < w_min || h_max < h_min {
        None
    } else {
        Some((w_min as usize, h_min as usize))
    }
}

/// Forward bilinear sampling for one sample.
///
/// - `input`: the sample's feature planes, `C*H*W`
/// - `coords`: the sample's source coordinates, `2*H*W` (x plane, y plane)
/// - `output`: `C*H*W`, must be zero-filled by the caller (out-of-range
///   pixels are never written)
/// - `corners`: `H*W*2` neighborhood cache, must be reset to
///   [`OUT_OF_RANGE`] by the caller before every forward pass
pub fn forward_sample<T: FloatElement>(
    input: &[T],
    coords: &[T],
    channels: usize,
    height: usize,
    width: usize,
    output: &mut [T],
    corners: &mut [i32],
) {
    let map_size = height * width;
    for h in 0..height {
        for w in 0..width {
            let idx = h * width + w;
            let x = coords[idx];
            let y = coords[map_size + idx];

            let (w_min, h_min) = match neighborhood(x.to_f64(), y.to_f64(), height, width) {
                Some(origin) => origin,
                None => continue,
            };
            corners[idx * 2] = w_min as i32;
            corners[idx * 2 + 1] = h_min as i32;

            for c in 0..channels {
                let plane = &input[c * map_size..(c + 1) * map_size];
                let mut acc = T::zero();
                for dh in 0..2usize {
                    let hh = h_min + dh;
                    let wy = T::one() - (y - T::from_f64(hh as f64)).abs();
                    let hh_read = hh.min(height - 1);
                    for dw in 0..2usize {
                        let ww = w_min + dw;
                        let wx = T::one() - (x - T::from_f64(ww as f64)).abs();
                        let ww_read = ww.min(width - 1);
                        acc = acc + plane[hh_read * width + ww_read] * wx * wy;
                    }
                }
                output[c * map_size + idx] = acc;
            }
        }
    }
}

/// Backward bilinear sampling for one sample.
///
/// Redistributes `output_grad` into the 2x2 source-pixel gradients
/// (`input_grad`, accumulated; caller zero-fills once per backward call)
/// and into per-pixel coordinate gradients (`coord_grad`, `2*H*W`,
/// overwritten in full, including exact zeros for out-of-range pixels).
///
/// `input` and `coords` must come from the paired forward call; `corners`
/// is the cache that forward pass populated.
#[allow(clippy::too_many_arguments)]
pub fn backward_sample<T: FloatElement>(
    input: &[T],
    coords: &[T],
    corners: &[i32],
    output_grad: &[T],
    channels: usize,
    height: usize,
    width: usize,
    input_grad: &mut [T],
    coord_grad: &mut [T],
) {
    let map_size = height * width;
    // Chain rule through the de-normalization in the grid generator.
    let width_const = T::from_f64((width - 1) as f64 / 2.0);
    let height_const = T::from_f64((height - 1) as f64 / 2.0);

    for h in 0..height {
        for w in 0..width {
            let idx = h * width + w;
            if corners[idx * 2] == OUT_OF_RANGE {
                // Forward produced zero here; so does every gradient.
                coord_grad[idx] = T::zero();
                coord_grad[map_size + idx] = T::zero();
                continue;
            }
            let w_min = corners[idx * 2] as usize;
            let h_min = corners[idx * 2 + 1] as usize;
            let x = coords[idx];
            let y = coords[map_size + idx];

            let mut tmp_x = T::zero();
            let mut tmp_y = T::zero();

            for c in 0..channels {
                let g = output_grad[c * map_size + idx];
                let plane = &input[c * map_size..(c + 1) * map_size];
                let grad_plane = &mut input_grad[c * map_size..(c + 1) * map_size];
                for dh in 0..2usize {
                    let hh = h_min + dh;
                    let wy = T::one() - (y - T::from_f64(hh as f64)).abs();
                    let sign_y = subgrad_sign(T::from_f64(hh as f64) - y);
                    let hh_read = hh.min(height - 1);
                    for dw in 0..2usize {
                        let ww = w_min + dw;
                        let wx = T::one() - (x - T::from_f64(ww as f64)).abs();
                        let sign_x = subgrad_sign(T::from_f64(ww as f64) - x);
                        let ww_read = ww.min(width - 1);

                        let flat = hh_read * width + ww_read;
                        grad_plane[flat] = grad_plane[flat] + g * wx * wy;

                        let buffer = g * plane[flat];
                        tmp_x = tmp_x + buffer * wy * sign_x;
                        tmp_y = tmp_y + buffer * wx * sign_y;
                    }
                }
            }
            coord_grad[idx] = tmp_x * width_const;
            coord_grad[map_size + idx] = tmp_y * height_const;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x2x2 fixture [[1,2],[3,4]] used across the sampler tests.
    const MAP: [f64; 4] = [1.0, 2.0, 3.0, 4.0];

    fn run_forward(coords: &[f64]) -> (Vec<f64>, Vec<i32>) {
        let mut output = vec![0.0; 4];
        let mut corners = vec![OUT_OF_RANGE; 8];
        forward_sample(&MAP, coords, 1, 2, 2, &mut output, &mut corners);
        (output, corners)
    }

    #[test]
    fn test_integer_coords_reproduce_input() {
        // identity coords: x = [0,1,0,1], y = [0,0,1,1]
        let coords = [0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        let (output, corners) = run_forward(&coords);
        assert_eq!(output, MAP.to_vec());
        assert!(corners.iter().all(|&c| c != OUT_OF_RANGE));
    }

    #[test]
    fn test_center_sample_averages_all_corners() {
        let coords = [0.5; 8];
        let (output, _) = run_forward(&coords);
        for v in output {
            assert!((v - 2.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_out_of_range_pixel_is_zero_and_sentinel() {
        // first pixel far outside, rest at the center
        let mut coords = [0.5; 8];
        coords[0] = -3.0;
        let (output, corners) = run_forward(&coords);
        assert_eq!(output[0], 0.0);
        assert_eq!(corners[0], OUT_OF_RANGE);
        assert!((output[1] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_replicate_border_on_last_index() {
        // x slightly past the last column: neighborhood stays valid,
        // the +1 corner read clamps onto column W-1
        let coords = [1.5, 0.5, 0.5, 0.5, 0.0, 0.5, 0.5, 0.5];
        let (output, corners) = run_forward(&coords);
        // x = 1.5, y = 0: row 0, columns {1, clamp(2)} both read value 2
        assert!((output[0] - 2.0).abs() < 1e-12);
        assert_eq!(corners[0], 1);
    }

    #[test]
    fn test_backward_weights_sum_to_one_per_valid_pixel() {
        let coords = [0.25, 0.75, 0.25, 0.75, 0.25, 0.25, 0.75, 0.75];
        let (_, corners) = run_forward(&coords);
        let output_grad = [1.0; 4];
        let mut input_grad = vec![0.0; 4];
        let mut coord_grad = vec![0.0; 8];
        backward_sample(
            &MAP,
            &coords,
            &corners,
            &output_grad,
            1,
            2,
            2,
            &mut input_grad,
            &mut coord_grad,
        );
        // each of the 4 output pixels distributes a unit of gradient
        let total: f64 = input_grad.iter().sum();
        assert!((total - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_backward_out_of_range_contributes_nothing() {
        let coords = [-3.0; 8];
        let (_, corners) = run_forward(&coords);
        let output_grad = [1.0; 4];
        let mut input_grad = vec![0.0; 4];
        let mut coord_grad = vec![7.0; 8]; // stale garbage must be overwritten
        backward_sample(
            &MAP,
            &coords,
            &corners,
            &output_grad,
            1,
            2,
            2,
            &mut input_grad,
            &mut coord_grad,
        );
        assert!(input_grad.iter().all(|&v| v == 0.0));
        assert!(coord_grad.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sign_zero_is_positive() {
        assert_eq!(subgrad_sign(0.0f64), 1.0);
        assert_eq!(subgrad_sign(-0.5f64), -1.0);
        assert_eq!(subgrad_sign(0.5f64), 1.0);
    }

    #[test]
    fn test_coordinate_gradient_matches_manual_derivative() {
        // single interior sample at (x, y) = (0.25, 0.5) on the 2x2 map:
        // out(x, y) = sum T(hh,ww) (1-|x-ww|)(1-|y-hh|)
        // d out/dx = (1-y) (T01 - T00) + y (T11 - T10) = 0.5*1 + 0.5*1 = 1
        // d out/dy = (1-x) (T10 - T00) + x (T11 - T01) = 0.75*2 + 0.25*2 = 2
        let coords = [0.25, -9.0, -9.0, -9.0, 0.5, -9.0, -9.0, -9.0];
        let (_, corners) = run_forward(&coords);
        let output_grad = [1.0, 0.0, 0.0, 0.0];
        let mut input_grad = vec![0.0; 4];
        let mut coord_grad = vec![0.0; 8];
        backward_sample(
            &MAP,
            &coords,
            &corners,
            &output_grad,
            1,
            2,
            2,
            &mut input_grad,
            &mut coord_grad,
        );
        // coord_grad carries the (dim-1)/2 rescale: here (2-1)/2 = 0.5
        assert!((coord_grad[0] - 1.0 * 0.5).abs() < 1e-12);
        assert!((coord_grad[4] - 2.0 * 0.5).abs() < 1e-12);
    }
}
