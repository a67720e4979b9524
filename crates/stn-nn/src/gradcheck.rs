use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use stn_core::{NdArray, Result};

use crate::spatial_transformer::SpatialTransformer;

// GradientChecker — numeric validation of the analytic backward pass
//
// The classic layer-testing recipe: pick a fixed random probe direction p,
// define the scalar loss L = sum(p * forward(input, theta)), get analytic
// gradients from backward(input, p), then compare against forward
// differences (L(x + eps*e_i) - L(x)) / eps for every element of both
// bottom blobs. Agreement is measured with the relative difference
//
//   reldiff(a, n) = sum|a - n| / sum|a|
//
// which tolerates the scale of the problem instead of a fixed absolute
// cutoff. Checks run in f64; the sampler is only piecewise-smooth, so
// callers should pick a theta whose sampling coordinates stay away from
// integer grid lines (the kinks of the |.| terms).

/// Finite-difference gradient checker for the spatial transformer.
#[derive(Debug, Clone)]
pub struct GradientChecker {
    /// Perturbation step for the forward differences.
    pub eps: f64,
    /// Maximum accepted relative difference.
    pub tolerance: f64,
    /// Seed for the random probe direction.
    pub seed: u64,
}

impl Default for GradientChecker {
    fn default() -> Self {
        GradientChecker {
            eps: 1e-3,
            tolerance: 1e-3,
            seed: 1701,
        }
    }
}

impl GradientChecker {
    /// Check both the input-map gradient and the theta gradient of `layer`
    /// at the point `(input, theta)`. The layer must already be configured
    /// for these shapes. Returns `Err` with a descriptive message on the
    /// first blob whose relative difference exceeds the tolerance.
    pub fn check(
        &self,
        layer: &mut SpatialTransformer<f64>,
        input: &NdArray<f64>,
        theta: &NdArray<f64>,
    ) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let output = layer.forward(input, theta)?;

        // Probe direction: standard normal, shifted so the loss does not
        // sit at an accidental stationary point.
        let probe_data: Vec<f64> = (0..output.elem_count())
            .map(|_| rng.sample::<f64, _>(StandardNormal) + 0.1)
            .collect();
        let probe = NdArray::from_vec(probe_data, output.shape().clone())?;

        let base_loss = dot(output.as_slice(), probe.as_slice());
        let (input_grad, theta_grad) = layer.backward(input, &probe)?;

        let numeric_input = self.numeric_gradient(layer, input, theta, &probe, base_loss, true)?;
        check_blob("input", input_grad.as_slice(), &numeric_input, self.tolerance)?;

        let numeric_theta = self.numeric_gradient(layer, input, theta, &probe, base_loss, false)?;
        check_blob("theta", theta_grad.as_slice(), &numeric_theta, self.tolerance)?;
        Ok(())
    }

    /// Forward-difference gradient of the probe loss w.r.t. one blob.
    fn numeric_gradient(
        &self,
        layer: &mut SpatialTransformer<f64>,
        input: &NdArray<f64>,
        theta: &NdArray<f64>,
        probe: &NdArray<f64>,
        base_loss: f64,
        wrt_input: bool,
    ) -> Result<Vec<f64>> {
        let count = if wrt_input {
            input.elem_count()
        } else {
            theta.elem_count()
        };
        let mut grad = Vec::with_capacity(count);
        for i in 0..count {
            let mut input_p = input.clone();
            let mut theta_p = theta.clone();
            if wrt_input {
                input_p.as_mut_slice()[i] += self.eps;
            } else {
                theta_p.as_mut_slice()[i] += self.eps;
            }
            let output = layer.forward(&input_p, &theta_p)?;
            let loss = dot(output.as_slice(), probe.as_slice());
            grad.push((loss - base_loss) / self.eps);
        }
        Ok(grad)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn check_blob(name: &str, analytic: &[f64], numeric: &[f64], tolerance: f64) -> Result<()> {
    let diff: f64 = analytic
        .iter()
        .zip(numeric.iter())
        .map(|(a, n)| (a - n).abs())
        .sum();
    let norm: f64 = analytic.iter().map(|a| a.abs()).sum();
    let rel = if diff == 0.0 { 0.0 } else { diff / norm };
    if rel > tolerance {
        stn_core::bail!(
            "gradient check failed for {}: relative difference {:.3e} > {:.3e}",
            name,
            rel,
            tolerance
        );
    }
    Ok(())
}
