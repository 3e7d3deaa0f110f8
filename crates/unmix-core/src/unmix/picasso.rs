use ndarray::{Array2, Array3, Axis};
use tracing::{debug, info};

use crate::config::UnmixParams;
use crate::error::{Result, UnmixError};
use crate::unmix::metrics::{mutual_information, ssim};
use crate::unmix::UnmixEngine;

/// Pairwise similarity metric driving the coordinate descent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Metric {
    Ssim,
    MutualInfo,
}

impl Metric {
    fn parse(mode: &str) -> Result<Metric> {
        match mode {
            "ssim" => Ok(Metric::Ssim),
            "mi" => Ok(Metric::MutualInfo),
            other => Err(UnmixError::UnsupportedMode(other.to_string())),
        }
    }

    fn eval(&self, a: &Array2<f64>, b: &Array2<f64>, bins: usize) -> f64 {
        match self {
            Metric::Ssim => ssim(a.view(), b.view()),
            Metric::MutualInfo => mutual_information(a.view(), b.view(), bins),
        }
    }
}

/// PICASSO-style iterative unmixing.
///
/// The unmixing matrix starts at identity. Each cycle sweeps every ordered
/// channel pair `(i, j)` and nudges the off-diagonal entry `P[i][j]` by
/// `gamma` (decayed by `beta` per cycle) whenever that lowers the pairwise
/// metric between the currently-unmixed planes `i` and `j`. Off-diagonal
/// entries stay in `[-1, 0]`: unmixing only ever subtracts bleed-through,
/// never adds it. Stops early once a full cycle changes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct PicassoEngine;

impl UnmixEngine for PicassoEngine {
    fn unmix(
        &self,
        image: &Array3<f64>,
        params: &UnmixParams,
    ) -> Result<(Array3<f64>, Array2<f64>)> {
        let (h, w, nch) = image.dim();
        if nch != params.nch {
            return Err(UnmixError::ShapeMismatch(format!(
                "Image has {} channels but params expect {}",
                nch, params.nch
            )));
        }
        if h == 0 || w == 0 || nch == 0 {
            return Err(UnmixError::ShapeMismatch(
                "Cannot unmix an empty region".into(),
            ));
        }
        if params.bins < 2 {
            return Err(UnmixError::Pipeline(format!(
                "bins must be >= 2, got {}",
                params.bins
            )));
        }
        let metric = Metric::parse(&params.mode)?;

        let planes: Vec<Array2<f64>> = (0..nch)
            .map(|ch| image.index_axis(Axis(2), ch).to_owned())
            .collect();

        let mut p = Array2::<f64>::eye(nch);
        let mut unmixed: Vec<Array2<f64>> =
            (0..nch).map(|i| apply_row(&p, &planes, i)).collect();

        for cycle in 0..params.cycles {
            let step = params.gamma / (1.0 + params.beta * cycle as f64);
            let mut changed = false;

            for i in 0..nch {
                for j in 0..nch {
                    if i == j {
                        continue;
                    }

                    let current = metric.eval(&unmixed[i], &unmixed[j], params.bins);
                    let mut best = (current, p[[i, j]], None);

                    for candidate in [p[[i, j]] - step, p[[i, j]] + step] {
                        let candidate = candidate.clamp(-1.0, 0.0);
                        if candidate == p[[i, j]] {
                            continue;
                        }
                        let mut trial_p = p.clone();
                        trial_p[[i, j]] = candidate;
                        let trial = apply_row(&trial_p, &planes, i);
                        let score = metric.eval(&trial, &unmixed[j], params.bins);
                        if score < best.0 {
                            best = (score, candidate, Some(trial));
                        }
                    }

                    if let (_, value, Some(plane)) = best {
                        p[[i, j]] = value;
                        unmixed[i] = plane;
                        changed = true;
                    }
                }
            }

            if !changed {
                debug!(cycle, "Unmixing converged early");
                break;
            }
        }

        info!(nch, cycles = params.cycles, mode = %params.mode, "Unmixing done");

        let mut out = Array3::<f64>::zeros((h, w, nch));
        for (ch, plane) in unmixed.into_iter().enumerate() {
            out.index_axis_mut(Axis(2), ch).assign(&plane);
        }
        Ok((out, p))
    }
}

/// Unmixed plane `i`: the matrix row applied across raw channel planes,
/// clamped at zero.
fn apply_row(p: &Array2<f64>, planes: &[Array2<f64>], i: usize) -> Array2<f64> {
    let mut acc = planes[0].mapv(|v| v * p[[i, 0]]);
    for (j, plane) in planes.iter().enumerate().skip(1) {
        acc.zip_mut_with(plane, |a, &b| *a += p[[i, j]] * b);
    }
    acc.mapv_inplace(|v| v.max(0.0));
    acc
}
