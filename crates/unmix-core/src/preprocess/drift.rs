use ndarray::{Array2, Array3, ArrayView2, Axis};
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::FftPlanner;
use tracing::debug;

use crate::consts::EPSILON;
use crate::error::{Result, UnmixError};

/// Per-channel translation offset, in (dy, dx) pixel units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriftOffset {
    pub dy: f64,
    pub dx: f64,
}

/// Align every channel plane to channel 0 by FFT phase correlation.
///
/// Channel 0 is returned untouched; the others are resampled bilinearly by
/// their estimated offsets. Shape and channel count are preserved.
pub fn correct_drift(image: &Array3<f64>) -> Result<Array3<f64>> {
    let (h, w, nch) = image.dim();
    if h == 0 || w == 0 || nch == 0 {
        return Err(UnmixError::ShapeMismatch(
            "Cannot drift-correct an empty region".into(),
        ));
    }

    let reference = image.index_axis(Axis(2), 0);

    let corrected: Vec<Array2<f64>> = (1..nch)
        .into_par_iter()
        .map(|ch| {
            let plane = image.index_axis(Axis(2), ch);
            let offset = compute_offset(&reference, &plane)?;
            debug!(channel = ch, dy = offset.dy, dx = offset.dx, "Channel drift");
            Ok(shift_plane(&plane, &offset))
        })
        .collect::<Result<_>>()?;

    let mut out = Array3::<f64>::zeros((h, w, nch));
    out.index_axis_mut(Axis(2), 0).assign(&reference);
    for (i, plane) in corrected.into_iter().enumerate() {
        out.index_axis_mut(Axis(2), i + 1).assign(&plane);
    }
    Ok(out)
}

/// Estimate the translation between two equally-sized planes from the peak
/// of their normalized cross-power spectrum.
pub fn compute_offset(
    reference: &ArrayView2<'_, f64>,
    target: &ArrayView2<'_, f64>,
) -> Result<DriftOffset> {
    let (h, w) = reference.dim();
    if target.dim() != (h, w) {
        return Err(UnmixError::ShapeMismatch(format!(
            "Plane size mismatch: {}x{} vs {}x{}",
            w,
            h,
            target.ncols(),
            target.nrows()
        )));
    }

    // Hann window against spectral leakage
    let ref_fft = fft2d(&apply_hann(reference));
    let tgt_fft = fft2d(&apply_hann(target));

    let cross_power = normalized_cross_power(&ref_fft, &tgt_fft);
    let correlation = ifft2d(&cross_power);

    let (peak_row, peak_col) = find_peak(&correlation);

    // Wrap-around: peaks past the midpoint are negative shifts
    let dy = signed_shift(peak_row, h) + parabola_refine_row(&correlation, peak_row, peak_col);
    let dx = signed_shift(peak_col, w) + parabola_refine_col(&correlation, peak_row, peak_col);

    Ok(DriftOffset { dy, dx })
}

/// Resample a plane shifted by `offset`, sampling out-of-range pixels as 0.
pub fn shift_plane(plane: &ArrayView2<'_, f64>, offset: &DriftOffset) -> Array2<f64> {
    let (h, w) = plane.dim();
    let mut result = Array2::<f64>::zeros((h, w));

    for row in 0..h {
        for col in 0..w {
            let src_y = row as f64 - offset.dy;
            let src_x = col as f64 - offset.dx;
            result[[row, col]] = bilinear_sample(plane, src_y, src_x);
        }
    }

    result
}

fn signed_shift(peak: usize, extent: usize) -> f64 {
    if peak > extent / 2 {
        peak as f64 - extent as f64
    } else {
        peak as f64
    }
}

fn apply_hann(data: &ArrayView2<'_, f64>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut result = Array2::<f64>::zeros((h, w));

    for row in 0..h {
        let wy = 0.5 * (1.0 - (std::f64::consts::TAU * row as f64 / h as f64).cos());
        for col in 0..w {
            let wx = 0.5 * (1.0 - (std::f64::consts::TAU * col as f64 / w as f64).cos());
            result[[row, col]] = data[[row, col]] * wy * wx;
        }
    }

    result
}

/// 2D FFT: row-wise, then column-wise.
fn fft2d(data: &Array2<f64>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v, 0.0));

    for row in 0..h {
        let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| result[[row, c]]).collect();
        fft_row.process(&mut row_data);
        for col in 0..w {
            result[[row, col]] = row_data[col];
        }
    }

    for col in 0..w {
        let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| result[[r, col]]).collect();
        fft_col.process(&mut col_data);
        for row in 0..h {
            result[[row, col]] = col_data[row];
        }
    }

    result
}

fn ifft2d(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();

    for col in 0..w {
        let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| work[[r, col]]).collect();
        ifft_col.process(&mut col_data);
        for row in 0..h {
            work[[row, col]] = col_data[row];
        }
    }

    for row in 0..h {
        let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| work[[row, c]]).collect();
        ifft_row.process(&mut row_data);
        for col in 0..w {
            work[[row, col]] = row_data[col];
        }
    }

    let scale = 1.0 / (h * w) as f64;
    work.mapv(|v| v.re * scale)
}

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f64>>,
    tgt_fft: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let (h, w) = ref_fft.dim();
    let mut result = Array2::<Complex<f64>>::zeros((h, w));

    for row in 0..h {
        for col in 0..w {
            let cross = ref_fft[[row, col]] * tgt_fft[[row, col]].conj();
            let mag = cross.norm();
            result[[row, col]] = if mag > EPSILON {
                cross / mag
            } else {
                Complex::new(0.0, 0.0)
            };
        }
    }

    result
}

fn find_peak(data: &Array2<f64>) -> (usize, usize) {
    let (h, w) = data.dim();
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;

    for row in 0..h {
        for col in 0..w {
            if data[[row, col]] > best_val {
                best_val = data[[row, col]];
                best = (row, col);
            }
        }
    }

    best
}

/// Three-point parabola fit through the peak and its vertical neighbors
/// (wrapped), giving a subpixel row correction in [-0.5, 0.5].
fn parabola_refine_row(data: &Array2<f64>, peak_row: usize, peak_col: usize) -> f64 {
    let h = data.nrows();
    let up = data[[(peak_row + h - 1) % h, peak_col]];
    let center = data[[peak_row, peak_col]];
    let down = data[[(peak_row + 1) % h, peak_col]];
    parabola_vertex(up, center, down)
}

fn parabola_refine_col(data: &Array2<f64>, peak_row: usize, peak_col: usize) -> f64 {
    let w = data.ncols();
    let left = data[[peak_row, (peak_col + w - 1) % w]];
    let center = data[[peak_row, peak_col]];
    let right = data[[peak_row, (peak_col + 1) % w]];
    parabola_vertex(left, center, right)
}

fn parabola_vertex(before: f64, center: f64, after: f64) -> f64 {
    let denom = before - 2.0 * center + after;
    if denom.abs() < EPSILON {
        0.0
    } else {
        (0.5 * (before - after) / denom).clamp(-0.5, 0.5)
    }
}

pub fn bilinear_sample(data: &ArrayView2<'_, f64>, y: f64, x: f64) -> f64 {
    let (h, w) = data.dim();

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let sample = |r: i64, c: i64| -> f64 {
        if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
            data[[r as usize, c as usize]]
        } else {
            0.0
        }
    };

    let v00 = sample(y0, x0);
    let v10 = sample(y0, x0 + 1);
    let v01 = sample(y0 + 1, x0);
    let v11 = sample(y0 + 1, x0 + 1);

    v00 * (1.0 - fx) * (1.0 - fy)
        + v10 * fx * (1.0 - fy)
        + v01 * (1.0 - fx) * fy
        + v11 * fx * fy
}
