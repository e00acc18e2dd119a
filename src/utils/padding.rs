//! Fractional edge-replication padding for FFT filtering
//!
//! The deconvolution is a global frequency-domain operation, so edge
//! discontinuities alias into periodic artifacts across the whole
//! volume; replicating the boundary samples suppresses the ringing.

use crate::fft::idx3d;

/// Per-axis half-pad widths from fractional pad sizes.
///
/// Each fraction specifies the total pad as a fraction of that axis
/// length; the half-pad applied to each side is trunc(frac*dim) / 2.
/// A fraction of 0 leaves the axis unpadded.
pub fn pad_widths(
    padding: (f32, f32, f32),
    dims: (usize, usize, usize),
) -> (usize, usize, usize) {
    (
        (padding.0 * dims.0 as f32) as usize / 2,
        (padding.1 * dims.1 as f32) as usize / 2,
        (padding.2 * dims.2 as f32) as usize / 2,
    )
}

/// Pad a volume symmetrically with edge-value replication.
///
/// # Arguments
/// * `data` - Input volume, row-major (plane index fastest)
/// * `rows`, `cols`, `planes` - Input dimensions
/// * `pads` - Half-pad width per axis, applied on both sides
///
/// # Returns
/// Padded volume of shape (rows + 2*p0, cols + 2*p1, planes + 2*p2)
pub fn pad_edge(
    data: &[f32],
    rows: usize,
    cols: usize,
    planes: usize,
    pads: (usize, usize, usize),
) -> Vec<f32> {
    let (p0, p1, p2) = pads;
    let (nr, nc, np) = (rows + 2 * p0, cols + 2 * p1, planes + 2 * p2);
    let mut out = vec![0.0f32; nr * nc * np];

    for i in 0..nr {
        let si = i.saturating_sub(p0).min(rows - 1);
        for j in 0..nc {
            let sj = j.saturating_sub(p1).min(cols - 1);
            for k in 0..np {
                let sk = k.saturating_sub(p2).min(planes - 1);
                out[idx3d(i, j, k, nc, np)] = data[idx3d(si, sj, sk, cols, planes)];
            }
        }
    }

    out
}

/// Extract the original-extent region from a padded volume.
///
/// Slices [pad .. pad + dim] per axis, the exact inverse of the
/// placement done by `pad_edge`.
pub fn crop(
    data: &[f32],
    padded_cols: usize,
    padded_planes: usize,
    pads: (usize, usize, usize),
    dims: (usize, usize, usize),
) -> Vec<f32> {
    let (p0, p1, p2) = pads;
    let (rows, cols, planes) = dims;
    let mut out = vec![0.0f32; rows * cols * planes];

    for i in 0..rows {
        for j in 0..cols {
            let src = idx3d(i + p0, j + p1, p2, padded_cols, padded_planes);
            let dst = idx3d(i, j, 0, cols, planes);
            out[dst..dst + planes].copy_from_slice(&data[src..src + planes]);
        }
    }

    out
}
