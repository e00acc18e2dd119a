//! Half-spectrum 3D FFT backend for real-valued volumes
//!
//! Pairs `realfft` (real-to-complex along the plane axis) with `rustfft`
//! (complex pencil transforms along the row and column axes) to provide
//! the equivalent of NumPy's `rfftn`/`irfftn` for row-major f32 volumes.
//! Transform plans are created once per workspace and reused; pencil
//! batches run on a dedicated rayon pool sized by the caller.

use num_complex::Complex32;
use rayon::prelude::*;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;

/// Index into a 3D volume stored in row-major order (plane index fastest)
/// index = (i*cols + j)*planes + k
#[inline(always)]
pub fn idx3d(i: usize, j: usize, k: usize, cols: usize, planes: usize) -> usize {
    (i * cols + j) * planes + k
}

/// Sample frequencies of an `n`-point DFT with sample spacing `d`,
/// in cycles per unit, origin-first order.
///
/// Matches numpy.fft.fftfreq(n, d) for both even and odd `n`:
/// even n=4: [0, 1, -2, -1] / (n*d); odd n=5: [0, 1, 2, -2, -1] / (n*d).
pub fn fftfreq(n: usize, d: f32) -> Vec<f32> {
    let step = 1.0 / (n as f32 * d);
    let split = n.div_ceil(2);
    (0..n)
        .map(|i| {
            if i < split {
                i as f32 * step
            } else {
                (i as isize - n as isize) as f32 * step
            }
        })
        .collect()
}

/// FFT workspace for full-to-half real 3D transforms.
///
/// The half spectrum lives on the last (plane) axis: a volume of shape
/// (rows, cols, planes) transforms to (rows, cols, planes/2 + 1) complex
/// bins, exploiting Hermitian symmetry of the real input. Forward is
/// unnormalized, inverse scales by 1/(rows*cols*planes), matching the
/// numpy rfftn/irfftn conventions.
pub struct Rfft3dWorkspace {
    rows: usize,
    cols: usize,
    planes: usize,
    /// Non-redundant bins along the plane axis: planes/2 + 1
    half: usize,
    r2c: Arc<dyn RealToComplex<f32>>,
    c2r: Arc<dyn ComplexToReal<f32>>,
    fft_rows: Arc<dyn Fft<f32>>,
    fft_cols: Arc<dyn Fft<f32>>,
    ifft_rows: Arc<dyn Fft<f32>>,
    ifft_cols: Arc<dyn Fft<f32>>,
    pool: rayon::ThreadPool,
}

impl Rfft3dWorkspace {
    /// Plan transforms for a (rows, cols, planes) volume.
    ///
    /// `threads` sizes the worker pool used for the pencil batches;
    /// 0 delegates to rayon's default sizing.
    pub fn new(rows: usize, cols: usize, planes: usize, threads: usize) -> Result<Self, String> {
        let mut real_planner = RealFftPlanner::<f32>::new();
        let r2c = real_planner.plan_fft_forward(planes);
        let c2r = real_planner.plan_fft_inverse(planes);

        let mut planner = FftPlanner::<f32>::new();
        let fft_rows = planner.plan_fft(rows, FftDirection::Forward);
        let fft_cols = planner.plan_fft(cols, FftDirection::Forward);
        let ifft_rows = planner.plan_fft(rows, FftDirection::Inverse);
        let ifft_cols = planner.plan_fft(cols, FftDirection::Inverse);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| format!("Failed to build FFT thread pool: {e}"))?;

        Ok(Self {
            rows,
            cols,
            planes,
            half: planes / 2 + 1,
            r2c,
            c2r,
            fft_rows,
            fft_cols,
            ifft_rows,
            ifft_cols,
            pool,
        })
    }

    /// Number of complex bins along the plane axis of the half spectrum.
    pub fn half_len(&self) -> usize {
        self.half
    }

    /// Full-to-half forward transform of a real volume.
    ///
    /// Input length must be rows*cols*planes; the output holds
    /// rows*cols*(planes/2 + 1) complex bins, unnormalized.
    pub fn forward(&self, data: &[f32]) -> Result<Vec<Complex32>, String> {
        let (rows, cols, planes, half) = (self.rows, self.cols, self.planes, self.half);
        let n_total = rows * cols * planes;
        if data.len() != n_total {
            return Err(format!(
                "Volume length {} does not match dims {}x{}x{}",
                data.len(),
                rows,
                cols,
                planes
            ));
        }

        let mut spectrum = vec![Complex32::new(0.0, 0.0); rows * cols * half];

        // Real-to-complex along the plane axis: input lines are contiguous
        let r2c = &self.r2c;
        self.pool.install(|| {
            data.par_chunks_exact(planes)
                .zip(spectrum.par_chunks_exact_mut(half))
                .try_for_each_init(
                    || (r2c.make_input_vec(), r2c.make_scratch_vec()),
                    |(line, scratch), (src, dst)| {
                        line.copy_from_slice(src);
                        r2c.process_with_scratch(line, dst, scratch)
                            .map_err(|e| format!("Forward real FFT failed: {e}"))
                    },
                )
        })?;

        // Complex passes along the column and row axes
        self.transform_pencils(&mut spectrum, &self.fft_cols, cols, half, rows, cols * half);
        self.transform_pencils(&mut spectrum, &self.fft_rows, rows, cols * half, 1, 0);

        Ok(spectrum)
    }

    /// Half-to-full inverse transform back to a real volume.
    ///
    /// Input length must be rows*cols*(planes/2 + 1); the output real
    /// volume is scaled by 1/(rows*cols*planes).
    pub fn inverse(&self, spectrum: &[Complex32]) -> Result<Vec<f32>, String> {
        let (rows, cols, planes, half) = (self.rows, self.cols, self.planes, self.half);
        if spectrum.len() != rows * cols * half {
            return Err(format!(
                "Spectrum length {} does not match half-spectrum dims {}x{}x{}",
                spectrum.len(),
                rows,
                cols,
                half
            ));
        }

        // The pencil passes and the complex-to-real step both consume
        // their input destructively; work on an owned copy.
        let mut work = spectrum.to_vec();
        self.transform_pencils(&mut work, &self.ifft_rows, rows, cols * half, 1, 0);
        self.transform_pencils(&mut work, &self.ifft_cols, cols, half, rows, cols * half);

        let mut out = vec![0.0f32; rows * cols * planes];
        let scale = 1.0 / (rows * cols * planes) as f32;
        let c2r = &self.c2r;
        self.pool.install(|| {
            work.par_chunks_exact_mut(half)
                .zip(out.par_chunks_exact_mut(planes))
                .try_for_each_init(
                    || c2r.make_scratch_vec(),
                    |scratch, (src, dst)| {
                        c2r.process_with_scratch(src, dst, scratch)
                            .map_err(|e| format!("Inverse real FFT failed: {e}"))?;
                        for v in dst.iter_mut() {
                            *v *= scale;
                        }
                        Ok::<(), String>(())
                    },
                )
        })?;

        Ok(out)
    }

    /// Transform every pencil of length `len` and element stride `stride`
    /// in the half-spectrum buffer.
    ///
    /// Pencil base offsets are enumerated as blk*block_stride + off;
    /// the strided pencils are staged through a contiguous batch buffer
    /// so the per-pencil transforms can run in parallel.
    fn transform_pencils(
        &self,
        data: &mut [Complex32],
        plan: &Arc<dyn Fft<f32>>,
        len: usize,
        stride: usize,
        n_blocks: usize,
        block_stride: usize,
    ) {
        let n_pencils = data.len() / len;
        let block_len = n_pencils / n_blocks;
        let mut batch = vec![Complex32::new(0.0, 0.0); n_pencils * len];

        // Gather
        let mut p = 0;
        for blk in 0..n_blocks {
            let blk_base = blk * block_stride;
            for off in 0..block_len {
                let base = blk_base + off;
                let line = &mut batch[p * len..(p + 1) * len];
                for (t, v) in line.iter_mut().enumerate() {
                    *v = data[base + t * stride];
                }
                p += 1;
            }
        }

        self.pool.install(|| {
            batch.par_chunks_exact_mut(len).for_each_init(
                || vec![Complex32::new(0.0, 0.0); plan.get_inplace_scratch_len()],
                |scratch, line| plan.process_with_scratch(line, scratch),
            )
        });

        // Scatter
        let mut p = 0;
        for blk in 0..n_blocks {
            let blk_base = blk * block_stride;
            for off in 0..block_len {
                let base = blk_base + off;
                let line = &batch[p * len..(p + 1) * len];
                for (t, v) in line.iter().enumerate() {
                    data[base + t * stride] = *v;
                }
                p += 1;
            }
        }
    }
}
