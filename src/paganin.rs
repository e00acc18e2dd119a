//! Single-distance TIE (Paganin) phase retrieval
//!
//! Recovers a quantitative phase map from a propagation-based
//! phase-contrast volume by a one-step Fourier-domain deconvolution:
//! the defocus-induced intensity contrast is linked to the Laplacian of
//! the phase under the paraxial approximation, which in frequency space
//! is a division by `1 + z*delta/mu * |k|^2` followed by a closed-form
//! logarithmic inversion.
//!
//! Reference:
//! Paganin, D., et al. (2002). "Simultaneous phase and amplitude
//! extraction from a single defocused image of a homogeneous object."
//! Journal of Microscopy, 206(1):33-40.
//! https://doi.org/10.1046/j.1365-2818.2002.01010.x

use crate::fft::{fftfreq, idx3d, Rfft3dWorkspace};
use crate::utils::padding::{crop, pad_edge, pad_widths};
use std::f64::consts::PI;

/// X-ray energy-wavelength relation, pre-expressed in keV*mm
const KEV_MM: f64 = 1.2398424e-6;

/// Physical and execution parameters for the TIE filter
#[derive(Debug, Clone, Copy)]
pub struct PaganinParams {
    /// Beta: imaginary part of the complex refractive index decrement
    pub beta: f64,
    /// Delta: decrement from unity of the real part of the refractive index
    pub delta: f64,
    /// Incident beam energy in keV
    pub energy_kev: f64,
    /// Sample-to-detector propagation distance in mm
    pub distance_mm: f64,
    /// Detector element side in mm
    pub pixel_mm: f64,
    /// Per-axis pad size as a fraction of the axis length (default (0, 0, 0.25))
    pub padding: (f32, f32, f32),
    /// Transform worker count; 0 uses the rayon default (default 4)
    pub threads: usize,
}

impl Default for PaganinParams {
    fn default() -> Self {
        Self {
            beta: 1e-10,
            delta: 1.8e-7,
            energy_kev: 22.0,
            distance_mm: 150.0,
            pixel_mm: 0.0022,
            padding: (0.0, 0.0, 0.25),
            threads: 4,
        }
    }
}

impl PaganinParams {
    /// Wavelength of the incident beam in mm
    pub fn wavelength_mm(&self) -> f64 {
        KEV_MM / self.energy_kev
    }

    /// Absorption-to-phase coupling mu = 4*pi*beta/lambda, in 1/mm
    pub fn mu(&self) -> f64 {
        4.0 * PI * self.beta / self.wavelength_mm()
    }
}

/// Build the TIE transfer function `H = 1 + coeff*(u^2 + v^2 + w^2)`.
///
/// Angular spatial-frequency axes (radians per mm) are generated in
/// origin-first DFT order, so the kernel aligns with the half-spectrum
/// layout of the forward transform directly: the last axis keeps only
/// its first `planes/2 + 1` bins. `coeff` is `distance*delta/mu`.
pub fn tie_kernel(
    rows: usize,
    cols: usize,
    planes: usize,
    pixel_mm: f64,
    coeff: f64,
) -> Vec<f32> {
    let half = planes / 2 + 1;
    let two_pi = (2.0 * PI) as f32;

    let v: Vec<f32> = fftfreq(rows, pixel_mm as f32).iter().map(|f| f * two_pi).collect();
    let u: Vec<f32> = fftfreq(cols, pixel_mm as f32).iter().map(|f| f * two_pi).collect();
    let w: Vec<f32> = fftfreq(planes, pixel_mm as f32).iter().map(|f| f * two_pi).collect();

    let coeff = coeff as f32;
    let mut kernel = vec![0.0f32; rows * cols * half];
    for i in 0..rows {
        let v2 = v[i] * v[i];
        for j in 0..cols {
            let uv2 = u[j] * u[j] + v2;
            for k in 0..half {
                kernel[idx3d(i, j, k, cols, half)] = 1.0 + coeff * (uv2 + w[k] * w[k]);
            }
        }
    }

    kernel
}

/// Execute phase retrieval with the TIE (Paganin) algorithm.
///
/// The volume is padded symmetrically with edge replication, transformed
/// with a full-to-half real 3D FFT, divided by the TIE transfer function,
/// transformed back, cropped to the original extent, and mapped through
/// the closed-form inversion `-(1/mu)*ln(x + eps)`.
///
/// # Arguments
/// * `data` - Volume data, row-major (plane index fastest)
/// * `rows`, `cols`, `planes` - Volume dimensions
/// * `params` - Physical and execution parameters
///
/// # Returns
/// Phase map with the same dimensions as the input.
///
/// Degenerate parameter combinations (zero beta, delta, or distance) are
/// not rejected; the f32 machine-epsilon guards on the division and the
/// logarithm let them degrade silently instead.
pub fn phase_retrieval(
    data: &[f32],
    rows: usize,
    cols: usize,
    planes: usize,
    params: &PaganinParams,
) -> Result<Vec<f32>, String> {
    if data.len() != rows * cols * planes {
        return Err(format!(
            "Volume length {} does not match dims {}x{}x{}",
            data.len(),
            rows,
            cols,
            planes
        ));
    }

    let eps = f32::EPSILON;

    // Pad with edge replication (inert for zero fractions)
    let pads = pad_widths(params.padding, (rows, cols, planes));
    let (nr, nc, np) = (rows + 2 * pads.0, cols + 2 * pads.1, planes + 2 * pads.2);
    let padded = pad_edge(data, rows, cols, planes, pads);

    // Forward full-to-half transform of the padded volume
    let ws = Rfft3dWorkspace::new(nr, nc, np, params.threads)?;
    let mut spectrum = ws.forward(&padded)?;

    let mu = params.mu();

    // Deconvolve: divide by the TIE transfer function, guarded against
    // exact zeros (e.g. the DC term when distance or delta is zero)
    let kernel = tie_kernel(nr, nc, np, params.pixel_mm, params.distance_mm * params.delta / mu);
    for (s, &h) in spectrum.iter_mut().zip(kernel.iter()) {
        *s /= h + eps;
    }

    let filtered = ws.inverse(&spectrum)?;

    // Crop the pad margins and conclude with the logarithmic inversion
    let cropped = crop(&filtered, nc, np, pads, (rows, cols, planes));
    let inv_mu = (-1.0 / mu) as f32;
    Ok(cropped.iter().map(|&x| inv_mu * (x + eps).ln()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_dc_term_is_unity() {
        let kernel = tie_kernel(8, 8, 8, 0.0022, 1.0e-3);
        assert_eq!(kernel[0], 1.0, "DC term must pass unchanged");
    }

    #[test]
    fn test_kernel_zero_distance_is_identity() {
        let kernel = tie_kernel(6, 5, 4, 0.0022, 0.0);
        for (i, &h) in kernel.iter().enumerate() {
            assert_eq!(h, 1.0, "Zero coupling must give H=1 at bin {}", i);
        }
    }

    #[test]
    fn test_kernel_even_symmetry() {
        // H depends on squared frequencies, so mirrored bins along the
        // full row/column axes must match exactly
        let (rows, cols, planes) = (8, 6, 8);
        let kernel = tie_kernel(rows, cols, planes, 0.0022, 2.5e-4);
        let half = planes / 2 + 1;

        for i in 1..rows {
            for j in 1..cols {
                for k in 0..half {
                    assert_eq!(
                        kernel[idx3d(i, j, k, cols, half)],
                        kernel[idx3d(rows - i, cols - j, k, cols, half)],
                        "Kernel not even-symmetric at ({}, {}, {})",
                        i, j, k
                    );
                }
            }
        }
    }

    #[test]
    fn test_kernel_grows_with_frequency() {
        let (rows, cols, planes) = (16, 16, 16);
        let kernel = tie_kernel(rows, cols, planes, 0.0022, 2.5e-4);
        let half = planes / 2 + 1;

        // Nyquist corner carries the largest squared-frequency sum
        let nyquist = kernel[idx3d(rows / 2, cols / 2, half - 1, cols, half)];
        for &h in &kernel {
            assert!(h >= 1.0, "H must never fall below the DC response");
            assert!(h <= nyquist, "No bin may exceed the Nyquist corner");
        }
        assert!(nyquist > 1.0);
    }

    #[test]
    fn test_phase_retrieval_rejects_bad_length() {
        let params = PaganinParams::default();
        let err = phase_retrieval(&[0.5; 10], 4, 4, 4, &params).unwrap_err();
        assert!(err.contains("does not match dims"), "got: {err}");
    }

    #[test]
    fn test_derived_quantities() {
        let params = PaganinParams::default();
        // lam = 1.2398424e-6 / 22 mm
        assert!((params.wavelength_mm() - 5.635647e-8).abs() < 1e-13);
        // mu = 4*pi*beta/lam
        assert!((params.mu() - 2.2299e-2).abs() < 1e-5);
    }
}
