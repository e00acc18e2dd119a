//! Integration tests for the TIE (Paganin) phase retrieval filter

mod common;

use approx::assert_relative_eq;
use phrt_core::{phase_retrieval, PaganinParams};
use std::f64::consts::PI;

/// mu = 4*pi*beta/lambda with lambda = 1.2398424e-6 / energy_kev (mm)
fn mu(beta: f64, energy_kev: f64) -> f64 {
    4.0 * PI * beta / (1.2398424e-6 / energy_kev)
}

/// The closed-form inversion applied to a single intensity value
fn log_inversion(x: f32, mu: f64) -> f32 {
    (-1.0 / mu) as f32 * (x + f32::EPSILON).ln()
}

#[test]
fn output_shape_matches_input_shape() {
    let params = PaganinParams::default();

    // Mixed even/odd dims and padding triples, including inert ones
    let cases = [
        ((8usize, 8usize, 8usize), (0.0f32, 0.0f32, 0.25f32)),
        ((6, 7, 9), (0.25, 0.25, 0.25)),
        ((5, 4, 3), (0.0, 0.0, 0.0)),
        ((4, 4, 16), (0.5, 0.0, 1.0)),
    ];

    for ((rows, cols, planes), padding) in cases {
        let data: Vec<f32> = (0..rows * cols * planes)
            .map(|i| 0.3 + 0.4 * ((i % 17) as f32 / 17.0))
            .collect();
        let params = PaganinParams { padding, ..params };

        let out = phase_retrieval(&data, rows, cols, planes, &params).unwrap();
        assert_eq!(
            out.len(),
            rows * cols * planes,
            "Shape not preserved for dims {:?} padding {:?}",
            (rows, cols, planes),
            padding
        );
        assert!(out.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn constant_volume_maps_to_uniform_log_inversion() {
    // A constant field has zero phase curvature: only the DC term is
    // populated, H(0) = 1, and the filter reduces to the log inversion
    let (rows, cols, planes) = (8, 8, 8);
    let k = 0.5f32;
    let data = vec![k; rows * cols * planes];
    let params = PaganinParams::default();

    let out = phase_retrieval(&data, rows, cols, planes, &params).unwrap();

    let expected = log_inversion(k, mu(params.beta, params.energy_kev));
    for &v in &out {
        assert_relative_eq!(v, expected, max_relative = 1e-3);
    }
    assert!(
        common::spread(&out) < expected.abs() * 1e-3,
        "Filtered constant field should stay uniform, spread = {}",
        common::spread(&out)
    );
}

#[test]
fn zero_distance_reduces_to_pure_log_inversion() {
    // With distance 0 the transfer function is identically 1 and the
    // filter must return the log inversion of the unfiltered input
    let (rows, cols, planes) = (8, 6, 10);
    let data: Vec<f32> = (0..rows * cols * planes)
        .map(|i| 0.2 + 0.6 * ((i % 23) as f32 / 23.0))
        .collect();
    let params = PaganinParams {
        distance_mm: 0.0,
        ..PaganinParams::default()
    };

    let out = phase_retrieval(&data, rows, cols, planes, &params).unwrap();

    let mu = mu(params.beta, params.energy_kev);
    let expected: Vec<f32> = data.iter().map(|&x| log_inversion(x, mu)).collect();

    assert!(
        common::max_abs_diff(&out, &expected) < expected[0].abs() * 1e-3,
        "Zero-distance filter deviates from direct inversion, rmse = {}",
        common::rmse(&out, &expected)
    );
}

#[test]
fn end_to_end_uniform_scenario() {
    // 16^3 volume of 0.5 filtered with the demonstration optics
    let (rows, cols, planes) = (16, 16, 16);
    let k = 0.5f32;
    let data = vec![k; rows * cols * planes];
    let params = PaganinParams {
        beta: 1e-10,
        delta: 1.8e-7,
        energy_kev: 22.0,
        distance_mm: 150.0,
        pixel_mm: 0.0022,
        padding: (0.0, 0.0, 0.25),
        threads: 4,
    };

    let out = phase_retrieval(&data, rows, cols, planes, &params).unwrap();
    assert_eq!(out.len(), rows * cols * planes);

    let expected = log_inversion(k, mu(params.beta, params.energy_kev));
    for &v in &out {
        assert_relative_eq!(v, expected, max_relative = 1e-3);
    }
}

#[test]
fn brighter_intensity_gives_lower_phase() {
    // -ln is decreasing: a more transmissive (brighter) volume must map
    // to smaller retrieved phase values
    let (rows, cols, planes) = (8, 8, 8);
    let params = PaganinParams::default();

    let dim = vec![0.3f32; rows * cols * planes];
    let bright = vec![0.9f32; rows * cols * planes];

    let out_dim = phase_retrieval(&dim, rows, cols, planes, &params).unwrap();
    let out_bright = phase_retrieval(&bright, rows, cols, planes, &params).unwrap();

    for (a, b) in out_dim.iter().zip(out_bright.iter()) {
        assert!(a > b, "Dimmer volume should retrieve larger phase");
    }
}

#[test]
fn repeated_calls_are_deterministic() {
    // The filter owns all of its state per call; identical inputs must
    // produce identical outputs
    let (rows, cols, planes) = (6, 6, 6);
    let data: Vec<f32> = (0..rows * cols * planes)
        .map(|i| 0.4 + 0.2 * ((i % 5) as f32))
        .collect();
    let params = PaganinParams {
        threads: 1,
        ..PaganinParams::default()
    };

    let first = phase_retrieval(&data, rows, cols, planes, &params).unwrap();
    let second = phase_retrieval(&data, rows, cols, planes, &params).unwrap();
    assert_eq!(first, second);
}
