//! TIFF slice-stack I/O
//!
//! Reads an ordered directory of 2D TIFF slices into a single f32
//! volume and writes a volume back out as individual 32-bit float
//! grayscale slices. Slices are stacked along the plane axis in
//! file-name order; integer sample formats are upcast to f32 on load.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};

use crate::fft::idx3d;

/// Volume assembled from a slice stack
#[derive(Debug)]
pub struct Volume {
    /// Volume data, row-major (plane index fastest)
    pub data: Vec<f32>,
    /// Dimensions (rows, cols, planes); planes is the slice count
    pub dims: (usize, usize, usize),
}

/// List the TIFF files of a directory in file-name order.
fn list_slices(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(format!("No TIFF slices found in {}", dir.display()));
    }
    Ok(files)
}

/// Decode a single slice, upcasting samples to f32.
///
/// Returns the pixel data in row-major order with its (rows, cols).
fn read_slice(path: &Path) -> Result<(Vec<f32>, usize, usize), String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| format!("Failed to read TIFF {}: {}", path.display(), e))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| format!("Failed to read dimensions of {}: {}", path.display(), e))?;

    let image = decoder
        .read_image()
        .map_err(|e| format!("Failed to decode {}: {}", path.display(), e))?;

    let data: Vec<f32> = match image {
        DecodingResult::U8(v) => v.iter().map(|&x| x as f32).collect(),
        DecodingResult::U16(v) => v.iter().map(|&x| x as f32).collect(),
        DecodingResult::U32(v) => v.iter().map(|&x| x as f32).collect(),
        DecodingResult::I8(v) => v.iter().map(|&x| x as f32).collect(),
        DecodingResult::I16(v) => v.iter().map(|&x| x as f32).collect(),
        DecodingResult::I32(v) => v.iter().map(|&x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.iter().map(|&x| x as f32).collect(),
        _ => {
            return Err(format!(
                "Unsupported TIFF sample format in {}",
                path.display()
            ))
        }
    };

    Ok((data, height as usize, width as usize))
}

/// Read an ordered sequence of 2D TIFF slices into one 3D volume.
///
/// Every slice must match the dimensions of the first; slices are
/// stacked along the plane axis in file-name order.
pub fn read_slice_stack(dir: &Path) -> Result<Volume, String> {
    let files = list_slices(dir)?;
    let planes = files.len();

    let (first, rows, cols) = read_slice(&files[0])?;
    let mut data = vec![0.0f32; rows * cols * planes];

    for (s, path) in files.iter().enumerate() {
        let slice = if s == 0 {
            first.clone()
        } else {
            let (slice, r, c) = read_slice(path)?;
            if (r, c) != (rows, cols) {
                return Err(format!(
                    "Slice {} is {}x{}, expected {}x{} from the first slice",
                    path.display(),
                    r,
                    c,
                    rows,
                    cols
                ));
            }
            slice
        };

        for i in 0..rows {
            for j in 0..cols {
                data[idx3d(i, j, s, cols, planes)] = slice[i * cols + j];
            }
        }
    }

    Ok(Volume {
        data,
        dims: (rows, cols, planes),
    })
}

/// Write a volume as a sequence of 32-bit float grayscale TIFF slices.
///
/// Each plane becomes `slice_NNNN.tif` with a zero-padded 4-digit index.
pub fn write_slice_stack(
    dir: &Path,
    data: &[f32],
    dims: (usize, usize, usize),
) -> Result<(), String> {
    let (rows, cols, planes) = dims;
    if data.len() != rows * cols * planes {
        return Err(format!(
            "Volume length {} does not match dims {}x{}x{}",
            data.len(),
            rows,
            cols,
            planes
        ));
    }

    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))?;

    let mut slice = vec![0.0f32; rows * cols];
    for k in 0..planes {
        for i in 0..rows {
            for j in 0..cols {
                slice[i * cols + j] = data[idx3d(i, j, k, cols, planes)];
            }
        }

        let path = dir.join(format!("slice_{:04}.tif", k));
        let file = File::create(&path)
            .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
        let mut encoder = TiffEncoder::new(BufWriter::new(file))
            .map_err(|e| format!("Failed to write TIFF {}: {}", path.display(), e))?;
        encoder
            .write_image::<colortype::Gray32Float>(cols as u32, rows as u32, &slice)
            .map_err(|e| format!("Failed to encode {}: {}", path.display(), e))?;
    }

    Ok(())
}
