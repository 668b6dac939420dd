//! Minimal `.npy` codec for 2-D float matrices
//!
//! Reads and writes the NumPy array format so an index directory can be
//! shared with Python tooling. Only C-ordered, little-endian `f4`/`f8`
//! matrices are supported.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

const MAGIC: &[u8] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

static DESCR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'descr'\s*:\s*'([^']*)'").expect("descr pattern is valid"));
static FORTRAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'fortran_order'\s*:\s*(True|False)").expect("fortran pattern is valid")
});
static SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'shape'\s*:\s*\(([^)]*)\)").expect("shape pattern is valid"));

/// Errors raised by the `.npy` codec
#[derive(Error, Debug)]
pub enum NpyError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Not an `.npy` file or corrupt header
    #[error("Invalid npy header: {0}")]
    InvalidHeader(String),

    /// Valid file, but a layout this codec does not handle
    #[error("Unsupported npy layout: {0}")]
    Unsupported(String),

    /// Payload shorter than the header promises
    #[error("Truncated npy payload: expected {expected} bytes, found {found}")]
    Truncated {
        /// Bytes required by the shape
        expected: usize,
        /// Bytes present after the header
        found: usize,
    },
}

/// Row-major matrix of `f32`
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
    /// `rows * cols` values, row after row
    pub data: Vec<f32>,
}

impl Matrix {
    /// Borrow row `i`
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
}

/// Write a matrix as `<f4`, version 1.0
pub fn write_matrix(path: &Path, matrix: &Matrix) -> Result<(), NpyError> {
    if matrix.data.len() != matrix.rows * matrix.cols {
        return Err(NpyError::InvalidHeader(format!(
            "data length {} does not match shape ({}, {})",
            matrix.data.len(),
            matrix.rows,
            matrix.cols
        )));
    }

    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        matrix.rows, matrix.cols
    );
    // magic(6) + version(2) + header_len(2) + header + '\n' must be 64-aligned
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| NpyError::InvalidHeader("header too long".to_string()))?;

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + matrix.data.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for v in &matrix.data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path, out)?;
    Ok(())
}

/// Read a 2-D `<f4` or `<f8` matrix
pub fn read_matrix(path: &Path) -> Result<Matrix, NpyError> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}

fn decode(bytes: &[u8]) -> Result<Matrix, NpyError> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(NpyError::InvalidHeader("missing magic string".to_string()));
    }
    let major = bytes[MAGIC.len()];
    let (header_start, header_len) = match major {
        1 => {
            let at = MAGIC.len() + 2;
            let raw = bytes
                .get(at..at + 2)
                .ok_or_else(|| NpyError::InvalidHeader("short header length".to_string()))?;
            (at + 2, u16::from_le_bytes([raw[0], raw[1]]) as usize)
        }
        2 | 3 => {
            let at = MAGIC.len() + 2;
            let raw = bytes
                .get(at..at + 4)
                .ok_or_else(|| NpyError::InvalidHeader("short header length".to_string()))?;
            (
                at + 4,
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize,
            )
        }
        other => {
            return Err(NpyError::Unsupported(format!("format version {}", other)));
        }
    };

    let header_bytes = bytes
        .get(header_start..header_start + header_len)
        .ok_or_else(|| NpyError::InvalidHeader("header runs past end of file".to_string()))?;
    let header = std::str::from_utf8(header_bytes)
        .map_err(|e| NpyError::InvalidHeader(e.to_string()))?;

    let descr = DESCR
        .captures(header)
        .map(|c| c[1].to_string())
        .ok_or_else(|| NpyError::InvalidHeader("missing 'descr'".to_string()))?;
    let fortran = FORTRAN
        .captures(header)
        .map(|c| &c[1] == "True")
        .ok_or_else(|| NpyError::InvalidHeader("missing 'fortran_order'".to_string()))?;
    let shape = SHAPE
        .captures(header)
        .map(|c| c[1].to_string())
        .ok_or_else(|| NpyError::InvalidHeader("missing 'shape'".to_string()))?;

    if fortran {
        return Err(NpyError::Unsupported("fortran order".to_string()));
    }

    let dims: Vec<usize> = shape
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| NpyError::InvalidHeader(format!("bad dimension '{}'", s)))
        })
        .collect::<Result<_, _>>()?;
    let (rows, cols) = match dims.as_slice() {
        [r, c] => (*r, *c),
        _ => {
            return Err(NpyError::Unsupported(format!(
                "expected a 2-D array, got shape ({})",
                shape
            )))
        }
    };

    let payload = &bytes[header_start + header_len..];
    let byte_len = |width: usize| {
        rows.checked_mul(cols)
            .and_then(|count| count.checked_mul(width))
            .ok_or_else(|| NpyError::InvalidHeader(format!("shape ({}) is too large", shape)))
    };
    let data = match descr.as_str() {
        "<f4" => {
            let expected = byte_len(4)?;
            if payload.len() < expected {
                return Err(NpyError::Truncated {
                    expected,
                    found: payload.len(),
                });
            }
            payload[..expected]
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        }
        "<f8" => {
            let expected = byte_len(8)?;
            if payload.len() < expected {
                return Err(NpyError::Truncated {
                    expected,
                    found: payload.len(),
                });
            }
            payload[..expected]
                .chunks_exact(8)
                .map(|b| {
                    f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
                })
                .collect()
        }
        other => return Err(NpyError::Unsupported(format!("dtype '{}'", other))),
    };

    Ok(Matrix { rows, cols, data })
}
