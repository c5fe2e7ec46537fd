//! PGX image reading and writing.
//!
//! A PGX file is a single text header line `PG <endianness> <sign> <depth>
//! <width> <height>` followed by raw samples. `ML` stores the most
//! significant byte first, `LM` the least significant byte first.

use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, prelude::*, BufReader, BufWriter};
use std::path::Path;

use atrous::{Raster, Region};
use log::{debug, info};

#[derive(Debug)]
pub enum PgxError {
    Io(io::Error),
    /// The first line is not a PGX header.
    InvalidHeader { header: String },
    /// Sample depth outside of `1..=32` bits.
    UnsupportedBitDepth { bit_depth: u32 },
    /// The file holds fewer samples than the header announces.
    Truncated { expected: usize, actual: usize },
    /// PGX stores two-dimensional images only.
    UnsupportedDimension { dimension: usize },
}

impl error::Error for PgxError {}
impl fmt::Display for PgxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {}", e),
            Self::InvalidHeader { header } => write!(f, "invalid pgx header {:?}", header),
            Self::UnsupportedBitDepth { bit_depth } => {
                write!(f, "unsupported pgx bit depth {}", bit_depth)
            }
            Self::Truncated { expected, actual } => {
                write!(f, "expected {} samples, found {}", expected, actual)
            }
            Self::UnsupportedDimension { dimension } => {
                write!(f, "cannot store a {}-dimensional raster as pgx", dimension)
            }
        }
    }
}

impl From<io::Error> for PgxError {
    fn from(e: io::Error) -> Self {
        PgxError::Io(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endianness {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    endianness: Endianness,
    signed: bool,
    bit_depth: u32,
    width: usize,
    height: usize,
    samples: usize,
}

impl Header {
    fn parse(line: &str) -> Result<Self, PgxError> {
        let invalid = || PgxError::InvalidHeader {
            header: line.trim_end().to_string(),
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 6 || parts[0] != "PG" {
            return Err(invalid());
        }
        let endianness = match parts[1] {
            "ML" => Endianness::Big,
            "LM" => Endianness::Little,
            _ => return Err(invalid()),
        };
        let signed = match parts[2] {
            "+" => false,
            "-" => true,
            _ => return Err(invalid()),
        };
        let bit_depth = parts[3].parse::<u32>().map_err(|_| invalid())?;
        let width = parts[4].parse::<usize>().map_err(|_| invalid())?;
        let height = parts[5].parse::<usize>().map_err(|_| invalid())?;
        if bit_depth == 0 || bit_depth > 32 {
            return Err(PgxError::UnsupportedBitDepth { bit_depth });
        }
        let samples = width.checked_mul(height).ok_or_else(invalid)?;
        Ok(Header {
            endianness,
            signed,
            bit_depth,
            width,
            height,
            samples,
        })
    }

    fn bytes_per_sample(&self) -> usize {
        match self.bit_depth {
            1..=8 => 1,
            9..=16 => 2,
            _ => 4,
        }
    }

    fn decode(&self, c: &[u8]) -> f64 {
        let mut bytes = [0u8; 4];
        match self.endianness {
            Endianness::Big => bytes[4 - c.len()..].copy_from_slice(c),
            Endianness::Little => {
                for (i, &b) in c.iter().enumerate() {
                    bytes[3 - i] = b;
                }
            }
        }
        let raw = u32::from_be_bytes(bytes);
        if self.signed {
            // sign extend from the stored width
            let shift = 32 - 8 * c.len() as u32;
            (((raw << shift) as i32) >> shift) as f64
        } else {
            raw as f64
        }
    }
}

/// Read a PGX file into a `width x height` raster
pub fn load_pgx(p: &Path) -> Result<Raster, PgxError> {
    let file = File::open(p)?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let header = Header::parse(&line)?;
    debug!("pgx header {:?}", header);

    let mut raw_data = Vec::new();
    reader.read_to_end(&mut raw_data)?;
    let expected = header.samples;
    let actual = raw_data.len() / header.bytes_per_sample();
    if actual < expected {
        return Err(PgxError::Truncated { expected, actual });
    }
    let samples: Vec<f64> = raw_data
        .chunks_exact(header.bytes_per_sample())
        .take(expected)
        .map(|c| header.decode(c))
        .collect();
    info!(
        "loaded {}x{} {}-bit pgx image {}",
        header.width,
        header.height,
        header.bit_depth,
        p.display()
    );
    Ok(Raster::from_data(
        Region::from_size(&[header.width, header.height]),
        samples,
    ))
}

/// Write a 2-D raster as signed 32-bit big-endian PGX.
///
/// Every sample is rounded to the nearest integer and clamped to the `i32`
/// range, so fractional wavelet coefficients do not survive the export.
pub fn save_pgx(p: &Path, raster: &Raster) -> Result<(), PgxError> {
    if raster.dimension() != 2 {
        return Err(PgxError::UnsupportedDimension {
            dimension: raster.dimension(),
        });
    }
    let size = raster.region().size();
    let mut writer = BufWriter::new(File::create(p)?);
    writeln!(writer, "PG ML - 32 {} {}", size[0], size[1])?;
    for &sample in raster.as_slice() {
        let value = sample.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32;
        writer.write_all(&value.to_be_bytes())?;
    }
    writer.flush()?;
    Ok(())
}
