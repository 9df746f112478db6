//! Vegetation sample source (`Input/rou`)
//!
//! Four header lines, then groups of a `reference canopy count` header line
//! followed by `count` lines of `easting northing`. A line holding a single
//! value ends the list.

use crate::error::ConfigError;
use crate::grid::{FrameTransform, RoughnessSample};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use super::text::{parse_numbers, read_file};

/// Header lines skipped at the top of the file
const HEADER_LINES: usize = 4;

/// Points sharing one canopy height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoughnessGroup {
    /// Reference height of the source survey, informational
    pub reference_height: f64,
    /// Canopy height of every point in the group (site units)
    pub canopy_height: f64,
    /// Site `(easting, northing)` coordinates
    pub points: Vec<[f64; 2]>,
}

/// A raw sample and where it lands in the domain frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub easting: f64,
    pub northing: f64,
    /// Along-wind domain coordinate
    pub a: f64,
    /// Cross-wind domain coordinate
    pub b: f64,
}

/// Parsed vegetation source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoughnessSource {
    pub groups: Vec<RoughnessGroup>,
}

/// Samples accepted into the domain window plus the full transform record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainSamples {
    pub accepted: Vec<RoughnessSample>,
    pub records: Vec<SampleRecord>,
}

impl RoughnessSource {
    /// Parse the text of a vegetation source file
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` for a malformed header or point line, or a
    /// group that ends before its declared count
    pub fn parse(text: &str, source: &str) -> Result<Self, ConfigError> {
        let parse_err = |line: usize, message: String| ConfigError::Parse {
            source: source.to_string(),
            line,
            message,
        };

        let mut lines = text
            .lines()
            .enumerate()
            .skip(HEADER_LINES)
            .map(|(i, l)| (i + 1, l))
            .filter(|(_, l)| !l.trim().is_empty());
        let mut groups = Vec::new();

        while let Some((line_no, line)) = lines.next() {
            let header = parse_numbers(line, source, line_no)?;
            let [reference_height, canopy_height, count] = match header.as_slice() {
                [_] => break,
                &[r, c, n] => [r, c, n],
                other => {
                    return Err(parse_err(
                        line_no,
                        format!("expected a 3-column group header, found {} columns", other.len()),
                    ))
                }
            };
            if !(count >= 0.0 && count.fract() == 0.0) {
                return Err(parse_err(line_no, format!("group size {count} is not a count")));
            }

            let count = count as usize;
            let mut points = Vec::with_capacity(count);
            for _ in 0..count {
                let (point_no, point_line) = lines.next().ok_or_else(|| {
                    parse_err(
                        line_no,
                        format!("group declares {count} points, file ends after {}", points.len()),
                    )
                })?;
                match parse_numbers(point_line, source, point_no)?.as_slice() {
                    &[e, n] => points.push([e, n]),
                    other => {
                        return Err(parse_err(
                            point_no,
                            format!("expected 'easting northing', found {} columns", other.len()),
                        ))
                    }
                }
            }

            groups.push(RoughnessGroup {
                reference_height,
                canopy_height,
                points,
            });
        }

        debug!(
            "{}: {} groups, {} points",
            source,
            groups.len(),
            groups.iter().map(|g| g.points.len()).sum::<usize>()
        );
        Ok(Self { groups })
    }

    /// Read a vegetation source file
    ///
    /// # Errors
    /// Returns `ConfigError` if the file is unreadable or malformed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_file(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Total number of points
    pub fn point_count(&self) -> usize {
        self.groups.iter().map(|g| g.points.len()).sum()
    }

    /// Transform every point into the domain frame and keep those inside the
    /// square window of side `domain_size`
    pub fn domain_samples(&self, frame: &FrameTransform, domain_size: f64, multiplier: f64) -> DomainSamples {
        let half = domain_size / 2.0;
        let mut out = DomainSamples::default();

        for group in &self.groups {
            for &[easting, northing] in &group.points {
                let p = frame.sample_position(easting, northing);
                out.records.push(SampleRecord {
                    easting,
                    northing,
                    a: p.x,
                    b: p.y,
                });
                if p.x.abs() <= half && p.y.abs() <= half {
                    out.accepted.push(RoughnessSample {
                        position: p,
                        height: group.canopy_height * multiplier,
                    });
                }
            }
        }

        if out.accepted.is_empty() {
            warn!(
                "None of {} vegetation samples fall inside the domain window of {}",
                out.records.len(),
                domain_size
            );
        }
        out
    }
}
