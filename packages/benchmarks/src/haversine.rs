//! Great-circle distances between coordinate pairs, and the generate and sum pipeline built
//! around them.
//!
//! The generator writes random coordinate pairs as JSON plus a binary file with the expected
//! distance of every pair. The summing stage reads the JSON back, computes the mean distance
//! and checks it against the expected distances, with every stage in its own profiler region.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use cycle_harness::Profiler;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::Result;
use crate::{HaversineError, Json};

/// Radius of the Earth in kilometers used for all distance calculations.
pub const EARTH_RADIUS: f64 = 6372.8;

const ANSWER_SIZE: usize = size_of::<f64>();

/// Two points on a sphere, as longitude (`x`) and latitude (`y`) in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointPair {
    /// Longitude of the first point.
    pub x0: f64,

    /// Latitude of the first point.
    pub y0: f64,

    /// Longitude of the second point.
    pub x1: f64,

    /// Latitude of the second point.
    pub y1: f64,
}

/// Great-circle distance between the two points of `pair` on a sphere of the given radius.
#[must_use]
pub fn haversine_distance(pair: &PointPair, radius: f64) -> f64 {
    let d_lat = (pair.y1 - pair.y0).to_radians();
    let d_lon = (pair.x1 - pair.x0).to_radians();
    let lat0 = pair.y0.to_radians();
    let lat1 = pair.y1.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat0.cos() * lat1.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    radius * c
}

/// Mean distance over all pairs. Zero for an empty slice.
#[must_use]
#[expect(
    clippy::cast_precision_loss,
    reason = "pair counts are far below the 2^52 limit of exact f64 integers"
)]
pub fn average_distance(pairs: &[PointPair], radius: f64) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }

    let sum: f64 = pairs.iter().map(|pair| haversine_distance(pair, radius)).sum();

    sum / pairs.len() as f64
}

/// Generates `count` uniformly distributed pairs. The same seed always yields the same pairs.
#[must_use]
pub fn generate_pairs(count: usize, seed: u64) -> Vec<PointPair> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..count)
        .map(|_| PointPair {
            x0: rng.random_range(-180.0..180.0),
            y0: rng.random_range(-90.0..90.0),
            x1: rng.random_range(-180.0..180.0),
            y1: rng.random_range(-90.0..90.0),
        })
        .collect()
}

/// Writes pairs in the point file layout: one pair object per line inside a `pairs` array.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_pairs_json(pairs: &[PointPair], writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer, "{{ \"pairs\": [")?;

    let mut remaining = pairs.len();

    for pair in pairs {
        remaining = remaining.saturating_sub(1);
        let separator = if remaining == 0 { "" } else { "," };

        writeln!(
            writer,
            "  {{\"x0\":{},\"y0\":{},\"x1\":{},\"y1\":{}}}{separator}",
            pair.x0, pair.y0, pair.x1, pair.y1
        )?;
    }

    writeln!(writer, "]}}")
}

/// Writes distances as consecutive little-endian 64-bit floats.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_answers(distances: &[f64], writer: &mut impl Write) -> io::Result<()> {
    for distance in distances {
        writer.write_all(&distance.to_le_bytes())?;
    }

    Ok(())
}

/// Decodes an answer file written by [`write_answers()`].
///
/// # Errors
///
/// Returns an error if the length is not a whole number of floats.
pub fn decode_answers(bytes: &[u8]) -> Result<Vec<f64>> {
    let chunks = bytes.chunks_exact(ANSWER_SIZE);

    if !chunks.remainder().is_empty() {
        return Err(HaversineError::AnswerFileLength {
            length: bytes.len(),
        });
    }

    Ok(chunks
        .map(|chunk| {
            f64::from_le_bytes(
                chunk
                    .try_into()
                    .expect("chunks_exact yields chunks of exactly this size"),
            )
        })
        .collect())
}

/// Extracts the pairs from a parsed point file.
///
/// # Errors
///
/// Returns an error if the document is not an object with a `pairs` array of objects that each
/// have numeric `x0`, `y0`, `x1` and `y1` members.
pub fn pairs_from_json(json: &Json) -> Result<Vec<PointPair>> {
    let pairs = json
        .get("pairs")
        .and_then(Json::as_array)
        .ok_or_else(|| HaversineError::shape("expected an object with a \"pairs\" array"))?;

    pairs
        .iter()
        .enumerate()
        .map(|(index, pair)| {
            let coordinate = |name: &str| {
                pair.get(name).and_then(Json::as_f64).ok_or_else(|| {
                    HaversineError::shape(format!("pair {index} has no numeric \"{name}\""))
                })
            };

            Ok(PointPair {
                x0: coordinate("x0")?,
                y0: coordinate("y0")?,
                x1: coordinate("x1")?,
                y1: coordinate("y1")?,
            })
        })
        .collect()
}

/// Generates `count` pairs with the given seed and writes the point and answer files.
///
/// Returns the reference mean distance.
///
/// # Errors
///
/// Returns an error if either file cannot be written.
pub fn generate_files(
    points_path: &Path,
    answers_path: &Path,
    count: usize,
    seed: u64,
) -> Result<f64> {
    let pairs = generate_pairs(count, seed);
    let distances: Vec<f64> = pairs
        .iter()
        .map(|pair| haversine_distance(pair, EARTH_RADIUS))
        .collect();

    write_file(points_path, |writer| write_pairs_json(&pairs, writer))?;
    write_file(answers_path, |writer| write_answers(&distances, writer))?;

    debug!(count, seed, points = %points_path.display(), "generated haversine input");

    Ok(average_distance(&pairs, EARTH_RADIUS))
}

fn write_file(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<fs::File>) -> io::Result<()>,
) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| HaversineError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    write(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| HaversineError::io(path, e))
}

/// The result of summing a point file.
#[derive(Clone, Debug, PartialEq)]
pub struct SumOutcome {
    /// Number of pairs in the point file.
    pub pair_count: usize,

    /// Mean distance computed from the point file.
    pub average: f64,

    /// Mean distance according to the answer file, if one was checked.
    pub reference_average: Option<f64>,

    /// Largest difference between a computed distance and its expected distance, if an answer
    /// file was checked.
    pub max_deviation: Option<f64>,
}

/// Reads, parses and sums a point file, optionally checking it against an answer file.
///
/// Every stage runs in its own region of `profiler`: `read`, `parse` (with nested
/// `parse_value`), `lookup`, `sum` and `validate`.
///
/// # Errors
///
/// Returns an error if a file cannot be read, the point file is malformed or the answer file
/// does not match the point file.
pub fn sum_file(
    points_path: &Path,
    answers_path: Option<&Path>,
    profiler: &Profiler,
) -> Result<SumOutcome> {
    let input = {
        let read = profiler.enter_named("read");
        let input = fs::read(points_path).map_err(|e| HaversineError::io(points_path, e))?;
        read.record_bytes(input.len() as u64);
        input
    };

    let json = {
        let _parse = profiler.enter_named("parse");
        Json::parse_profiled(&input, profiler)?
    };

    let pairs = {
        let _lookup = profiler.enter_named("lookup");
        pairs_from_json(&json)?
    };

    let average = {
        let sum = profiler.enter_named("sum");
        sum.record_bytes(
            u64::try_from(size_of_val(pairs.as_slice())).expect("in-memory size fits in u64"),
        );
        average_distance(&pairs, EARTH_RADIUS)
    };

    let Some(answers_path) = answers_path else {
        return Ok(SumOutcome {
            pair_count: pairs.len(),
            average,
            reference_average: None,
            max_deviation: None,
        });
    };

    let _validate = profiler.enter_named("validate");

    let answers = fs::read(answers_path).map_err(|e| HaversineError::io(answers_path, e))?;
    let answers = decode_answers(&answers)?;

    if answers.len() != pairs.len() {
        return Err(HaversineError::AnswerCountMismatch {
            pairs: pairs.len(),
            answers: answers.len(),
        });
    }

    let max_deviation = pairs
        .iter()
        .zip(&answers)
        .map(|(pair, expected)| (haversine_distance(pair, EARTH_RADIUS) - expected).abs())
        .fold(0.0, f64::max);

    Ok(SumOutcome {
        pair_count: pairs.len(),
        average,
        reference_average: Some(mean(&answers)),
        max_deviation: Some(max_deviation),
    })
}

#[expect(
    clippy::cast_precision_loss,
    reason = "answer counts are far below the 2^52 limit of exact f64 integers"
)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.iter().sum::<f64>() / values.len() as f64
}
