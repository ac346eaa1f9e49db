use std::{fmt, fs, path::PathBuf};

use classlib_class_file::{ClassFileError, DecodeOptions};
use classlib_jimage::{Archive, JImageError};
use log::{debug, warn};
use rayon::prelude::*;

use crate::{Error, Result};

#[derive(Debug)]
pub enum Failure {
    Read(std::io::Error),
    Unavailable(JImageError),
    Decode(ClassFileError),
    Encode(ClassFileError),
    /// The first byte at which the encoded class differs, or the length of
    /// the shorter of the two when one is a prefix of the other.
    Mismatch { offset: usize, expected: usize, actual: usize },
}
impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Read(e) => write!(f, "cannot read: {e}"),
            Failure::Unavailable(e) => write!(f, "cannot extract: {e}"),
            Failure::Decode(e) => write!(f, "decode failed: {e}"),
            Failure::Encode(e) => write!(f, "encode failed: {e}"),
            Failure::Mismatch {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "re-encoded bytes differ at offset {offset} ({expected} bytes in, {actual} bytes out)"
            ),
        }
    }
}

/// Decodes `bytes` and checks that encoding the result gives them back.
pub fn round_trip(bytes: &[u8], options: DecodeOptions) -> Result<(), Failure> {
    let class_file =
        classlib_class_file::decode_with_options(bytes, options).map_err(Failure::Decode)?;
    let encoded = class_file.to_bytes().map_err(Failure::Encode)?;

    match first_difference(bytes, &encoded) {
        None => Ok(()),
        Some(offset) => Err(Failure::Mismatch {
            offset,
            expected: bytes.len(),
            actual: encoded.len(),
        }),
    }
}

fn first_difference(expected: &[u8], actual: &[u8]) -> Option<usize> {
    expected
        .iter()
        .zip(actual)
        .position(|(a, b)| a != b)
        .or_else(|| (expected.len() != actual.len()).then(|| expected.len().min(actual.len())))
}

#[derive(Debug, Default)]
pub struct Report {
    pub total: usize,
    pub failures: Vec<(String, Failure)>,
}
impl Report {
    fn collect(results: Vec<(String, Result<(), Failure>)>) -> Self {
        let total = results.len();
        let mut failures = results
            .into_iter()
            .filter_map(|(name, result)| result.err().map(|failure| (name, failure)))
            .collect::<Vec<_>>();
        failures.sort_by(|a, b| a.0.cmp(&b.0));

        Report { total, failures }
    }

    pub fn into_result(self) -> Result<()> {
        for (name, failure) in &self.failures {
            warn!("{name}: {failure}");
        }
        println!(
            "{} class files, {} round-tripped, {} failed",
            self.total,
            self.total - self.failures.len(),
            self.failures.len()
        );

        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(Error::RoundTripFailed {
                failed: self.failures.len(),
                total: self.total,
            })
        }
    }
}

pub fn verify_files(paths: &[PathBuf]) -> Report {
    let results = paths
        .par_iter()
        .map(|path| {
            let result = fs::read(path)
                .map_err(Failure::Read)
                .and_then(|bytes| round_trip(&bytes, DecodeOptions::strict()));
            (path.display().to_string(), result)
        })
        .collect();

    Report::collect(results)
}

/// Round-trips every class of `archive`, one class per rayon task.
pub fn verify_image(archive: &Archive<'_>, options: DecodeOptions) -> Report {
    let classes = archive.classes().collect::<Vec<_>>();
    debug!("Scanning {} classes", classes.len());

    let results = classes
        .par_iter()
        .map(|class| {
            let result = class
                .bytes()
                .map_err(Failure::Unavailable)
                .and_then(|bytes| round_trip(bytes, options));
            (class.full_name(), result)
        })
        .collect();

    Report::collect(results)
}
