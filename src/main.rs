mod dump;
mod verify;

use std::{env, fs::File, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use classlib_class_file::{ClassFileError, DecodeOptions};
use classlib_jimage::{Archive, JImageError};
use log::error;
use memmap::Mmap;
use thiserror::Error;

#[derive(Debug, Error)]
enum Error {
    #[error("{0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error(transparent)]
    ClassFile(#[from] ClassFileError),
    #[error(transparent)]
    JImage(#[from] JImageError),
    #[error("No module image given and JAVA_HOME is not set")]
    NoModuleImage,
    #[error("{failed} of {total} class files did not survive a round trip")]
    RoundTripFailed { failed: usize, total: usize },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// Inspect JVM class files and check that they encode back to the same bytes.
#[derive(Debug, Parser)]
#[command(name = "classlib", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the structure of a class file.
    Dump {
        #[arg(value_name = "CLASS")]
        path: PathBuf,

        /// Keep what can be decoded from truncated or malformed input.
        #[arg(long)]
        tolerant: bool,

        /// Log every decoded structure with its offset (needs RUST_LOG=trace).
        #[arg(long)]
        trace: bool,
    },

    /// Decode and re-encode class files, reporting any byte difference.
    Verify {
        #[arg(value_name = "CLASS", required = true)]
        paths: Vec<PathBuf>,
    },

    /// Round-trip every class of a JDK module image.
    ScanJdk {
        /// Module image to scan, `$JAVA_HOME/lib/modules` by default.
        #[arg(long, value_name = "PATH")]
        modules: Option<PathBuf>,

        #[arg(long)]
        tolerant: bool,
    },
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Dump {
            path,
            tolerant,
            trace,
        } => {
            let bytes = std::fs::read(&path).map_err(|e| Error::Io(path.clone(), e))?;
            let options = DecodeOptions {
                tolerant,
                trace,
            };
            let class_file = classlib_class_file::decode_with_options(&bytes[..], options)?;
            print!("{}", dump::ClassFileDump(&class_file));
            Ok(())
        }
        Command::Verify { paths } => {
            let report = verify::verify_files(&paths);
            report.into_result()
        }
        Command::ScanJdk { modules, tolerant } => {
            let path = match modules {
                Some(path) => path,
                None => env::var_os("JAVA_HOME")
                    .map(|home| PathBuf::from(home).join("lib/modules"))
                    .ok_or(Error::NoModuleImage)?,
            };
            let file = File::open(&path).map_err(|e| Error::Io(path.clone(), e))?;
            // The image must not change while it is mapped.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::Io(path.clone(), e))?;
            let archive = Archive::parse(&mmap)?;

            let options = if tolerant {
                DecodeOptions::tolerant()
            } else {
                DecodeOptions::strict()
            };
            let report = verify::verify_image(&archive, options);
            report.into_result()
        }
    }
}
