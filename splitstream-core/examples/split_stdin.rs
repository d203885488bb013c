//! Split stdin into objects and print one per line with its length.
//!
//! Usage: split_stdin [json|xml|ubjson] [start-depth]

use std::io::Write;
use std::process::ExitCode;

use splitstream_core::{Format, ReadSplitter, SplitterConfig};

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let format: Format = match args.next().as_deref().unwrap_or("json").parse() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let depth = args.next().and_then(|d| d.parse().ok()).unwrap_or(0);
    let config = SplitterConfig::new(format).with_start_depth(depth);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for object in ReadSplitter::new(std::io::stdin().lock(), config) {
        match object {
            Ok(object) => {
                let _ = write!(out, "{}\t", object.len());
                let _ = out.write_all(&object);
                let _ = out.write_all(b"\n");
            }
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
