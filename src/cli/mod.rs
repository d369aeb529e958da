pub mod assemble;
pub mod compile;
pub mod translate;

use std::path::Path;
use std::process;

/// Read an input file, or exit with a one-line error.
pub fn read_input(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

/// Write an output file, or exit with a one-line error.
pub fn write_output(path: &Path, contents: &str) {
    if let Err(e) = std::fs::write(path, contents) {
        eprintln!("error: cannot write '{}': {}", path.display(), e);
        process::exit(1);
    }
}
