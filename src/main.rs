//! gapcheck CLI binary.
//!
//! Minimal entrypoint; all logic is in the library. `cli::run()` handles
//! all output including errors and main only maps to the process exit code.

fn main() {
    if let Err(code) = gapcheck::cli::run() {
        std::process::exit(code);
    }
}
