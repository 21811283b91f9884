//! Binary entry point for `unibuild`. All logic lives in the library crate.

use std::process::ExitCode;

fn main() -> ExitCode {
    unibuild::run()
}
