//! Build automation for universal static libraries.
//!
//! ## Overview
//!
//! A run has three stages:
//!
//! 1. **Clean** - The output directory is wiped and recreated
//! 2. **Build** - `xcodebuild ... clean build` once per {configuration × SDK}
//! 3. **Merge** - `lipo -create` once per configuration
//!
//! ## Output Layout
//!
//! ```text
//! <output_dir>/
//! ├── Debug-iphoneos/libFoo.a          # written by xcodebuild
//! ├── Debug-iphonesimulator/libFoo.a   # written by xcodebuild
//! └── Debug-universal/libFoo.a         # written by lipo
//! ```
//!
//! ## Dry Run
//!
//! With `dry_run` set, every command is planned and logged exactly as it would be
//! issued, but no process runs and the filesystem is left untouched.
//!
//! ## Example
//!
//! ```ignore
//! use unibuild_sdk::builders::UniversalBuilder;
//! use unibuild_sdk::BuildOptions;
//!
//! let request = BuildOptions {
//!     target: Some("Foo".into()),
//!     configurations: vec!["Release".into()],
//!     sdks: vec!["iphoneos".into(), "iphonesimulator".into()],
//!     dry_run: true,
//!     ..BuildOptions::default()
//! }
//! .into_request()?;
//!
//! UniversalBuilder::new(&request).execute()?;
//! ```

pub mod common;
pub mod lipo;
pub mod xcode;

pub use common::{ProcessOutput, ProcessRunner, SystemRunner, ToolCommand};
pub use lipo::lipo_command;
pub use xcode::{BuildCommand, UniversalBuilder, UniversalProduct};
