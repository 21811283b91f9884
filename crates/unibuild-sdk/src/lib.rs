//! Universal static library builder
//!
//! `unibuild-sdk` drives `xcodebuild` once per {build configuration × SDK} and merges
//! the resulting single-platform static libraries into one universal archive per
//! configuration with `lipo`.
//!
//! # Architecture
//!
//! - **Types**: [`BuildOptions`] is validated once into an immutable [`BuildRequest`]
//! - **Builders**: [`builders::UniversalBuilder`] runs the clean/build/merge plan
//!   through a [`builders::ProcessRunner`]
//!
//! # Example
//!
//! ```no_run
//! use unibuild_sdk::BuildOptions;
//! use unibuild_sdk::builders::UniversalBuilder;
//!
//! fn main() -> Result<(), unibuild_sdk::BuildError> {
//!     let request = BuildOptions {
//!         target: Some("Foo".to_string()),
//!         configurations: vec!["Debug".to_string(), "Release".to_string()],
//!         sdks: vec!["iphoneos".to_string(), "iphonesimulator".to_string()],
//!         ..BuildOptions::default()
//!     }
//!     .into_request()?;
//!
//!     let products = UniversalBuilder::new(&request).execute()?;
//!     println!("Merged {} archives", products.len());
//!     Ok(())
//! }
//! ```

pub mod builders;
pub mod types;

pub use types::{
    BuildError, BuildOptions, BuildRequest, DEFAULT_LIPO, DEFAULT_XCODEBUILD, PlatformFamily,
    TargetSelector,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
