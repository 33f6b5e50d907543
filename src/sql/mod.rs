//! Safe SQL builder: identifiers from validated config only, values as parameters.

mod builder;
pub mod globals;
pub mod params;
pub mod versions;
pub use builder::*;
pub use params::*;
