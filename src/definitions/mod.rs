//! Virus definition bookkeeping.
//!
//! Two small files describe the state of the engine's definitions: the
//! license, whose `UpdateValidThru` entry bounds how long updates are
//! allowed, and the `UPDATED` marker written by `avbridge update`.

mod license;
mod updated;

pub use license::{LicenseChecker, DEFAULT_LICENSE_PATH};
pub use updated::{UpdatedMarker, BUILD_DATE, DEFAULT_UPDATED_PATH};
