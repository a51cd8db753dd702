//! Configuration values resolved by the builder itself.

use autobuild_core::ConfigLookup;
use tracing::debug;

use crate::make::{Invocation, Make};

/// Asks the builder for a variable with `make -s get-var GET_VAR=<NAME>`.
///
/// This sees everything the builder configuration defines, including values
/// derived from other variables. Unknown variables and builder errors read as
/// unset.
#[derive(Debug, Clone)]
pub struct BuilderVarLookup {
    make: Make,
}

impl BuilderVarLookup {
    pub fn new(make: Make) -> Self {
        Self { make }
    }
}

impl ConfigLookup for BuilderVarLookup {
    fn get(&self, name: &str) -> Option<String> {
        let inv = Invocation::new("get-var").var("GET_VAR", name).silent();
        match self.make.capture_blocking(&inv) {
            Ok(out) => Some(out.trim_end_matches('\n').to_string()),
            Err(e) => {
                debug!(name = %name, error = %e, "builder variable lookup failed");
                None
            }
        }
    }
}
