//! Shared helpers used by the binaries: tracing initialisation.

pub mod utils {
    pub mod logging;
}
