//! bks-mm-bot - Market-Making Bot Root Crate
//!
//! Thin root crate hosting the CLI binary. The actual engine lives in the
//! `bks-mm` workspace member; `hypersockets` supplies the WebSocket client.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **bks_mm**: Core engine logic (re-exported from workspace)
//! - **hypersockets**: WebSocket library (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use bks_mm_bot::bin_common::{load_config_from_env, ConfigType};
//! use bks_mm_bot::bks_mm::supervisor::Supervisor;
//! ```

// Re-export workspace libraries for convenience
pub use bks_mm;
pub use hypersockets;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables
    //!
    //! Provides shared functionality for the presentation layer (binaries).

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use runner::{BinaryRunner, RunConfig};
}
