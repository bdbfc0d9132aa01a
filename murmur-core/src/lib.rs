pub mod error;
pub mod state;
pub mod telemetry;
pub mod types;

// Keep the public surface small and intentional.
pub use error::*;
pub use state::*;
pub use telemetry::*;
pub use types::*;
