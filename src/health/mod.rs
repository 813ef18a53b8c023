//! Connection health of the remote automation service.
//!
//! # Data Flow
//! ```text
//! check_connection()
//!     → status = Checking
//!     → credential provider (Error "configuration missing" if absent, no HTTP)
//!     → single probe GET through the request executor
//!     → Connected | Error(message)
//!     → report cached for a short window (tracker.rs)
//! ```
//!
//! # Design Decisions
//! - Checks are on demand; there is no background polling task
//! - Concurrent checks share one probe
//! - `Disconnected` means "never checked", not "known to be down"

pub mod state;
pub mod tracker;

pub use state::{ConnectionReport, ConnectionStatus};
pub use tracker::ConnectionTracker;
