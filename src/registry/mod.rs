//! Subscriber connection registry
//!
//! Bookkeeping for the connections eligible to receive broadcasts. The
//! registry owns each subscriber's write half from successful accept until
//! confirmed disconnect or coordinated shutdown; read halves live with the
//! per-connection monitor tasks.
//!
//! ```text
//!                    Arc<ConnectionRegistry>
//!                 ┌──────────────────────────┐
//!                 │ Mutex<Vec<Subscriber>>   │
//!                 │   bounded, ordered       │
//!                 └──────┬───────────┬───────┘
//!        add / remove    │           │ send_to_all
//!    (monitor tasks) ────┘           └──── (broadcaster)
//! ```
//!
//! Fan-out holds the registry lock for the whole iteration, so a broadcast
//! serializes against connect/disconnect churn. That trade-off favors
//! broadcast correctness over connection latency and is accepted by design.

pub mod entry;
pub mod store;

pub use entry::Subscriber;
pub use store::{BroadcastReport, ConnectionRegistry};
