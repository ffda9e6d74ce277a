//! Generation history
//!
//! Records are written to a durable remote store when it is reachable and to
//! a per-device cache always; reads merge both views by record id.

pub mod local;
pub mod merge;
pub mod reconciler;
pub mod remote;
pub mod session;

pub use local::{FileCache, LocalCache, MemoryCache};
pub use merge::merge_records;
pub use reconciler::{DEFAULT_FETCH_LIMIT, FetchOptions, HistoryReconciler};
pub use remote::{DisabledStore, GenerationRow, RemoteStore, SupabaseStore};
pub use session::{HistoryContext, SessionIdentity};
