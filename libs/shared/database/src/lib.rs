pub mod memory;
pub mod normalize;
pub mod store;
pub mod supabase;
pub mod supabase_store;

pub use memory::InMemoryStore;
pub use store::{BookingLedger, CapacitySource, ScheduleStore, StorageError};
pub use supabase_store::SupabaseStore;
