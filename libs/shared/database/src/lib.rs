pub mod error;
pub mod relation;
pub mod supabase;

pub use error::DatabaseError;
pub use supabase::SupabaseClient;
