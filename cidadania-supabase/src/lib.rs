pub mod config;
pub mod store;

pub use config::{SupabaseConfig, CONFIG_TEMPLATE as SUPABASE_CONFIG_TEMPLATE, PROVIDER_NAME};
pub use store::SupabaseStore;
