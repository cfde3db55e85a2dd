/// Adapters every compiler starts with.
pub const SQL_ADAPTER: &str = "sql";
pub const POSTGRES_ADAPTER: &str = "postgres";
pub const DOCUMENT_ADAPTER: &str = "document";
