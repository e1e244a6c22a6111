/// Database layer for Folio
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool setup and health probe
/// - `transaction`: Transaction coordination and the `UnitOfWork` guard
///
/// Store implementations are in the `store` module at crate root level.
///
/// # Example
///
/// ```no_run
/// use folio_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     Ok(())
/// }
/// ```

pub mod pool;
pub mod transaction;

pub use transaction::{TransactionCoordinator, UnitOfWork};
