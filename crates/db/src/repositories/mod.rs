//! Repository structs, one per table family.
//!
//! Repositories are zero-sized; every function takes `&PgPool` first.

pub mod alert_repo;
pub mod driver_repo;
pub mod ledger_repo;
pub mod truck_repo;
pub mod user_repo;

pub use alert_repo::{AlertRepo, RollForwardError};
pub use driver_repo::DriverRepo;
pub use ledger_repo::LedgerRepo;
pub use truck_repo::TruckRepo;
pub use user_repo::UserRepo;
