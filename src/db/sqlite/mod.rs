mod common;
mod groups;
mod transaction;
mod users;

pub use groups::SqliteGroupRepo;
pub use transaction::SqlitePatchTransaction;
pub use users::SqliteUserRepo;
