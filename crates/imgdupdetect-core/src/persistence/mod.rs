mod db;
mod error;
mod models;

pub use db::ContentStore;
pub use error::{PersistenceError, PersistenceResult};
pub use models::{FieldRecord, MemberRecord};
