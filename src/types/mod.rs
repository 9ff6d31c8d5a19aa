mod models;
mod record;
mod table;

pub use models::*;
pub use record::*;
pub use table::RecordTable;
