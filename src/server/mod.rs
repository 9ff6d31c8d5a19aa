mod auth;
mod caller;
pub mod dto;
mod photos;
mod records;
pub mod response;
mod router;
mod storage;

pub use caller::Caller;
pub use router::{AppState, create_router};
