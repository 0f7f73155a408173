pub mod backend;
pub mod connection;
pub mod postgres;

pub use backend::{Backend, BackendError};
pub use postgres::PgBackend;
