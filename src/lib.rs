pub mod chess;
pub mod cli;
pub mod messages;
pub mod models;
pub mod network;
pub mod pagination;
pub mod session;
pub mod storage;

// Re-export key types for easy testing
pub use messages::{ApiError, DecodeError, FromWire, ToWire};
pub use network::{ClientError, ConnectionState, GameConnection, RestClient};
pub use pagination::{Paginator, PaginatorBuilder};
pub use session::{Session, SessionIdentity};
