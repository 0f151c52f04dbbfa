pub mod connection;
pub mod error;
pub mod rest;
pub mod socket;

pub use connection::{ConnectionState, GameConnection};
pub use error::{ClientError, Result};
pub use rest::{ApiRequest, HttpTransport, Method, RequestEncryptor, ReqwestTransport, RestClient};
pub use socket::{Inbound, Outbound, SocketChannels};
