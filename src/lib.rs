pub mod config;
mod codec;
mod connection;
mod error;
mod id;
mod messages;
mod realm;
pub mod router;
pub mod server;
mod session;
mod transport;

pub use config::RouterConfig;
pub use error::{DecodeError, RouterError, TransportError};
pub use messages::{Dict, List, Message, Reason, URI};

pub type ID = u64;
