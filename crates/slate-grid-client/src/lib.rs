mod error;
mod mirror;
mod transport;

pub use error::ClientError;
pub use mirror::{GridMirror, UPDATE_EVENT};
pub use transport::{Transport, UreqTransport};
