//! Plain-text HTTP/1.x front end for the Wormhole URL shortener.
//!
//! [`Server`] accepts connections, each served by a [`Connection`] that
//! reads one request, hands it to the [`Router`] and writes the reply.

pub mod connection;
pub mod decode;
pub mod error;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use connection::{Connection, ConnectionState};
pub use decode::percent_decode;
pub use error::GatewayError;
pub use request::Request;
pub use response::Response;
pub use router::{Route, Router};
pub use server::Server;
