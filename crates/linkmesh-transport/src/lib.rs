//! Transport-agnostic [`Connector`] (spec.md §4.3) plus two concrete
//! implementations: [`mock::MockConnector`] for tests and simulations, and
//! [`websocket::WebSocketConnector`] for the real thing.

mod error;
mod mock;
mod trait_def;
mod websocket;

pub use error::{TransportError, TransportResult};
pub use mock::{mock_pair, MockConnector};
pub use trait_def::Connector;
pub use websocket::WebSocketConnector;
