pub mod api;
pub mod config;
pub mod connection;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use api::{
    Credentials, HttpSessionApi, LoginOutcome, RegisterOutcome, Registration, SessionApi, Ticket,
    TicketOutcome,
};
pub use config::Config;
pub use connection::{Connection, ConnectionEvent, Connector, Peer, WsConnector};
pub use session::{spawn, Command, Session, SessionEvent, SessionHandle};
pub use state::{ChatLog, View};
