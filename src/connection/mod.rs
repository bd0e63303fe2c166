
use self::transport::Transport;
mod transport;

pub use self::builder::ConnectionBuilder;
mod builder;

pub use self::pending::PendingCall;
mod pending;

pub use self::connection::{Connection, ConnectionState, SignalHandlerId};
mod connection;
