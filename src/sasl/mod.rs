//! Types related to SASL authentication which D-Bus performs.


pub use self::guid::Guid;
mod guid;

pub use self::response::SaslResponse;
mod response;

pub use self::mechanism::{Anonymous, AuthMechanism, CookieSha1, External, Mechanism};
mod mechanism;

pub use self::authenticator::{AuthStep, Authenticator};
mod authenticator;
