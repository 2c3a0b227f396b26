//! Auth-domain identifiers, sessions, session tokens, and linked accounts.

pub mod account;
pub mod id;
pub mod session;
pub mod token;

pub use account::*;
pub use id::*;
pub use session::*;
pub use token::*;
