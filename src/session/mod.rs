//! Session — token persistence, backend identity calls, and shared state.
//!
//! DESIGN
//! ======
//! Layered bottom-up: [`token_store`] persists the pair, [`client`] is the
//! only component that talks to the backend about identity, and [`context`]
//! publishes who is signed in. Requests leave the process through the
//! [`transport::Transport`] seam so tests can swap the backend out.

pub mod client;
pub mod context;
pub mod error;
pub mod token_store;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::SessionClient;
pub use context::{SessionContext, SessionSnapshot};
pub use error::{SessionError, StorageError};
pub use token_store::TokenStore;
pub use transport::Transport;
pub use types::{TokenPair, User};
