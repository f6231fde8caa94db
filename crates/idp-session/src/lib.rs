//! # idp-session
//!
//! Browser sessions and the SSO state machine.
//!
//! A session holds at most one authenticated identity and at most one
//! pending SSO request. [`SessionStateMachine`] moves it between those
//! shapes for the `/sso` and `/login` endpoints; storage sits behind the
//! [`SessionStore`] trait.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod machine;
pub mod state;
pub mod store;

pub use error::{FlowError, FlowResult, SessionError, SessionResult};
pub use machine::{LoginOutcome, SessionStateMachine, SsoOutcome};
pub use state::{PendingRequest, SessionId, SessionState};
pub use store::{InMemorySessionStore, SessionStore};
