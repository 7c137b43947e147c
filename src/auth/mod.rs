//! # Auth Module
//!
//! This module handles the OAuth token lifecycle:
//! - interactive (popup) and silent (hidden-frame) implicit-grant sign-in
//! - redirect-fragment parsing and session persistence
//! - the cross-context "auth finished" signal
//! - durable token storage and session teardown

pub mod flow;
pub mod models;
pub mod token_store;


pub use flow::{restore_session, AuthError, AuthFinished, AuthFlow, SignInDriver};
pub use models::AuthSession;
pub use token_store::TokenStore;
