//! doorman: a standalone authentication and session lifecycle service.
//!
//! Credential verification, short/long-lived token issuance with single-use
//! refresh rotation, access-token revocation, multi-device session tracking,
//! and the email-verification / password-reset token state machines. The
//! relational store and the mail dispatcher are the only external
//! collaborators.

pub mod app;
pub mod auth;
pub mod cleanup;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod mail;
pub mod migrations;
pub mod models;
pub mod openapi;
pub mod response;
pub mod testing;

pub use app::App;
pub use config::Config;
pub use error::AuthError;
pub use logging::init_logging;
pub use mail::{LogMailer, Mailer};
pub use response::ApiResponse;
pub use testing::{TestApp, TestClient, TestResponse};
