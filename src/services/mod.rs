//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the lobby's business rules so route handlers can
//! stay focused on protocol translation. Services talk to persistence only
//! through the `Store` / `UserDirectory` traits on `AppState`, and to live
//! connections only through the registry and fanout.

pub mod auth;
pub mod caro;
pub mod chat;
pub mod fanout;
pub mod friends;
pub mod game;
pub mod notification;
pub mod presence;
pub mod registry;
