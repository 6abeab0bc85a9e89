//! Single-board issue tracking back-end.
//!
//! ## Overview
//!
//! The board subsystem is the whole product: issues are created against a
//! fixed workflow (backlog → sprint → in_progress → done → released),
//! partitioned into one of two kanban views, and mutated through direct
//! status writes. Persistence is a thin libsql client over a local or
//! hosted SQL database; every mutation is a remote write whose returned
//! row the client reconciles against.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌─────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)     │
//! │  (UI)    │ <─────── │    └─ api.rs  (route handlers, AppState)    │
//! └──────────┘ WebSocket│         │                                   │
//!                       │         │ models.rs (filter + partition)    │
//!                       │         │ keys.rs   (next_issue_key)        │
//!                       │         v                                   │
//!                       │  db.rs  (BoardDb over libsql)               │
//!                       └─────────────────────────────────────────────┘
//! ```
//!
//! | Module   | Responsibility                                          |
//! |----------|---------------------------------------------------------|
//! | `models` | `Issue`, status/type/priority enums, board views        |
//! | `keys`   | sequential `APP-0001`-style key derivation              |
//! | `db`     | `issues` table CRUD through the libsql client           |
//! | `api`    | route handlers, payload parsing, error envelope         |
//! | `server` | router assembly, listener, graceful shutdown            |
//! | `ws`     | `WsMessage` enum + `broadcast_message()` helper         |

pub mod api;
pub mod db;
pub mod keys;
pub mod models;
pub mod server;
pub mod ws;
