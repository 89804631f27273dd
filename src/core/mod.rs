//! # Core Application Logic
//!
//! Astro's business logic. It knows nothing about any specific UI technology
//! and only talks to the network through the `Transport` trait.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • ChatSession          │
//!                    │  • MessageLog           │
//!                    │  • payload normalizing  │
//!                    │                         │
//!                    │  No rendering.          │
//!                    └───────────┬─────────────┘
//!                                │
//!                   ┌────────────┴────────────┐
//!                   ▼                         ▼
//!            ┌────────────┐            ┌────────────┐
//!            │    TUI     │            │ Transport  │
//!            │  Adapter   │            │ (socket.io)│
//!            │ (ratatui)  │            │            │
//!            └────────────┘            └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`session`]: `ChatSession`, the only thing that mutates the log
//! - [`message_log`]: `MessageLog`, the ordered message list
//! - [`message`]: `Message` and `Sender`
//! - [`payload`]: inbound payload → display text
//! - [`config`]: settings resolution

pub mod config;
pub mod message_log;
pub mod message;
pub mod payload;
pub mod session;
