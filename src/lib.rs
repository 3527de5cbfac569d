//! # Padron
//!
//! `padron` is the API backing the municipal registry of residents
//! ("personas") grouped by neighborhood association ("villa" / JJVV).
//!
//! Two roles exist: `ADMIN` manages villas, users and every persona;
//! `DIRIGENTE` is scoped to the personas of their own villa. Every mutating
//! request leaves a before/after snapshot in the `logs` table, and persona
//! creation is capped per villa by `cupo_maximo` (0 = unlimited).
//!
//! Authentication is a signed bearer token with a fixed 8-hour lifetime;
//! verification is offline (HMAC-SHA256), so request handling never hits the
//! database to resolve identity. Failed logins feed an in-process
//! brute-force guard that blocks an identifier after repeated failures
//! inside a sliding window.

pub mod api;
pub mod cli;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
