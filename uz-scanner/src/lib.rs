//! Automated seat scanning and booking for the UZ online booking site.
//!
//! The site exposes no public API: the [`booking`] client masquerades as
//! a browser, recovers its short-lived `gv-token` credential from a
//! jjencode-obfuscated script fragment ([`jjdecode`]), and drives the
//! multi-step booking pipeline (station → train → coach → seat → cart).
//! The [`scanner`] retries that pipeline for a dynamic set of watch jobs
//! until a seat is secured or the job is cancelled.

pub mod booking;
pub mod domain;
pub mod jjdecode;
pub mod notify;
pub mod scanner;
