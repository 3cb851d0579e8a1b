//! # WebP Variants
//!
//! Batch converter that turns a directory of source photos into sets of
//! resized, recompressed WebP variants for responsive delivery: small
//! thumbnails, grid tiles and full-page images.
//!
//! # Architecture
//!
//! ```text
//! variants.toml ─→ config ─→ SizeConfiguration ─┐
//!                                               ▼
//! input/ ─→ scan ─→ [files] ─→ process::run_batch(backend) ─→ output/<Backend>/<category>/<width>/
//!                                    │
//!                              BatchEvent channel ─→ output (printer thread)
//! ```
//!
//! One run may use several backends; each one processes the whole input
//! directory into its own subtree, so results can be compared side by side.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sizes`] | `ImageSize` / `SizeConfiguration` data model and validation |
//! | [`layout`] | Deterministic output paths and idempotent writes |
//! | [`imaging`] | `ProcessingBackend` trait and the local-codec pipeline |
//! | [`remote`] | Kraken-style remote backends, shared HTTP client, retry |
//! | [`factory`] | `BackendKind` → `Backend` mapping |
//! | [`scan`] | Input discovery |
//! | [`process`] | Batch orchestrator: worker pool, outcome aggregation, progress events |
//! | [`config`] | `variants.toml` loading, validation, merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Closed Backend Set
//!
//! The four backends are variants of [`factory::Backend`], which implements
//! [`imaging::ProcessingBackend`] by dispatching to the variant it holds.
//! Tests substitute a mock for the trait; production code never needs a
//! trait object.
//!
//! ## Results, Not Panics, Across Workers
//!
//! `process` returns a `Result` per file. The orchestrator collects every
//! outcome after the pool drains and reports failures alongside successes,
//! so one corrupt input never takes the batch down with it.
//!
//! ## One Resize Policy
//!
//! Both local profiles resize only when the source is wider than the target
//! and never upscale. They differ in filters, sharpening, color adjustment
//! and whether high qualities switch to lossless, see
//! [`imaging::params`].
//!
//! ## Remote Bytes Are Final
//!
//! Remote backends never decode what the service returns; the downloaded
//! WebP is written byte for byte.

pub mod config;
pub mod factory;
pub mod imaging;
pub mod layout;
pub mod output;
pub mod process;
pub mod remote;
pub mod scan;
pub mod sizes;
