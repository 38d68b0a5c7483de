//! Estuary imports content archives from social platforms into a
//! publishing system.
//!
//! Each platform is wrapped by an [`adapters::Adapter`] that authenticates,
//! enumerates available content as a [`manifest::ContentManifest`], and
//! fetches raw items. Raw items flow through a [`normalizer::Normalizer`]
//! that sanitizes markup, resolves timestamps, and extracts media,
//! engagement, and authorship into a [`normalizer::NormalizedItem`] ready
//! for publication.
//!
//! ```text
//! platform API ──> Adapter ──> ContentManifest
//!                     │
//!                     └──> raw item ──> Normalizer ──> NormalizedItem
//! ```

pub mod adapters;
pub mod app;
pub mod cli;
pub mod fetcher;
pub mod manifest;
pub mod normalizer;
pub mod schema;
pub mod store;
