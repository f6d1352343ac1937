//! Pipeline stages for IWB extraction and PDF assembly.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! archive ──▶ manifest ──▶ transform ──▶ emit      (page_{i}.svg)
//!  (zip)      (pages)      (per page) └─▶ assemble  (one PDF)
//! ```
//!
//! 1. [`archive`]:   open the container, look up entries
//! 2. [`manifest`]:  split the manifest into one standalone SVG per page
//! 3. [`transform`]: background deletion, [`images`], fill removal and
//!    size correction ([`geometry`]) on one page
//! 4. [`emit`]:      write pages and copied assets atomically
//! 5. [`assemble`]:  render pages with a [`crate::engine::RenderEngine`]
//!    and merge them with `lopdf`
//!
//! [`markup`] is the shared element tree the stages operate on.

pub mod archive;
pub mod assemble;
pub mod emit;
pub mod geometry;
pub mod images;
pub mod manifest;
pub mod markup;
pub mod transform;
