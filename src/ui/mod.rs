//! # UI Module
//!
//! Styling shared by the sidebar and dashboard views in `app`.

pub mod styles;
