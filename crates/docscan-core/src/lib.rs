// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan — Core types, geometry and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod guidance;
pub mod types;

pub use config::ScannerConfig;
pub use error::ScanError;
pub use events::ScannerEvent;
pub use geometry::{Point, Quadrilateral};
pub use types::*;
