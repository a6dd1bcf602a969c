// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Fellowship Core
//!
//! Assembles a repair ticket's workflow from independent service agents and
//! records it as a signed, auditable provenance graph.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Agent selection, data-sharing contracts, hop signing, audit

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
