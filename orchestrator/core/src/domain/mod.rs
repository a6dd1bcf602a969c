// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! Domain
//!
//! Pure types and policies of the workflow-assembly core.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Agents, tickets, roles, contracts, selection and provenance

pub mod agent;
pub mod config;
pub mod contract;
pub mod events;
pub mod fraud;
pub mod provenance;
pub mod regulation;
pub mod repository;
pub mod role;
pub mod selection;
pub mod ticket;
pub mod trust;
