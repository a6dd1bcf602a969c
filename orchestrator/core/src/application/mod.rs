// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

pub mod audit;
pub mod feedback;
pub mod planner;
pub mod provenance_builder;
pub mod receipt;
pub mod registration;

pub use audit::{AuditReport, AuditService};
pub use feedback::{FeedbackError, TrustFeedbackService};
pub use planner::{PlanPreview, Planner};
pub use provenance_builder::{BuildError, ProvenanceGraphBuilder};
pub use receipt::{Receipt, ReceiptService};
pub use registration::AgentRegistrationService;
