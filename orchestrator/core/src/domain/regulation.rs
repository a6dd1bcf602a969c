// Copyright (c) 2026 Fellowship of the Cogs
// SPDX-License-Identifier: AGPL-3.0

//! # Regulation Resolver
//!
//! Maps a free-text location to the data-protection regulations that apply
//! there, and each regulation to the ticket fields it permits a hop to see.
//!
//! Matching is a case-insensitive substring test against a fixed jurisdiction
//! table, so "Munich, Germany" resolves to GDPR and a location naming two
//! jurisdictions resolves to the union of both.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Regulation {
    #[serde(rename = "GDPR")]
    Gdpr,
    #[serde(rename = "PDPB")]
    Pdpb,
    #[serde(rename = "LGPD")]
    Lgpd,
    #[serde(rename = "CCPA")]
    Ccpa,
}

impl Regulation {
    pub fn code(&self) -> &'static str {
        match self {
            Regulation::Gdpr => "GDPR",
            Regulation::Pdpb => "PDPB",
            Regulation::Lgpd => "LGPD",
            Regulation::Ccpa => "CCPA",
        }
    }

    /// Ticket fields a hop governed by this regulation may receive.
    pub fn permitted_fields(&self) -> &'static [&'static str] {
        match self {
            Regulation::Gdpr => &["device_model", "issue_description", "postal_code"],
            Regulation::Pdpb => &["device_model", "issue_description", "city", "phone"],
            Regulation::Lgpd => &["device_model", "issue_description", "state"],
            Regulation::Ccpa => &["device_model", "issue_description", "zip_code", "email"],
        }
    }
}

impl fmt::Display for Regulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Jurisdiction name (lowercase) to the regulation it falls under.
const JURISDICTIONS: &[(&str, Regulation)] = &[
    ("eu", Regulation::Gdpr),
    ("europe", Regulation::Gdpr),
    ("germany", Regulation::Gdpr),
    ("france", Regulation::Gdpr),
    ("spain", Regulation::Gdpr),
    ("italy", Regulation::Gdpr),
    ("netherlands", Regulation::Gdpr),
    ("ireland", Regulation::Gdpr),
    ("india", Regulation::Pdpb),
    ("brazil", Regulation::Lgpd),
    ("usa", Regulation::Ccpa),
    ("united states", Regulation::Ccpa),
    ("california", Regulation::Ccpa),
];

/// Fields permitted when no regulation applies to either party.
pub const UNREGULATED_FIELDS: &[&str] = &[
    "address",
    "device_model",
    "email",
    "issue_description",
    "name",
    "phone",
];

pub struct RegulationResolver;

impl RegulationResolver {
    pub fn resolve(location: &str) -> BTreeSet<Regulation> {
        let lowered = location.to_lowercase();
        JURISDICTIONS
            .iter()
            .filter(|(name, _)| lowered.contains(name))
            .map(|(_, regulation)| *regulation)
            .collect()
    }

    /// Union of the permitted fields of every regulation in `regulations`.
    pub fn permitted_fields<'a, I>(regulations: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a Regulation>,
    {
        regulations
            .into_iter()
            .flat_map(|r| r.permitted_fields().iter())
            .map(|f| f.to_string())
            .collect()
    }
}
