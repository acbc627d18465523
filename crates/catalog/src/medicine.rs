//! Medicine records and validation.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use medstock_core::{DomainResult, FieldErrors, MedicineId};

/// Description used when neither the caller nor the enrichment hook supplies one.
pub const DEFAULT_DESCRIPTION: &str = "Default description";

/// Hard cap on stored descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Wire sort fields accepted by the medicine list endpoint.
pub const MEDICINE_SORT_FIELDS: &[&str] = &["id", "name", "quantity", "type"];

/// Regulatory class of a medicine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MedicineType {
    #[serde(rename = "PRES")]
    Pres,
    #[serde(rename = "OTC")]
    Otc,
    #[serde(rename = "OTHER")]
    Other,
}

impl MedicineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MedicineType::Pres => "PRES",
            MedicineType::Otc => "OTC",
            MedicineType::Other => "OTHER",
        }
    }
}

impl core::fmt::Display for MedicineType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MedicineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRES" => Ok(MedicineType::Pres),
            "OTC" => Ok(MedicineType::Otc),
            "OTHER" => Ok(MedicineType::Other),
            other => Err(format!(
                "unknown type '{other}', expected one of: PRES, OTC, OTHER"
            )),
        }
    }
}

/// A catalog entry with its current on-hand quantity.
///
/// `quantity` is mutated only by the movement engine inside a store
/// transaction; the catalog paths never touch it after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    pub description: String,
    pub quantity: i64,
    #[serde(rename = "type")]
    pub kind: MedicineType,
}

/// A medicine awaiting its store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicineDraft {
    pub name: String,
    pub description: String,
    pub quantity: i64,
    pub kind: MedicineType,
}

impl MedicineDraft {
    /// Build a validated draft. Description defaults to [`DEFAULT_DESCRIPTION`],
    /// quantity to 0. All field violations are aggregated before returning.
    pub fn new(
        name: String,
        description: Option<String>,
        kind: MedicineType,
        quantity: Option<i64>,
    ) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();

        if name.trim().is_empty() {
            errors.push("name", "must not be blank");
        }

        let description = description.unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            errors.push(
                "description",
                format!("must not exceed {MAX_DESCRIPTION_LEN} characters"),
            );
        }

        let quantity = quantity.unwrap_or(0);
        if quantity < 0 {
            errors.push("quantity", "must not be negative");
        }

        errors.into_result()?;

        Ok(Self {
            name,
            description,
            quantity,
            kind,
        })
    }
}

/// Partial update for a medicine. Absent fields do not overwrite.
///
/// Renames and quantity changes are rejected: quantity is owned by the
/// movement engine, and renaming would break uniqueness semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MedicinePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<MedicineType>,
    pub quantity: Option<i64>,
}

impl Medicine {
    /// Apply a partial update in place.
    pub fn apply_patch(&mut self, patch: &MedicinePatch) -> DomainResult<()> {
        let mut errors = FieldErrors::new();

        if let Some(name) = &patch.name {
            if *name != self.name {
                errors.push("name", "medicine name cannot be changed");
            }
        }
        if patch.quantity.is_some() {
            errors.push("quantity", "quantity is adjusted through transactions only");
        }
        if let Some(description) = &patch.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                errors.push(
                    "description",
                    format!("must not exceed {MAX_DESCRIPTION_LEN} characters"),
                );
            }
        }

        errors.into_result()?;

        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }

        Ok(())
    }
}

/// Trim an enrichment result down to what the catalog will store.
pub fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_LEN).collect()
}
