use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Patch;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub contact_info: String,
    pub estimated_amount: f64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub contact_info: String,
    pub estimated_amount: f64,
    #[serde(default)]
    pub notes: String,
}

impl NewLead {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_string());
        }
        if !self.estimated_amount.is_finite() || self.estimated_amount < 0.0 {
            return Err("estimated_amount must be a non-negative number".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Patch for LeadPatch {
    fn validate(&self) -> Result<(), String> {
        match self.estimated_amount {
            Some(amount) if !amount.is_finite() || amount < 0.0 => {
                Err("estimated_amount must be a non-negative number".to_string())
            }
            _ => Ok(()),
        }
    }
}
