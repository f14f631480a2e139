use uuid::Uuid;

use crate::database::models::{LeadPatch, NewLead, Patch};
use crate::database::Changes;
use crate::types::Table;

use super::data_session::validation;
use super::{Collection, DataError, DataSession};

impl DataSession {
    pub async fn create_lead(&self, lead: NewLead) -> Result<(), DataError> {
        validation(lead.validate())?;
        let row = self.stamped(&lead, "created_by")?;
        self.store().insert(Table::Leads, vec![row]).await?;
        self.reload(&[Collection::Leads]).await
    }

    pub async fn update_lead(&self, id: Uuid, patch: LeadPatch) -> Result<(), DataError> {
        validation(patch.validate())?;
        let changes = Changes::set(patch.to_row()?);
        self.update_one(Table::Leads, "lead", id, changes).await?;
        self.reload(&[Collection::Leads]).await
    }

    pub async fn delete_lead(&self, id: Uuid) -> Result<(), DataError> {
        self.delete_one(Table::Leads, "lead", id).await?;
        self.reload(&[Collection::Leads]).await
    }
}
