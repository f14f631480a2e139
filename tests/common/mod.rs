#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use xeetrack_rust::auth::{generate_jwt, Claims, Identity};
use xeetrack_rust::database::models::{NewFile, NewProject, Role};
use xeetrack_rust::database::{MemoryStore, RemoteStore};
use xeetrack_rust::session::DataSession;
use xeetrack_rust::types::Table;

/// One user of each role, seeded into a fresh in-memory store.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub manager: Identity,
    pub employee: Identity,
    pub client: Identity,
}

impl Fixture {
    pub async fn new() -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let manager = Identity::new(Uuid::new_v4(), "Maya Manager", Role::Manager);
        let employee = Identity::new(Uuid::new_v4(), "Eli Employee", Role::Employee);
        let client = Identity::new(Uuid::new_v4(), "Cora Client", Role::Client);

        for (identity, email) in [
            (&manager, "maya@xeetrack.test"),
            (&employee, "eli@xeetrack.test"),
            (&client, "cora@xeetrack.test"),
        ] {
            let row = json!({
                "id": identity.id,
                "name": identity.name,
                "email": email,
                "role": identity.role,
            });
            if let serde_json::Value::Object(row) = row {
                store.seed(Table::Users, vec![row]).await?;
            }
        }

        Ok(Self { store, manager, employee, client })
    }

    pub fn remote(&self) -> Arc<dyn RemoteStore> {
        self.store.clone()
    }

    /// Open a session for `identity` and load it
    pub async fn session(&self, identity: &Identity) -> Result<DataSession> {
        let session = DataSession::open(self.remote(), identity.clone());
        session.refresh_data().await?;
        Ok(session)
    }

    pub fn new_project(&self, title: &str) -> NewProject {
        let mut project = NewProject::new(title, self.client.id, deadline());
        project.client_name = self.client.name.clone();
        project
    }

    pub fn new_file(&self, project_id: Uuid, filename: &str) -> NewFile {
        NewFile {
            project_id,
            stage_id: None,
            filename: filename.to_string(),
            file_url: format!("https://files.xeetrack.test/{}", filename),
            size: 2048,
            file_type: "application/pdf".to_string(),
            category: None,
            description: None,
            tags: Vec::new(),
        }
    }
}

pub fn deadline() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 6, 30).expect("valid date")
}

/// Bearer token for `identity`, signed with the configured secret
pub fn token_for(identity: &Identity) -> String {
    generate_jwt(&Claims::new(identity)).expect("development config has a signing secret")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
        .with_test_writer()
        .try_init();
}
