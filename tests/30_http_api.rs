mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{token_for, Fixture};
use xeetrack_rust::server::{app, AppState};

struct Api {
    router: Router,
}

impl Api {
    fn new(fx: &Fixture) -> Self {
        Self { router: app(AppState::new(fx.remote())) }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, value))
    }

    async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    async fn sign_in(&self, token: &str) -> Result<Value> {
        let (status, body) = self.send(Method::POST, "/auth/session", Some(token), None).await?;
        assert_eq!(status, StatusCode::OK, "sign-in failed: {}", body);
        Ok(body)
    }
}

#[tokio::test]
async fn public_routes_need_no_token() -> Result<()> {
    let fx = Fixture::new().await?;
    let api = Api::new(&fx);

    let (status, body) = api.send(Method::GET, "/", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = api.send(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["store"], "memory");
    Ok(())
}

#[tokio::test]
async fn api_requires_a_token_and_a_session() -> Result<()> {
    let fx = Fixture::new().await?;
    let api = Api::new(&fx);

    let (status, body) = api.send(Method::GET, "/api/data", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = api.get("/api/data", "not-a-jwt").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Valid token, but no session opened yet
    let token = token_for(&fx.manager);
    let (status, _) = api.get("/api/data", &token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let body = api.sign_in(&token).await?;
    assert_eq!(body["data"]["loading"], false);
    let (status, _) = api.get("/api/data", &token).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn project_lifecycle_over_http() -> Result<()> {
    let fx = Fixture::new().await?;
    let api = Api::new(&fx);
    let token = token_for(&fx.manager);
    api.sign_in(&token).await?;

    let (status, body) = api
        .send(
            Method::POST,
            "/api/projects",
            Some(&token),
            Some(json!({
                "title": "Site Redesign",
                "client_id": fx.client.id,
                "client_name": fx.client.name,
                "deadline": "2030-06-30",
                "assigned_employees": [fx.employee.id]
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let project_id = body["data"]["id"].as_str().expect("project id").to_string();

    let (status, body) = api.get(&format!("/api/projects/{}/stages", project_id), &token).await?;
    assert_eq!(status, StatusCode::OK);
    let stages = body["data"].as_array().expect("stages");
    assert_eq!(stages.len(), 5);
    assert_eq!(stages[0]["name"], "Planning");
    let stage_id = stages[0]["id"].as_str().expect("stage id").to_string();

    let (status, body) = api
        .send(Method::PUT, &format!("/api/stages/{}/progress", stage_id), Some(&token), Some(json!({ "progress": 150 })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = api
        .send(
            Method::PUT,
            &format!("/api/stages/{}/approval", stage_id),
            Some(&token),
            Some(json!({ "status": "approved", "comment": "great start" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = api.get(&format!("/api/projects/{}/tasks?stage_id={}", project_id, stage_id), &token).await?;
    assert_eq!(body["data"][0]["text"], "great start");

    let (status, _) = api
        .send(Method::PATCH, &format!("/api/projects/{}", project_id), Some(&token), Some(json!({ "status": "on_hold" })))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = api.get("/api/projects?status=on_hold&search=redesign", &token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    let (_, body) = api.get("/api/projects?status=active", &token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    let (_, body) = api.get("/api/workload", &token).await?;
    assert_eq!(body["data"][0]["project_count"], 1);

    let (status, _) = api.send(Method::DELETE, &format!("/api/projects/{}", project_id), Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = api.get("/api/data", &token).await?;
    assert_eq!(body["data"]["projects"], json!([]));
    assert_eq!(body["data"]["stages"], json!([]));
    Ok(())
}

#[tokio::test]
async fn downloads_are_counted_over_http() -> Result<()> {
    let fx = Fixture::new().await?;
    let api = Api::new(&fx);
    let token = token_for(&fx.manager);
    api.sign_in(&token).await?;

    let (_, body) = api
        .send(
            Method::POST,
            "/api/projects",
            Some(&token),
            Some(json!({ "title": "Print Run", "client_id": fx.client.id, "deadline": "2030-01-15" })),
        )
        .await?;
    let project_id = body["data"]["id"].as_str().expect("project id").to_string();

    let (status, body) = api
        .send(Method::POST, "/api/files", Some(&token), Some(serde_json::to_value(fx.new_file(project_id.parse()?, "proof.pdf"))?))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let file_id = body["data"][0]["id"].as_str().expect("file id").to_string();
    assert_eq!(body["data"][0]["uploader_name"], "Maya Manager");

    for _ in 0..2 {
        let (status, _) = api.send(Method::POST, &format!("/api/files/{}/download", file_id), Some(&token), None).await?;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = api.get(&format!("/api/downloads?file_id={}", file_id), &token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    let (_, body) = api.get("/api/data", &token).await?;
    assert_eq!(body["data"]["files"][0]["download_count"], 2);
    Ok(())
}

#[tokio::test]
async fn locked_pages_answer_423() -> Result<()> {
    let fx = Fixture::new().await?;
    let api = Api::new(&fx);
    let employee = token_for(&fx.employee);
    let client = token_for(&fx.client);
    api.sign_in(&employee).await?;
    api.sign_in(&client).await?;

    let (status, body) = api
        .send(
            Method::POST,
            "/api/brochures",
            Some(&employee),
            Some(json!({ "client_id": fx.client.id, "client_name": fx.client.name })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let brochure_id = body["data"]["id"].as_str().expect("brochure id").to_string();

    let (status, body) = api
        .send(
            Method::PUT,
            &format!("/api/brochures/{}/pages", brochure_id),
            Some(&employee),
            Some(json!({ "page_number": 1, "content": { "headline": "Spring" } })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let page_id = body["data"][0]["id"].as_str().expect("page id").to_string();

    let lock = format!("/api/pages/{}/lock", page_id);
    let (status, body) = api.send(Method::POST, &lock, Some(&employee), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_locked"], true);

    let (status, body) = api.send(Method::POST, &lock, Some(&client), None).await?;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["code"], "PAGE_LOCKED");
    assert!(body["message"].as_str().unwrap_or_default().contains("Eli Employee"));

    let (status, _) = api.send(Method::DELETE, &lock, Some(&employee), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = api.send(Method::POST, &lock, Some(&client), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = api
        .send(
            Method::POST,
            &format!("/api/pages/{}/comments", page_id),
            Some(&client),
            Some(json!({ "text": "Love the headline" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"][0]["author_role"], "client");
    Ok(())
}

#[tokio::test]
async fn employees_see_no_leads_and_sign_out_closes_the_session() -> Result<()> {
    let fx = Fixture::new().await?;
    let api = Api::new(&fx);
    let manager = token_for(&fx.manager);
    let employee = token_for(&fx.employee);
    api.sign_in(&manager).await?;

    let (status, body) = api
        .send(
            Method::POST,
            "/api/leads",
            Some(&manager),
            Some(json!({ "name": "Northwind", "contact_info": "ops@northwind.test", "estimated_amount": 9000 })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let body = api.sign_in(&employee).await?;
    assert_eq!(body["data"]["leads"], json!([]));
    assert_eq!(body["data"]["employees"], json!([]));

    let (status, body) = api.send(Method::DELETE, "/auth/session", Some(&manager), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["closed"], true);

    let (status, _) = api.get("/api/data", &manager).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The employee's session is untouched
    let (status, _) = api.get("/api/data", &employee).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
