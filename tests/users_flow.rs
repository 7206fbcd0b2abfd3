mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{body_to_vec, error_message, json_body, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn agents_listing_hides_credentials() -> Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await?;
    app.register_token("sam", "pw", "Sam").await?;
    app.register_token("tess", "pw", "Tess").await?;

    let response = app.get("/api/auth/agents", Some(&admin)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let raw = body_to_vec(response.into_body()).await?;
    let text = String::from_utf8(raw)?;
    assert!(!text.contains("argon2"));
    assert!(!text.to_lowercase().contains("password"));

    let agents: Vec<Value> = serde_json::from_str(&text)?;
    let usernames: Vec<&str> = agents
        .iter()
        .filter_map(|agent| agent["username"].as_str())
        .collect();
    assert_eq!(usernames, vec!["sam", "tess"]);
    assert!(agents.iter().all(|agent| agent["role"] == "agent"));
    assert!(agents.iter().all(|agent| agent.get("createdAt").is_some()));
    Ok(())
}

#[tokio::test]
async fn deleting_agent_cascades_to_applications() -> Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await?;
    let agent = app.register_token("uma", "pw", "Uma").await?;
    let agent_id = app.state.jwt.verify_token(&agent)?.sub;

    let response = app
        .post_json(
            "/api/applications",
            &json!({ "clientAddress": "1 Main St", "clientFullName": "Bob", "clientPhone": "1" }),
            Some(&agent),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = json_body(response).await?;
    let application_id = created["application"]["id"]
        .as_i64()
        .expect("application id") as i32;

    let response = app
        .delete(&format!("/api/auth/{agent_id}"), Some(&admin))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(error_message(response).await?, "Пользователь удалён");

    assert!(app.stored_user(agent_id).await?.is_none());
    assert!(app.stored_application(application_id).await?.is_none());

    let all: Vec<Value> = json_body(app.get("/api/applications/all", Some(&admin)).await?).await?;
    assert!(all.is_empty());
    Ok(())
}

#[tokio::test]
async fn admins_cannot_be_deleted_even_by_admins() -> Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await?;
    let second_admin = app
        .insert_user("deputy", "pw", "Deputy", "admin")
        .await?;
    let own_id = app.state.jwt.verify_token(&admin)?.sub;

    for target in [second_admin, own_id] {
        let response = app
            .delete(&format!("/api/auth/{target}"), Some(&admin))
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(error_message(response).await?, "Нельзя удалить администратора");
        assert!(app.stored_user(target).await?.is_some());
    }
    Ok(())
}

#[tokio::test]
async fn deleting_missing_user_is_not_found() -> Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await?;

    let response = app.delete("/api/auth/31337", Some(&admin)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await?, "Пользователь не найден");
    Ok(())
}

#[tokio::test]
async fn unauthenticated_delete_is_unauthorized_before_forbidden() -> Result<()> {
    let app = TestApp::new().await?;
    let target = app.insert_user("vic", "pw", "Vic", "agent").await?;

    let response = app.delete(&format!("/api/auth/{target}"), None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.stored_user(target).await?.is_some());
    Ok(())
}
