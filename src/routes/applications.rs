use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{AdminUser, AuthenticatedUser},
    error::{AppError, AppResult},
    extract::{ApiJson, ApiPath},
    models::{Application, ApplicationStatus, ApplicationView, NewApplication, User},
    notify::{self, NotifyError},
    routes::MessageResponse,
    schema::{applications, users},
    state::AppState,
};

const APPLICATION_NOT_FOUND: &str = "Заявка не найдена";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    pub client_address: String,
    pub client_full_name: String,
    pub client_phone: String,
    pub comment: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct ApplicationResponse {
    pub message: &'static str,
    pub application: ApplicationView,
}

pub async fn create_application(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiJson(payload): ApiJson<CreateApplicationRequest>,
) -> AppResult<(StatusCode, Json<ApplicationResponse>)> {
    let mut conn = state.db()?;

    // The role in the token is not enough: the account must still exist and
    // still be an agent.
    let agent: User = users::table
        .find(auth.user_id)
        .select(User::as_select())
        .first(&mut conn)
        .optional()?
        .filter(User::is_agent)
        .ok_or_else(AppError::access_denied)?;

    let client_address = payload.client_address.trim();
    let client_full_name = payload.client_full_name.trim();
    let client_phone = payload.client_phone.trim();
    if client_address.is_empty() || client_full_name.is_empty() || client_phone.is_empty() {
        return Err(AppError::bad_request(
            "Адрес, ФИО и телефон клиента обязательны",
        ));
    }

    let now = Utc::now().naive_utc();
    let new_application = NewApplication {
        client_address: client_address.to_string(),
        client_full_name: client_full_name.to_string(),
        client_phone: client_phone.to_string(),
        comment: payload
            .comment
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
        status: ApplicationStatus::New.as_str().to_string(),
        agent_id: agent.id,
        created_at: now,
        updated_at: now,
    };

    let application: Application = diesel::insert_into(applications::table)
        .values(&new_application)
        .returning(Application::as_returning())
        .get_result(&mut conn)?;
    drop(conn);

    tracing::info!(
        application_id = application.id,
        agent_id = agent.id,
        "created application"
    );

    let text = notify::new_application_message(&agent.full_name, &application);
    report_delivery(
        state.notifier.notify_admin(&text).await,
        "new_application",
        application.id,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApplicationResponse {
            message: "Заявка создана успешно",
            application: ApplicationView::from(&application),
        }),
    ))
}

pub async fn list_my_applications(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> AppResult<Json<Vec<ApplicationView>>> {
    let mut conn = state.db()?;
    let rows: Vec<Application> = applications::table
        .filter(applications::agent_id.eq(auth.user_id))
        .order((applications::created_at.desc(), applications::id.desc()))
        .select(Application::as_select())
        .load(&mut conn)?;

    Ok(Json(rows.iter().map(ApplicationView::from).collect()))
}

pub async fn list_all_applications(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<ApplicationView>>> {
    let mut conn = state.db()?;
    let rows: Vec<(Application, User)> = applications::table
        .inner_join(users::table)
        .order((applications::created_at.desc(), applications::id.desc()))
        .select((Application::as_select(), User::as_select()))
        .load(&mut conn)?;

    Ok(Json(
        rows.iter()
            .map(|(application, agent)| ApplicationView::with_agent(application, agent))
            .collect(),
    ))
}

pub async fn list_agent_applications(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(agent_id): ApiPath<i32>,
) -> AppResult<Json<Vec<ApplicationView>>> {
    let mut conn = state.db()?;
    let rows: Vec<(Application, User)> = applications::table
        .inner_join(users::table)
        .filter(applications::agent_id.eq(agent_id))
        .order((applications::created_at.desc(), applications::id.desc()))
        .select((Application::as_select(), User::as_select()))
        .load(&mut conn)?;

    Ok(Json(
        rows.iter()
            .map(|(application, agent)| ApplicationView::with_agent(application, agent))
            .collect(),
    ))
}

pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(application_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<UpdateStatusRequest>,
) -> AppResult<Json<ApplicationResponse>> {
    let status: ApplicationStatus = payload
        .status
        .as_deref()
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| AppError::bad_request("Неверный статус"))?;

    let mut conn = state.db()?;
    let updated = diesel::update(applications::table.find(application_id))
        .set((
            applications::status.eq(status.as_str()),
            applications::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

    if updated == 0 {
        return Err(AppError::not_found(APPLICATION_NOT_FOUND));
    }

    let (application, agent): (Application, User) = applications::table
        .inner_join(users::table)
        .filter(applications::id.eq(application_id))
        .select((Application::as_select(), User::as_select()))
        .first(&mut conn)?;
    drop(conn);

    tracing::info!(
        application_id,
        status = %status,
        changed_by = admin.user_id,
        "updated application status"
    );

    if let Some(chat_id) = agent.telegram_chat_id.as_deref() {
        let text = notify::status_changed_message(&application);
        report_delivery(
            state.notifier.send(chat_id, &text).await,
            "status_changed",
            application.id,
        );
    }

    Ok(Json(ApplicationResponse {
        message: "Статус обновлен",
        application: ApplicationView::with_agent(&application, &agent),
    }))
}

pub async fn delete_application(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(application_id): ApiPath<i32>,
) -> AppResult<Json<MessageResponse>> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(applications::table.find(application_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found(APPLICATION_NOT_FOUND));
    }

    tracing::info!(application_id, deleted_by = admin.user_id, "deleted application");
    Ok(Json(MessageResponse::new("Заявка удалена")))
}

/// Delivery failures never fail the request that triggered them.
fn report_delivery(result: Result<(), NotifyError>, event: &'static str, application_id: i32) {
    if let Err(err) = result {
        tracing::warn!(event, application_id, error = %err, "notification delivery failed");
    }
}
