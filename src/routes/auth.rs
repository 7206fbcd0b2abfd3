use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{password, AdminUser, AuthenticatedUser},
    error::{AppError, AppResult},
    extract::{ApiJson, ApiPath},
    models::{AgentSummary, NewUser, PublicUser, Role, User},
    routes::MessageResponse,
    schema::{applications, users},
    state::AppState,
};

const USER_NOT_FOUND: &str = "Пользователь не найден";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
    pub user: PublicUser,
}

/// Chat ids arrive as strings from forms and as numbers from bot payloads.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ChatIdInput {
    Text(String),
    Number(i64),
}

impl ChatIdInput {
    fn into_value(self) -> Option<String> {
        match self {
            ChatIdInput::Text(value) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            ChatIdInput::Number(value) => Some(value.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTelegramRequest {
    pub chat_id: Option<ChatIdInput>,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let username = payload.username.trim();
    let full_name = payload.full_name.trim();
    if username.is_empty() || payload.password.is_empty() || full_name.is_empty() {
        return Err(AppError::bad_request(
            "Имя пользователя, пароль и ФИО обязательны",
        ));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let new_user = NewUser {
        username: username.to_string(),
        password_hash,
        full_name: full_name.to_string(),
        role: Role::Agent.as_str().to_string(),
        created_at: Utc::now().naive_utc(),
    };

    let mut conn = state.db()?;
    let user = match diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(&mut conn)
    {
        Ok(user) => user,
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::conflict("Пользователь уже существует"));
        }
        Err(err) => return Err(AppError::from(err)),
    };

    let token = state.jwt.generate_token(user.id, &user.role)?;
    tracing::info!(user_id = user.id, username = %user.username, "registered agent");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Агент успешно зарегистрирован",
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let mut conn = state.db()?;

    let user: User = users::table
        .filter(users::username.eq(payload.username.trim()))
        .select(User::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::invalid_credentials)?;

    let valid = password::verify_password(&payload.password, &user.password_hash)
        .unwrap_or_else(|err| {
            tracing::warn!(user_id = user.id, error = %err, "stored password hash is unreadable");
            false
        });

    if !valid {
        return Err(AppError::invalid_credentials());
    }

    let token = state.jwt.generate_token(user.id, &user.role)?;

    Ok(Json(AuthResponse {
        message: "Успешный вход",
        token,
        user: PublicUser::from(&user),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> AppResult<Json<PublicUser>> {
    let mut conn = state.db()?;
    let user: User = users::table
        .find(auth.user_id)
        .select(User::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

    Ok(Json(PublicUser::from(&user)))
}

pub async fn set_telegram(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiJson(payload): ApiJson<SetTelegramRequest>,
) -> AppResult<Json<MessageResponse>> {
    let chat_id = payload
        .chat_id
        .and_then(ChatIdInput::into_value)
        .ok_or_else(|| AppError::bad_request("Нет данных"))?;

    let mut conn = state.db()?;
    let updated = diesel::update(users::table.find(auth.user_id))
        .set(users::telegram_chat_id.eq(&chat_id))
        .execute(&mut conn)?;

    if updated == 0 {
        return Err(AppError::not_found(USER_NOT_FOUND));
    }

    tracing::info!(user_id = auth.user_id, "stored messaging channel");
    Ok(Json(MessageResponse::new("Telegram chat_id сохранён")))
}

pub async fn list_agents(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<AgentSummary>>> {
    let mut conn = state.db()?;
    let agents: Vec<User> = users::table
        .filter(users::role.eq(Role::Agent.as_str()))
        .order(users::id.asc())
        .select(User::as_select())
        .load(&mut conn)?;

    Ok(Json(agents.iter().map(AgentSummary::from).collect()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(user_id): ApiPath<i32>,
) -> AppResult<Json<MessageResponse>> {
    let mut conn = state.db()?;
    let user: User = users::table
        .find(user_id)
        .select(User::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

    if user.is_admin() {
        return Err(AppError::forbidden("Нельзя удалить администратора"));
    }

    let removed_applications = conn.transaction::<_, DieselError, _>(|conn| {
        let removed = diesel::delete(applications::table.filter(applications::agent_id.eq(user.id)))
            .execute(conn)?;
        diesel::delete(users::table.find(user.id)).execute(conn)?;
        Ok(removed)
    })?;

    tracing::info!(
        user_id = user.id,
        deleted_by = admin.user_id,
        removed_applications,
        "deleted user"
    );
    Ok(Json(MessageResponse::new("Пользователь удалён")))
}
