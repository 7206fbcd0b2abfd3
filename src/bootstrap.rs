//! First-administrator provisioning, run out of band before the service is
//! opened to agents.

use anyhow::{ensure, Context, Result};
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::{
    auth::password,
    models::{NewUser, Role, User},
    schema::users,
};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_FULL_NAME: &str = "Администратор";

#[derive(Debug)]
pub enum BootstrapOutcome {
    Created(User),
    AlreadyPresent(User),
}

pub fn ensure_admin(
    conn: &mut SqliteConnection,
    username: &str,
    admin_password: &str,
    full_name: &str,
) -> Result<BootstrapOutcome> {
    let existing = users::table
        .filter(users::role.eq(Role::Admin.as_str()))
        .order(users::id.asc())
        .select(User::as_select())
        .first(conn)
        .optional()
        .context("failed to look up existing administrator")?;

    if let Some(admin) = existing {
        return Ok(BootstrapOutcome::AlreadyPresent(admin));
    }

    ensure!(!username.trim().is_empty(), "admin username must not be empty");
    ensure!(!admin_password.is_empty(), "admin password must not be empty");

    let new_admin = NewUser {
        username: username.trim().to_string(),
        password_hash: password::hash_password(admin_password)?,
        full_name: full_name.trim().to_string(),
        role: Role::Admin.as_str().to_string(),
        created_at: Utc::now().naive_utc(),
    };

    let admin = diesel::insert_into(users::table)
        .values(&new_admin)
        .returning(User::as_returning())
        .get_result(conn)
        .context("failed to insert administrator")?;

    Ok(BootstrapOutcome::Created(admin))
}
