use crate::StateType;
use crate::identity::{AuthSession, Credentials, Email, current_user};
use crate::known_errors::KnownErrors;
use crate::profile::ProfileState;
use crate::registry::Username;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_login::AuthnBackend;
use serde::Deserialize;

fn session_error(e: axum_login::Error<crate::BackendType>) -> KnownErrors {
    match e {
        axum_login::Error::Backend(err) => err,
        other => KnownErrors::InternalError {
            context: other.to_string(),
        },
    }
}

#[derive(Deserialize)]
pub struct RegisterForm {
    email: String,
    password: String,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

pub async fn register(
    State(state): State<StateType>,
    mut auth_session: AuthSession,
    Json(form): Json<RegisterForm>,
) -> Result<Json<ProfileState>, KnownErrors> {
    // a malformed email is a credential problem, a malformed username a
    // form validation problem
    let email = Email::try_new(&form.email).map_err(|_| KnownErrors::InvalidCredential)?;
    let username = Username::try_new(&form.username).map_err(|_| KnownErrors::InvalidInput)?;

    let profile = state
        .register(
            email,
            &form.password,
            username,
            form.first_name,
            form.last_name,
        )
        .await?;

    // sign the fresh account in
    let user = auth_session
        .backend
        .get_user(&profile.account)
        .await?
        .ok_or(KnownErrors::InternalError {
            context: "account vanished right after registration".to_string(),
        })?;
    auth_session.login(&user).await.map_err(session_error)?;

    Ok(Json(profile))
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<StateType>,
    mut auth_session: AuthSession,
    Json(form): Json<LoginForm>,
) -> Result<Json<ProfileState>, KnownErrors> {
    let email = Email::try_new(&form.email).map_err(|_| KnownErrors::InvalidCredential)?;

    let user = auth_session
        .authenticate(Credentials {
            email,
            password: form.password,
        })
        .await
        .map_err(session_error)?
        .ok_or(KnownErrors::InvalidCredential)?;

    auth_session.login(&user).await.map_err(session_error)?;

    // repair registry/profile drift; never fail the login over it
    if let Err(e) = state.reconcile(&user.id).await {
        tracing::warn!(account = %user.id, error = %e, "reconciliation failed during login");
    }

    let profile = state
        .profile(&user.id)
        .await?
        .ok_or(KnownErrors::InternalError {
            context: format!("no profile for authenticated account {}", user.id),
        })?;

    Ok(Json(profile))
}

pub async fn logout(mut auth_session: AuthSession) -> Result<StatusCode, KnownErrors> {
    auth_session.logout().await.map_err(session_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<StateType>,
    auth_session: AuthSession,
) -> Result<Json<ProfileState>, KnownErrors> {
    let user = current_user(&auth_session)?;

    let profile = state
        .profile(&user.id)
        .await?
        .ok_or(KnownErrors::InternalError {
            context: format!("no profile for authenticated account {}", user.id),
        })?;

    Ok(Json(profile))
}

#[derive(Deserialize)]
pub struct UpdateEmailForm {
    email: String,
}

pub async fn update_email(
    State(state): State<StateType>,
    mut auth_session: AuthSession,
    Json(form): Json<UpdateEmailForm>,
) -> Result<StatusCode, KnownErrors> {
    let user = current_user(&auth_session)?;
    let email = Email::try_new(&form.email).map_err(|_| KnownErrors::InvalidCredential)?;

    state.change_email(&user.id, email).await?;

    // refresh the session user so it carries the new address
    if let Some(user) = auth_session.backend.get_user(&user.id).await? {
        auth_session.login(&user).await.map_err(session_error)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct UpdatePasswordForm {
    password: String,
    confirm_password: String,
}

pub async fn update_password(
    State(state): State<StateType>,
    mut auth_session: AuthSession,
    Json(form): Json<UpdatePasswordForm>,
) -> Result<StatusCode, KnownErrors> {
    let user = current_user(&auth_session)?;

    if form.password != form.confirm_password {
        return Err(KnownErrors::InvalidInput);
    }

    state.change_password(&user.id, &form.password).await?;

    // the session hash is derived from the credential; log back in so the
    // password change does not end this session
    if let Some(user) = auth_session.backend.get_user(&user.id).await? {
        auth_session.login(&user).await.map_err(session_error)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct UpdateUsernameForm {
    username: String,
}

pub async fn update_username(
    State(state): State<StateType>,
    auth_session: AuthSession,
    Json(form): Json<UpdateUsernameForm>,
) -> Result<Json<ProfileState>, KnownErrors> {
    let user = current_user(&auth_session)?;
    let username = Username::try_new(&form.username).map_err(|_| KnownErrors::InvalidInput)?;

    let profile = state.rename(&user.id, username).await?;
    Ok(Json(profile))
}
