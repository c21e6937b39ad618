//! Login and logout flows layered on the dispatcher.
//!
//! The dispatcher never writes credentials; these flows are the caller-side
//! glue that stores a token after a successful login and clears everything
//! on logout or before re-authenticating as a different role.

use serde_json::{Value, json};

use crate::client::{ApiClient, ApiPayload};
use crate::credentials::{ActiveRole, CredentialSlot, CredentialStore};
use crate::error::{ApiError, ApiResult};

/// Role selected on the login screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRole {
    Student,
    School,
    Parent,
}

impl LoginRole {
    /// Public login endpoint for this role.
    pub fn login_path(self) -> &'static str {
        match self {
            LoginRole::Student => "/api/auth/login",
            LoginRole::School => "/api/school/auth/login",
            LoginRole::Parent => "/api/parent/auth/login",
        }
    }

    fn active_role(self) -> ActiveRole {
        match self {
            LoginRole::Student => ActiveRole::Student,
            LoginRole::School => ActiveRole::School,
            LoginRole::Parent => ActiveRole::Parent,
        }
    }

    fn slot(self) -> CredentialSlot {
        self.active_role().slot()
    }

    /// Login request body. School staff sign in with email or mobile
    /// number; the backend takes both under `emailOrMobile`.
    fn body(self, credentials: &LoginCredentials) -> Value {
        match self {
            LoginRole::School => json!({
                "emailOrMobile": credentials.identifier,
                "password": credentials.password,
            }),
            LoginRole::Student | LoginRole::Parent => json!({
                "email": credentials.identifier,
                "password": credentials.password,
            }),
        }
    }
}

/// Credentials entered by the user.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    /// Email address, or email-or-mobile for school staff.
    pub identifier: String,
    pub password: String,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub role: ActiveRole,
    pub token: String,
    /// Staff kind reported by the school backend (teacher, counselor,
    /// principal, ...). Absent for student and parent logins.
    pub staff_kind: Option<String>,
}

/// Authenticates against the role's login endpoint and records the session.
///
/// Every token slot is cleared before the attempt, so a login as a
/// different role never leaves a stale session behind. On success the
/// role's slot holds the new token (students also populate the generic
/// slot, which the backend accepts as the shared login token) and the
/// active-role marker points at the role.
///
/// # Errors
/// Any dispatcher error, plus `RequestFailed` when a 2xx login response
/// carries no token.
pub async fn login(
    client: &ApiClient,
    store: &CredentialStore,
    role: LoginRole,
    credentials: &LoginCredentials,
) -> ApiResult<LoginOutcome> {
    store.clear_all(&CredentialSlot::ALL)?;

    let payload = client.post(role.login_path(), role.body(credentials)).await?;
    let body = match payload {
        ApiPayload::Json(value) => value,
        ApiPayload::Text(_) | ApiPayload::NoContent => {
            return Err(ApiError::RequestFailed {
                status: 200,
                message: "login response was not JSON".to_string(),
            });
        }
    };

    let token = extract_token(&body).ok_or_else(|| ApiError::RequestFailed {
        status: 200,
        message: "login response did not include a token".to_string(),
    })?;

    store.set(role.slot(), &token)?;
    if role == LoginRole::Student {
        store.set(CredentialSlot::Generic, &token)?;
    }
    store.set_active_role(role.active_role())?;

    let staff_kind = body
        .get("userType")
        .and_then(Value::as_str)
        .filter(|kind| !kind.is_empty())
        .map(str::to_string);
    if let Some(kind) = &staff_kind {
        store.set_staff_kind(kind)?;
    }

    tracing::debug!(role = role.active_role().as_str(), "login recorded");

    Ok(LoginOutcome {
        role: role.active_role(),
        token,
        staff_kind,
    })
}

/// Registers a new student account via the public signup endpoint.
///
/// # Errors
/// Any dispatcher error.
pub async fn signup(client: &ApiClient, profile: &SignupProfile) -> ApiResult<ApiPayload> {
    client
        .post(
            "/api/auth/signup",
            json!({
                "name": profile.name,
                "email": profile.email,
                "password": profile.password,
            }),
        )
        .await
}

/// New-student profile for [`signup`].
#[derive(Debug, Clone)]
pub struct SignupProfile {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Ends the session: clears every slot and the active-role marker.
/// Idempotent.
///
/// # Errors
/// `StorageUnavailable` if persistence fails.
pub fn logout(store: &CredentialStore) -> ApiResult<()> {
    store.clear_everything()
}

/// The login token lives either under `data` or at the top level,
/// depending on the endpoint.
fn extract_token(body: &Value) -> Option<String> {
    body.pointer("/data/token")
        .or_else(|| body.get("token"))
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
