use actix_web::{
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    error::ErrorUnauthorized,
    http::header,
    middleware::Next,
    web, Error, HttpMessage, HttpRequest, HttpResponse,
};
use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web_httpauth::extractors::basic::BasicAuth;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use askama::Template;
use rand_core::OsRng;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{db, state::AppState, templates::render_with_status};

pub const AUTH_REALM: &str = "Barbershop";
const LOGOUT_COOKIE: &str = "barber_logged_out";
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Debug)]
pub struct AuthOperator {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub is_admin: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationForm {
    pub username: String,
    pub password: String,
    pub barber_name: String,
}

#[derive(Template)]
#[template(path = "logged_out.html")]
struct LoggedOutTemplate {
    login_url: String,
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = PasswordHash::new(password_hash);
    match parsed_hash {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub async fn authenticate_credentials(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Option<AuthOperator> {
    let operator = match db::find_operator_by_username(pool, username).await {
        Ok(operator) => operator?,
        Err(err) => {
            log::error!("Error during login: {err}");
            return None;
        }
    };

    if !verify_password(password, &operator.password_hash) {
        return None;
    }

    Some(AuthOperator {
        id: operator.id,
        username: operator.username,
        display_name: operator.display_name,
        is_admin: operator.is_admin,
    })
}

pub async fn operator_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        return Err((ErrorUnauthorized("Unauthorized"), req));
    };
    let username = credentials.user_id();
    let password = credentials.password().unwrap_or_default();
    match authenticate_credentials(&state.db, username, password).await {
        Some(operator) => {
            req.extensions_mut().insert(operator);
            Ok(req)
        }
        None => Err((ErrorUnauthorized("Unauthorized"), req)),
    }
}

/// Returns the form errors, or the new operator id.
pub async fn register_operator(
    pool: &SqlitePool,
    form: &RegistrationForm,
) -> Result<Result<i64, Vec<String>>, sqlx::Error> {
    let username = form.username.trim();
    let barber_name = form.barber_name.trim();

    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push("Username is required.".to_string());
    }
    if barber_name.is_empty() {
        errors.push("Barber name is required.".to_string());
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        ));
    }
    if !username.is_empty() && db::find_operator_by_username(pool, username).await?.is_some() {
        errors.push("Username is already taken.".to_string());
    }
    if !errors.is_empty() {
        return Ok(Err(errors));
    }

    let password_hash = hash_password(&form.password)
        .map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
    let user_id = db::insert_operator(pool, username, barber_name, &password_hash, false).await?;
    db::insert_barber(pool, barber_name, Some(user_id)).await?;

    log::info!("Registered operator '{username}' with barber profile '{barber_name}'");
    Ok(Ok(user_id))
}

pub fn logout_cookie(req: &HttpRequest) -> Cookie<'static> {
    let mut builder = Cookie::build(LOGOUT_COOKIE, "1")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(365));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn clear_logout_cookie(req: &HttpRequest) -> Cookie<'static> {
    let mut builder = Cookie::build(LOGOUT_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn is_logged_out(req: &HttpRequest) -> bool {
    req.cookie(LOGOUT_COOKIE).is_some()
}

pub async fn logout_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: actix_web::body::MessageBody + 'static,
{
    if is_logged_out(req.request()) {
        let mut response = render_with_status(
            LoggedOutTemplate {
                login_url: "/login".to_string(),
            },
            actix_web::http::StatusCode::UNAUTHORIZED,
        );
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        );
        return Ok(req.into_response(response));
    }

    let res = next.call(req).await?;
    Ok(res.map_into_boxed_body())
}

pub fn auth_challenge() -> HttpResponse {
    HttpResponse::Unauthorized()
        .insert_header((header::WWW_AUTHENTICATE, format!("Basic realm=\"{}\"", AUTH_REALM)))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}
