use actix_web::{http::header, web, HttpRequest, HttpResponse};
use actix_web::http::header::Header;
use actix_web_httpauth::headers::authorization::{Authorization, Basic};
use askama::Template;
use chrono::Local;
use serde::Deserialize;

use crate::{
    auth::{
        auth_challenge, authenticate_credentials, clear_logout_cookie, logout_cookie,
        register_operator, RegistrationForm,
    },
    booking::{try_book, BookingRequest, Rejection},
    db,
    error::{AppError, AppResult},
    flash::{clear_flash_cookie, flash_cookie, peek_flash, Flash, FlashView},
    slots::{available_slots, format_time},
    state::AppState,
    templates::render,
};

#[derive(Clone, Debug)]
struct BarberOption {
    id: i64,
    name: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    barbers: Vec<BarberOption>,
    slots: Vec<String>,
    today: String,
    flash: Option<FlashView>,
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    username: String,
    barber_name: String,
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct SlotsQuery {
    barber_id: Option<String>,
    date: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/book").route(web::post().to(book)))
        .service(web::resource("/slots").route(web::get().to(slots)))
        .service(
            web::resource("/login")
                .route(web::get().to(login))
                .route(web::post().to(login)),
        )
        .service(web::resource("/logout").route(web::get().to(logout)))
        .service(
            web::resource("/register")
                .route(web::get().to(show_register))
                .route(web::post().to(register)),
        )
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn home(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let pending = peek_flash(&req);
    let (barbers, flash, shown) = match db::list_barbers(&state.db).await {
        Ok(rows) => (
            rows.into_iter()
                .map(|row| BarberOption {
                    id: row.id,
                    name: row.name,
                })
                .collect(),
            pending.clone(),
            pending.is_some(),
        ),
        Err(err) => {
            log::error!("Error querying barbers: {err}");
            (Vec::new(), Some(FlashView::from(Flash::StoreUnavailable)), false)
        }
    };

    let mut response = render(IndexTemplate {
        barbers,
        slots: state.slots.times().into_iter().map(format_time).collect(),
        today: db::format_date(Local::now().date_naive()),
        flash,
    });
    if shown {
        let _ = response.add_cookie(&clear_flash_cookie());
    }
    response
}

async fn book(state: web::Data<AppState>, form: web::Form<BookingRequest>) -> HttpResponse {
    let request = form.into_inner();
    let today = Local::now().date_naive();

    let flash = match try_book(&state.db, &state.slots, state.client_policy, today, &request).await {
        Ok(_) => Flash::Booked,
        Err(err) => {
            match &err {
                AppError::StoreUnavailable(cause) => log::error!("Error creating booking: {cause}"),
                other => log::debug!("Booking rejected: {other}"),
            }
            Flash::from(&err)
        }
    };

    redirect_with_flash("/", flash)
}

async fn slots(state: web::Data<AppState>, query: web::Query<SlotsQuery>) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let barber_id = query
        .barber_id
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or(Rejection::UnknownBarber)?;
    let date = query
        .date
        .as_deref()
        .and_then(db::parse_date)
        .ok_or(Rejection::InvalidDate)?;

    let free = available_slots(&state.db, &state.slots, barber_id, date).await?;
    let body: Vec<String> = free.into_iter().map(format_time).collect();
    Ok(HttpResponse::Ok().json(body))
}

async fn login(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let auth = match Authorization::<Basic>::parse(&req) {
        Ok(auth) => auth,
        Err(_) => return auth_challenge(),
    };
    let credentials = auth.into_scheme();
    let username = credentials.user_id();
    let password = credentials.password().unwrap_or_default();

    if authenticate_credentials(&state.db, username, password)
        .await
        .is_none()
    {
        return auth_challenge();
    }

    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/dashboard"))
        .cookie(clear_logout_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

async fn logout(req: HttpRequest) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/"))
        .cookie(logout_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

async fn show_register() -> HttpResponse {
    render(RegisterTemplate {
        username: String::new(),
        barber_name: String::new(),
        errors: Vec::new(),
    })
}

async fn register(
    state: web::Data<AppState>,
    form: web::Form<RegistrationForm>,
) -> HttpResponse {
    let form = form.into_inner();
    let outcome = register_operator(&state.db, &form).await.map_err(|err| {
        log::error!("Error during registration: {err}");
        AppError::StoreUnavailable(err)
    });

    let errors = match outcome {
        Ok(Ok(_)) => return redirect_with_flash("/", Flash::Registered),
        Ok(Err(errors)) => errors,
        Err(err) => vec![err.to_string()],
    };

    render(RegisterTemplate {
        username: form.username,
        barber_name: form.barber_name,
        errors,
    })
}

pub(crate) fn redirect_with_flash(location: &str, flash: Flash) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, location))
        .cookie(flash_cookie(flash))
        .finish()
}
