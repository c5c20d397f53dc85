use actix_web::{middleware::from_fn, web, HttpRequest, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use askama::Template;

use crate::{
    auth::{logout_guard, operator_validator, AuthOperator},
    booking::cancel,
    db,
    error::AppError,
    flash::{clear_flash_cookie, peek_flash, Flash, FlashView},
    models::{BookingStatus, DashboardRow},
    routes::public::redirect_with_flash,
    state::AppState,
    templates::render,
};

#[derive(Clone, Debug)]
struct BookingView {
    id: i64,
    date: String,
    time: String,
    client_name: String,
    client_email: String,
    status: String,
    cancellable: bool,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    display_name: String,
    is_admin: bool,
    barber_name: Option<String>,
    bookings: Vec<BookingView>,
    flash: Option<FlashView>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/dashboard")
            .wrap(HttpAuthentication::basic(operator_validator))
            .wrap(from_fn(logout_guard))
            .route(web::get().to(dashboard)),
    )
    .service(
        web::resource("/cancel/{booking_id}")
            .wrap(HttpAuthentication::basic(operator_validator))
            .wrap(from_fn(logout_guard))
            .route(web::post().to(cancel_booking)),
    );
}

async fn dashboard(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthOperator>,
    req: HttpRequest,
) -> HttpResponse {
    let mut flash = peek_flash(&req);
    let mut shown = flash.is_some();

    let barber_name = match db::barber_for_operator(&state.db, auth.id).await {
        Ok(barber) => barber.map(|barber| barber.name),
        Err(err) => {
            log::error!("Error querying dashboard: {err}");
            flash = Some(FlashView::from(Flash::StoreUnavailable));
            shown = false;
            None
        }
    };

    let bookings = match db::bookings_for_operator(&state.db, auth.id).await {
        Ok(rows) => rows.into_iter().map(to_view).collect(),
        Err(err) => {
            log::error!("Error querying dashboard: {err}");
            flash = Some(FlashView::from(Flash::StoreUnavailable));
            shown = false;
            Vec::new()
        }
    };

    let mut response = render(DashboardTemplate {
        display_name: auth.display_name.clone(),
        is_admin: auth.is_admin,
        barber_name,
        bookings,
        flash,
    });
    if shown {
        let _ = response.add_cookie(&clear_flash_cookie());
    }
    response
}

async fn cancel_booking(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthOperator>,
    path: web::Path<i64>,
) -> HttpResponse {
    let booking_id = path.into_inner();

    let flash = match cancel(&state.db, booking_id, auth.id).await {
        Ok(_) => Flash::Cancelled,
        Err(err) => {
            match &err {
                AppError::StoreUnavailable(cause) => {
                    log::error!("Error cancelling booking: {cause}")
                }
                other => log::warn!(
                    "Operator '{}' could not cancel booking {booking_id}: {other}",
                    auth.username
                ),
            }
            Flash::from(&err)
        }
    };

    redirect_with_flash("/dashboard", flash)
}

fn to_view(row: DashboardRow) -> BookingView {
    BookingView {
        cancellable: BookingStatus::parse(&row.status) == Some(BookingStatus::Confirmed),
        id: row.id,
        date: row.date,
        time: row.time,
        client_name: row.client_name,
        client_email: row.client_email,
        status: row.status,
    }
}
