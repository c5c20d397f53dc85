use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    HttpRequest,
};

use crate::{booking::Rejection, error::AppError};

const FLASH_COOKIE: &str = "barber_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Booked,
    Cancelled,
    Registered,
    Rejected(Rejection),
    Unauthorized,
    NotFound,
    StoreUnavailable,
}

impl Flash {
    pub fn code(&self) -> &'static str {
        match self {
            Flash::Booked => "booked",
            Flash::Cancelled => "cancelled",
            Flash::Registered => "registered",
            Flash::Rejected(Rejection::NameRequired) => "name_required",
            Flash::Rejected(Rejection::InvalidEmail) => "invalid_email",
            Flash::Rejected(Rejection::InvalidDate) => "invalid_date",
            Flash::Rejected(Rejection::PastDate) => "past_date",
            Flash::Rejected(Rejection::InvalidTime) => "invalid_time",
            Flash::Rejected(Rejection::UnknownBarber) => "unknown_barber",
            Flash::Rejected(Rejection::SlotTaken) => "slot_taken",
            Flash::Unauthorized => "unauthorized",
            Flash::NotFound => "not_found",
            Flash::StoreUnavailable => "store_unavailable",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let flash = match code {
            "booked" => Flash::Booked,
            "cancelled" => Flash::Cancelled,
            "registered" => Flash::Registered,
            "name_required" => Flash::Rejected(Rejection::NameRequired),
            "invalid_email" => Flash::Rejected(Rejection::InvalidEmail),
            "invalid_date" => Flash::Rejected(Rejection::InvalidDate),
            "past_date" => Flash::Rejected(Rejection::PastDate),
            "invalid_time" => Flash::Rejected(Rejection::InvalidTime),
            "unknown_barber" => Flash::Rejected(Rejection::UnknownBarber),
            "slot_taken" => Flash::Rejected(Rejection::SlotTaken),
            "unauthorized" => Flash::Unauthorized,
            "not_found" => Flash::NotFound,
            "store_unavailable" => Flash::StoreUnavailable,
            _ => return None,
        };
        Some(flash)
    }

    pub fn message(&self) -> String {
        match self {
            Flash::Booked => "Booking confirmed!".to_string(),
            Flash::Cancelled => "Booking cancelled successfully!".to_string(),
            Flash::Registered => "Account created. Log in to see your dashboard.".to_string(),
            Flash::Rejected(rejection) => rejection.to_string(),
            Flash::Unauthorized => AppError::Unauthorized.to_string(),
            Flash::NotFound => AppError::NotFound.to_string(),
            Flash::StoreUnavailable => "Database error. Please try again later.".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Flash::Booked | Flash::Cancelled | Flash::Registered)
    }
}

impl From<&AppError> for Flash {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::StoreUnavailable(_) => Flash::StoreUnavailable,
            AppError::ValidationFailed(rejection) => Flash::Rejected(*rejection),
            AppError::NotFound => Flash::NotFound,
            AppError::Unauthorized => Flash::Unauthorized,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlashView {
    pub message: String,
    pub kind: &'static str,
}

impl From<Flash> for FlashView {
    fn from(flash: Flash) -> Self {
        FlashView {
            message: flash.message(),
            kind: if flash.is_error() { "error" } else { "success" },
        }
    }
}

pub fn flash_cookie(flash: Flash) -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE, flash.code())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn clear_flash_cookie() -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0))
        .finish()
}

pub fn peek_flash(req: &HttpRequest) -> Option<FlashView> {
    req.cookie(FLASH_COOKIE)
        .and_then(|cookie| Flash::from_code(cookie.value()))
        .map(FlashView::from)
}
