use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    db,
    error::{AppError, AppResult},
    models::{BookingRow, BookingStatus, ClientInput},
    slots::{parse_time, SlotCatalog},
};

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$";

/// Why a booking request was turned away. Checks run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Client name cannot be empty.")]
    NameRequired,
    #[error("Invalid email address.")]
    InvalidEmail,
    #[error("Invalid date. Use YYYY-MM-DD.")]
    InvalidDate,
    #[error("Cannot book past dates.")]
    PastDate,
    #[error("Invalid time slot.")]
    InvalidTime,
    #[error("Unknown barber.")]
    UnknownBarber,
    #[error("This time slot is already booked.")]
    SlotTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientPolicy {
    #[default]
    ReuseByEmail,
    AlwaysNew,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub barber: String,
    pub date: String,
    pub time: String,
    pub client_name: String,
    pub client_email: String,
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
        .is_match(email)
}

pub async fn try_book(
    pool: &SqlitePool,
    catalog: &SlotCatalog,
    policy: ClientPolicy,
    today: NaiveDate,
    request: &BookingRequest,
) -> AppResult<BookingRow> {
    let client_name = request.client_name.trim();
    let client_email = request.client_email.trim();

    if client_name.is_empty() {
        return Err(Rejection::NameRequired.into());
    }
    if !is_valid_email(client_email) {
        return Err(Rejection::InvalidEmail.into());
    }

    let date = db::parse_date(&request.date).ok_or(Rejection::InvalidDate)?;
    if date < today {
        return Err(Rejection::PastDate.into());
    }

    let time = parse_time(&request.time)
        .filter(|time| catalog.contains(*time))
        .ok_or(Rejection::InvalidTime)?;

    let barber_id = request
        .barber
        .trim()
        .parse::<i64>()
        .map_err(|_| Rejection::UnknownBarber)?;
    if db::find_barber(pool, barber_id).await?.is_none() {
        return Err(Rejection::UnknownBarber.into());
    }

    if db::slot_is_taken(pool, barber_id, date, time).await? {
        return Err(Rejection::SlotTaken.into());
    }

    let client = ClientInput {
        name: client_name.to_string(),
        email: client_email.to_string(),
    };
    let client_id = resolve_client(pool, policy, &client).await?;
    let booking_id = db::insert_booking(pool, barber_id, client_id, date, time).await?;

    log::info!(
        "Booking {booking_id} confirmed for barber {barber_id} on {} at {}",
        request.date.trim(),
        request.time.trim()
    );

    db::find_booking(pool, booking_id)
        .await?
        .ok_or(AppError::NotFound)
}

async fn resolve_client(
    pool: &SqlitePool,
    policy: ClientPolicy,
    client: &ClientInput,
) -> Result<i64, sqlx::Error> {
    if policy == ClientPolicy::ReuseByEmail {
        if let Some(existing) = db::find_client_by_email(pool, &client.email).await? {
            return Ok(existing.id);
        }
    }
    db::insert_client(pool, client).await
}

pub async fn cancel(pool: &SqlitePool, booking_id: i64, operator_id: i64) -> AppResult<BookingRow> {
    let mut booking = db::find_booking(pool, booking_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let barber = db::barber_for_operator(pool, operator_id).await?;
    match barber {
        Some(barber) if barber.id == booking.barber_id => {}
        _ => return Err(AppError::Unauthorized),
    }

    if booking.status() == Some(BookingStatus::Cancelled) {
        return Ok(booking);
    }

    db::set_booking_status(pool, booking_id, BookingStatus::Cancelled).await?;
    booking.status = BookingStatus::Cancelled.as_str().to_string();

    log::info!("Booking {booking_id} cancelled by operator {operator_id}");
    Ok(booking)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::test_pool;
    use crate::slots::available_slots;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn request(barber_id: i64, date: &str, time: &str, name: &str, email: &str) -> BookingRequest {
        BookingRequest {
            barber: barber_id.to_string(),
            date: date.into(),
            time: time.into(),
            client_name: name.into(),
            client_email: email.into(),
        }
    }

    async fn book(
        pool: &SqlitePool,
        policy: ClientPolicy,
        request: &BookingRequest,
    ) -> AppResult<BookingRow> {
        try_book(pool, &SlotCatalog::default(), policy, today(), request).await
    }

    fn rejection(result: AppResult<BookingRow>) -> Rejection {
        match result {
            Err(AppError::ValidationFailed(rejection)) => rejection,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test_case::test_case("a@b.co", true)]
    #[test_case::test_case("alice@x.com", true)]
    #[test_case::test_case("first.last+tag@mail-host.co.uk", true)]
    #[test_case::test_case("not-an-email", false)]
    #[test_case::test_case("a@b", false)]
    #[test_case::test_case("@b.co", false)]
    #[test_case::test_case("a b@c.co", false)]
    fn email_shape(email: &str, expected: bool) {
        assert_eq!(is_valid_email(email), expected);
    }

    #[actix_web::test]
    async fn admits_and_returns_confirmed_booking() {
        let pool = test_pool().await;
        let barber = db::insert_barber(&pool, "John", None).await.unwrap();

        let booking = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-10", "09:00", " Alice ", "alice@x.com"),
        )
        .await
        .unwrap();

        assert_eq!(booking.barber_id, barber);
        assert_eq!(booking.date, "2025-01-10");
        assert_eq!(booking.time, "09:00");
        assert_eq!(booking.status(), Some(BookingStatus::Confirmed));
    }

    #[actix_web::test]
    async fn second_booking_of_same_slot_is_taken_for_any_client() {
        let pool = test_pool().await;
        let barber = db::insert_barber(&pool, "John", None).await.unwrap();
        book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-10", "09:00", "Alice", "alice@x.com"),
        )
        .await
        .unwrap();

        let again = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-10", "09:00", "Bob", "bob@y.org"),
        )
        .await;
        assert_eq!(rejection(again), Rejection::SlotTaken);

        let free = available_slots(
            &pool,
            &SlotCatalog::default(),
            barber,
            db::parse_date("2025-01-10").unwrap(),
        )
        .await
        .unwrap();
        assert!(!free.contains(&parse_time("09:00").unwrap()));
    }

    #[actix_web::test]
    async fn past_date_rejected_even_when_slot_is_free() {
        let pool = test_pool().await;
        let barber = db::insert_barber(&pool, "John", None).await.unwrap();
        let result = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2020-01-01", "09:00", "Alice", "alice@x.com"),
        )
        .await;
        assert_eq!(rejection(result), Rejection::PastDate);
    }

    #[actix_web::test]
    async fn past_date_rejected_even_when_slot_is_taken() {
        let pool = test_pool().await;
        let barber = db::insert_barber(&pool, "John", None).await.unwrap();
        let client = db::insert_client(
            &pool,
            &ClientInput {
                name: "Bob".into(),
                email: "bob@y.org".into(),
            },
        )
        .await
        .unwrap();
        db::insert_booking(
            &pool,
            barber,
            client,
            db::parse_date("2020-01-01").unwrap(),
            parse_time("09:00").unwrap(),
        )
        .await
        .unwrap();

        let result = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2020-01-01", "09:00", "Alice", "alice@x.com"),
        )
        .await;
        assert_eq!(rejection(result), Rejection::PastDate);
    }

    #[actix_web::test]
    async fn today_is_bookable() {
        let pool = test_pool().await;
        let barber = db::insert_barber(&pool, "John", None).await.unwrap();
        book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-01", "16:30", "Alice", "alice@x.com"),
        )
        .await
        .unwrap();
    }

    #[test_case::test_case("", "alice@x.com", "2025-01-10", "09:00", Rejection::NameRequired)]
    #[test_case::test_case("   ", "not-an-email", "2020-01-01", "09:00", Rejection::NameRequired)]
    #[test_case::test_case("Alice", "not-an-email", "2020-01-01", "09:00", Rejection::InvalidEmail)]
    #[test_case::test_case("Alice", "alice@x.com", "10/01/2025", "09:00", Rejection::InvalidDate)]
    #[test_case::test_case("Alice", "alice@x.com", "2020-01-01", "nine", Rejection::PastDate)]
    #[test_case::test_case("Alice", "alice@x.com", "2025-01-10", "09:15", Rejection::InvalidTime)]
    #[test_case::test_case("Alice", "alice@x.com", "2025-01-10", "18:00", Rejection::InvalidTime)]
    #[actix_web::test]
    async fn checks_run_in_order(name: &str, email: &str, date: &str, time: &str, expected: Rejection) {
        let pool = test_pool().await;
        let barber = db::insert_barber(&pool, "John", None).await.unwrap();
        let result = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, date, time, name, email),
        )
        .await;
        assert_eq!(rejection(result), expected);
    }

    #[actix_web::test]
    async fn unknown_barber_is_rejected() {
        let pool = test_pool().await;
        let result = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(42, "2025-01-10", "09:00", "Alice", "alice@x.com"),
        )
        .await;
        assert_eq!(rejection(result), Rejection::UnknownBarber);
    }

    #[actix_web::test]
    async fn reuse_policy_dedupes_clients_by_email() {
        let pool = test_pool().await;
        let barber = db::insert_barber(&pool, "John", None).await.unwrap();
        let first = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-10", "09:00", "Alice", "alice@x.com"),
        )
        .await
        .unwrap();
        let second = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-10", "09:30", "Alice", "alice@x.com"),
        )
        .await
        .unwrap();
        assert_eq!(first.client_id, second.client_id);
        assert_eq!(db::count_clients(&pool).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn always_new_policy_inserts_a_client_per_booking() {
        let pool = test_pool().await;
        let barber = db::insert_barber(&pool, "John", None).await.unwrap();
        for time in ["09:00", "09:30"] {
            book(
                &pool,
                ClientPolicy::AlwaysNew,
                &request(barber, "2025-01-10", time, "Alice", "alice@x.com"),
            )
            .await
            .unwrap();
        }
        assert_eq!(db::count_clients(&pool).await.unwrap(), 2);
    }

    #[actix_web::test]
    async fn cancel_by_owner_frees_slot() {
        let pool = test_pool().await;
        let owner = db::insert_operator(&pool, "owner", "Owner", "x", false).await.unwrap();
        let barber = db::insert_barber(&pool, "Owner", Some(owner)).await.unwrap();
        let booking = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-10", "09:00", "Alice", "alice@x.com"),
        )
        .await
        .unwrap();

        let cancelled = cancel(&pool, booking.id, owner).await.unwrap();
        assert_eq!(cancelled.status(), Some(BookingStatus::Cancelled));

        let stored = db::find_booking(&pool, booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), Some(BookingStatus::Cancelled));

        book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-10", "09:00", "Bob", "bob@y.org"),
        )
        .await
        .unwrap();
    }

    #[actix_web::test]
    async fn cancelling_twice_keeps_booking_cancelled() {
        let pool = test_pool().await;
        let owner = db::insert_operator(&pool, "owner", "Owner", "x", false).await.unwrap();
        let barber = db::insert_barber(&pool, "Owner", Some(owner)).await.unwrap();
        let booking = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-10", "09:00", "Alice", "alice@x.com"),
        )
        .await
        .unwrap();

        cancel(&pool, booking.id, owner).await.unwrap();
        let again = cancel(&pool, booking.id, owner).await.unwrap();
        assert_eq!(again.status(), Some(BookingStatus::Cancelled));

        let stored = db::find_booking(&pool, booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), Some(BookingStatus::Cancelled));
    }

    #[actix_web::test]
    async fn cancel_by_other_operator_is_unauthorized_and_keeps_status() {
        let pool = test_pool().await;
        let owner = db::insert_operator(&pool, "owner", "Owner", "x", false).await.unwrap();
        let intruder = db::insert_operator(&pool, "intruder", "Intruder", "x", false)
            .await
            .unwrap();
        let barber = db::insert_barber(&pool, "Owner", Some(owner)).await.unwrap();
        db::insert_barber(&pool, "Intruder", Some(intruder)).await.unwrap();
        let booking = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-10", "09:00", "Alice", "alice@x.com"),
        )
        .await
        .unwrap();

        let result = cancel(&pool, booking.id, intruder).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));

        let stored = db::find_booking(&pool, booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), Some(BookingStatus::Confirmed));
    }

    #[actix_web::test]
    async fn cancel_without_barber_profile_is_unauthorized() {
        let pool = test_pool().await;
        let barber = db::insert_barber(&pool, "John", None).await.unwrap();
        let operator = db::insert_operator(&pool, "orphan", "Orphan", "x", false)
            .await
            .unwrap();
        let booking = book(
            &pool,
            ClientPolicy::ReuseByEmail,
            &request(barber, "2025-01-10", "09:00", "Alice", "alice@x.com"),
        )
        .await
        .unwrap();
        assert!(matches!(
            cancel(&pool, booking.id, operator).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[actix_web::test]
    async fn cancel_unknown_booking_is_not_found() {
        let pool = test_pool().await;
        assert!(matches!(cancel(&pool, 404, 1).await, Err(AppError::NotFound)));
    }
}
