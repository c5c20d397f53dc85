use std::{fs, path::Path};

use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::SqlitePool;

use crate::{
    auth::hash_password,
    config::{SeedAccount, DEFAULT_SEED_PASSWORD},
    models::{BarberRow, BookingRow, BookingStatus, ClientInput, ClientRow, DashboardRow, OperatorRow},
    slots::format_time,
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub async fn seed_defaults(pool: &SqlitePool, seed: &SeedAccount) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (i64,)>("SELECT id FROM users LIMIT 1")
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    if seed.password == DEFAULT_SEED_PASSWORD {
        log::warn!(
            "SEED_PASSWORD not set. Using default password '{DEFAULT_SEED_PASSWORD}'. Set SEED_PASSWORD in production."
        );
    }

    let password_hash = hash_password(&seed.password)
        .map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
    let user_id = insert_operator(pool, &seed.username, &seed.barber_name, &password_hash, true).await?;
    insert_barber(pool, &seed.barber_name, Some(user_id)).await?;

    log::info!(
        "Seeded operator '{}' with barber profile '{}'",
        seed.username,
        seed.barber_name
    );
    Ok(())
}

pub async fn insert_operator(
    pool: &SqlitePool,
    username: &str,
    display_name: &str,
    password_hash: &str,
    is_admin: bool,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO users (username, display_name, password_hash, is_admin, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(username)
    .bind(display_name)
    .bind(password_hash)
    .bind(is_admin)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_operator_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<OperatorRow>, sqlx::Error> {
    sqlx::query_as::<_, OperatorRow>(
        r#"SELECT id, username, display_name, password_hash, is_admin, created_at
           FROM users
           WHERE username = ?
           LIMIT 1"#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn insert_barber(
    pool: &SqlitePool,
    name: &str,
    user_id: Option<i64>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO barbers (name, user_id) VALUES (?, ?)")
        .bind(name)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn list_barbers(pool: &SqlitePool) -> Result<Vec<BarberRow>, sqlx::Error> {
    sqlx::query_as::<_, BarberRow>("SELECT id, name, user_id FROM barbers ORDER BY name, id")
        .fetch_all(pool)
        .await
}

pub async fn find_barber(pool: &SqlitePool, barber_id: i64) -> Result<Option<BarberRow>, sqlx::Error> {
    sqlx::query_as::<_, BarberRow>("SELECT id, name, user_id FROM barbers WHERE id = ?")
        .bind(barber_id)
        .fetch_optional(pool)
        .await
}

pub async fn barber_for_operator(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<BarberRow>, sqlx::Error> {
    sqlx::query_as::<_, BarberRow>(
        "SELECT id, name, user_id FROM barbers WHERE user_id = ? ORDER BY id LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_client_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<ClientRow>, sqlx::Error> {
    sqlx::query_as::<_, ClientRow>(
        "SELECT id, name, email FROM clients WHERE email = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn insert_client(pool: &SqlitePool, client: &ClientInput) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO clients (name, email) VALUES (?, ?)")
        .bind(&client.name)
        .bind(&client.email)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

#[cfg(test)]
pub async fn count_clients(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients")
        .fetch_one(pool)
        .await
}

pub async fn confirmed_times(
    pool: &SqlitePool,
    barber_id: i64,
    date: NaiveDate,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT time FROM bookings WHERE barber_id = ? AND date = ? AND status = ?",
    )
    .bind(barber_id)
    .bind(format_date(date))
    .bind(BookingStatus::Confirmed.as_str())
    .fetch_all(pool)
    .await
}

pub async fn slot_is_taken(
    pool: &SqlitePool,
    barber_id: i64,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<bool, sqlx::Error> {
    let existing = sqlx::query_scalar::<_, i64>(
        r#"SELECT id FROM bookings
           WHERE barber_id = ? AND date = ? AND time = ? AND status = ?
           LIMIT 1"#,
    )
    .bind(barber_id)
    .bind(format_date(date))
    .bind(format_time(time))
    .bind(BookingStatus::Confirmed.as_str())
    .fetch_optional(pool)
    .await?;
    Ok(existing.is_some())
}

pub async fn insert_booking(
    pool: &SqlitePool,
    barber_id: i64,
    client_id: i64,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO bookings (barber_id, client_id, date, time, status, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(barber_id)
    .bind(client_id)
    .bind(format_date(date))
    .bind(format_time(time))
    .bind(BookingStatus::Confirmed.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_booking(pool: &SqlitePool, booking_id: i64) -> Result<Option<BookingRow>, sqlx::Error> {
    sqlx::query_as::<_, BookingRow>(
        r#"SELECT id, barber_id, client_id, date, time, status, created_at
           FROM bookings
           WHERE id = ?"#,
    )
    .bind(booking_id)
    .fetch_optional(pool)
    .await
}

pub async fn set_booking_status(
    pool: &SqlitePool,
    booking_id: i64,
    status: BookingStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bookings SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(booking_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn bookings_for_operator(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<DashboardRow>, sqlx::Error> {
    sqlx::query_as::<_, DashboardRow>(
        r#"SELECT b.id, b.date, b.time, b.status,
                  c.name as client_name, c.email as client_email
           FROM bookings b
           JOIN barbers br ON b.barber_id = br.id
           JOIN clients c ON b.client_id = c.id
           WHERE br.user_id = ?
           ORDER BY b.date, b.time, b.id"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
