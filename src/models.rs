use std::fmt;

use serde::Serialize;

pub const STATUS_CONFIRMED: &str = "Confirmed";
pub const STATUS_CANCELLED: &str = "Cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => STATUS_CONFIRMED,
            BookingStatus::Cancelled => STATUS_CANCELLED,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            STATUS_CONFIRMED => Some(BookingStatus::Confirmed),
            STATUS_CANCELLED => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OperatorRow {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BarberRow {
    pub id: i64,
    pub name: String,
    pub user_id: Option<i64>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClientRow {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct ClientInput {
    pub name: String,
    pub email: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    pub id: i64,
    pub barber_id: i64,
    pub client_id: i64,
    pub date: String,
    pub time: String,
    pub status: String,
    pub created_at: String,
}

impl BookingRow {
    pub fn status(&self) -> Option<BookingStatus> {
        BookingStatus::parse(&self.status)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DashboardRow {
    pub id: i64,
    pub date: String,
    pub time: String,
    pub status: String,
    pub client_name: String,
    pub client_email: String,
}
