use sqlx::SqlitePool;

use crate::{booking::ClientPolicy, slots::SlotCatalog};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub slots: SlotCatalog,
    pub client_policy: ClientPolicy,
}
