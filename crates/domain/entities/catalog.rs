//! Read-only views of the catalog tables owned by the account/profile side of
//! the system. The reservation core never writes these.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infra::db::postgres::schema::{patients, rooms, services};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = patients)]
pub struct PatientEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub profile_image_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = rooms)]
pub struct RoomEntity {
    pub id: Uuid,
    pub room_number: String,
    pub room_type: String,
    pub price_per_day: Decimal,
    pub availability: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = services)]
pub struct ServiceEntity {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub duration_minutes: i32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
