use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use super::run_blocking;
use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{patients, rooms, services},
    },
};
use domain::{
    entities::catalog::{PatientEntity, RoomEntity, ServiceEntity},
    errors::StoreResult,
    repositories::catalog::CatalogRepository,
};

pub struct CatalogPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CatalogPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CatalogRepository for CatalogPostgres {
    async fn find_patient(&self, patient_id: Uuid) -> StoreResult<Option<PatientEntity>> {
        run_blocking(&self.db_pool, move |conn| {
            let result = patients::table
                .filter(patients::id.eq(patient_id))
                .select(PatientEntity::as_select())
                .first::<PatientEntity>(conn)
                .optional()?;

            Ok(result)
        })
        .await
    }

    async fn find_room(&self, room_id: Uuid) -> StoreResult<Option<RoomEntity>> {
        run_blocking(&self.db_pool, move |conn| {
            let result = rooms::table
                .filter(rooms::id.eq(room_id))
                .filter(rooms::is_deleted.eq(false))
                .select(RoomEntity::as_select())
                .first::<RoomEntity>(conn)
                .optional()?;

            Ok(result)
        })
        .await
    }

    async fn find_service(&self, service_id: Uuid) -> StoreResult<Option<ServiceEntity>> {
        run_blocking(&self.db_pool, move |conn| {
            let result = services::table
                .filter(services::id.eq(service_id))
                .filter(services::is_deleted.eq(false))
                .select(ServiceEntity::as_select())
                .first::<ServiceEntity>(conn)
                .optional()?;

            Ok(result)
        })
        .await
    }
}
