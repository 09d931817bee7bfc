use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::catalog::{PatientEntity, RoomEntity, ServiceEntity},
    errors::StoreResult,
};

/// Lookups into patient, room and service records maintained elsewhere.
#[automock]
#[async_trait]
pub trait CatalogRepository {
    async fn find_patient(&self, patient_id: Uuid) -> StoreResult<Option<PatientEntity>>;

    async fn find_room(&self, room_id: Uuid) -> StoreResult<Option<RoomEntity>>;

    async fn find_service(&self, service_id: Uuid) -> StoreResult<Option<ServiceEntity>>;
}
