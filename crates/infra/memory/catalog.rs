use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    entities::catalog::{PatientEntity, RoomEntity, ServiceEntity},
    errors::StoreResult,
    repositories::catalog::CatalogRepository,
};

#[derive(Default)]
struct CatalogState {
    patients: HashMap<Uuid, PatientEntity>,
    rooms: HashMap<Uuid, RoomEntity>,
    services: HashMap<Uuid, ServiceEntity>,
}

#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_patient(&self) -> PatientEntity {
        let now = Utc::now();
        let patient = PatientEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            profile_image_id: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .write()
            .await
            .patients
            .insert(patient.id, patient.clone());
        patient
    }

    pub async fn add_room(
        &self,
        room_number: &str,
        price_per_day: Decimal,
        availability: bool,
    ) -> RoomEntity {
        let now = Utc::now();
        let room = RoomEntity {
            id: Uuid::new_v4(),
            room_number: room_number.to_string(),
            room_type: "general".to_string(),
            price_per_day,
            availability,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.rooms.insert(room.id, room.clone());
        room
    }

    pub async fn add_service(&self, name: &str, price: Decimal) -> ServiceEntity {
        let now = Utc::now();
        let service = ServiceEntity {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            duration_minutes: 30,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.state
            .write()
            .await
            .services
            .insert(service.id, service.clone());
        service
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn find_patient(&self, patient_id: Uuid) -> StoreResult<Option<PatientEntity>> {
        Ok(self.state.read().await.patients.get(&patient_id).cloned())
    }

    async fn find_room(&self, room_id: Uuid) -> StoreResult<Option<RoomEntity>> {
        let state = self.state.read().await;
        Ok(state.rooms.get(&room_id).filter(|r| !r.is_deleted).cloned())
    }

    async fn find_service(&self, service_id: Uuid) -> StoreResult<Option<ServiceEntity>> {
        let state = self.state.read().await;
        Ok(state
            .services
            .get(&service_id)
            .filter(|s| !s.is_deleted)
            .cloned())
    }
}
