use crate::domain::appointment::Appointment;
use crate::domain::ports::{AppointmentStore, Expected, Patch};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory appointment store.
///
/// Uses `Arc<RwLock<HashMap<u32, Appointment>>>` for shared concurrent
/// access. Conditional updates check and patch under a single write lock, so
/// they provide the same one-winner semantics a transactional database
/// would.
#[derive(Default, Clone)]
pub struct InMemoryAppointmentStore {
    appointments: Arc<RwLock<HashMap<u32, Appointment>>>,
}

impl InMemoryAppointmentStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get(&self, id: u32) -> Result<Option<Appointment>> {
        let appointments = self.appointments.read().await;
        Ok(appointments.get(&id).cloned())
    }

    async fn insert(&self, appointment: Appointment) -> Result<()> {
        let mut appointments = self.appointments.write().await;
        appointments.insert(appointment.id, appointment);
        Ok(())
    }

    async fn update_if(&self, id: u32, expected: &Expected, patch: &Patch) -> Result<u64> {
        let mut appointments = self.appointments.write().await;
        match appointments.get_mut(&id) {
            Some(appointment) if expected.matches(appointment) => {
                patch.apply(appointment);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn all(&self) -> Result<Vec<Appointment>> {
        let appointments = self.appointments.read().await;
        let mut all: Vec<_> = appointments.values().cloned().collect();
        all.sort_by_key(|appointment| appointment.id);
        Ok(all)
    }
}
