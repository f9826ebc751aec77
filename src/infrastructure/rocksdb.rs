use crate::domain::appointment::Appointment;
use crate::domain::ports::{AppointmentStore, Expected, Patch};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for appointment records.
pub const CF_APPOINTMENTS: &str = "appointments";

/// A persistent appointment store backed by RocksDB.
///
/// Records are serde_json-encoded under their big-endian id. RocksDB has no
/// compare-and-set primitive, so conditional updates run read-modify-write
/// under a single-process write mutex; the engine is the only writer.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbAppointmentStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbAppointmentStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_appointments = ColumnFamilyDescriptor::new(CF_APPOINTMENTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_appointments])
            .map_err(|e| EngineError::Storage(format!("failed to open RocksDB: {e}")))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_APPOINTMENTS)
            .ok_or_else(|| EngineError::Storage("appointments column family not found".to_string()))
    }

    fn read(&self, id: u32) -> Result<Option<Appointment>> {
        let cf = self.cf()?;
        let bytes = self
            .db
            .get_cf(cf, id.to_be_bytes())
            .map_err(|e| EngineError::Storage(format!("RocksDB read error: {e}")))?;
        match bytes {
            Some(bytes) => {
                let appointment = serde_json::from_slice(&bytes).map_err(|e| {
                    EngineError::Storage(format!("failed to deserialize appointment: {e}"))
                })?;
                Ok(Some(appointment))
            }
            None => Ok(None),
        }
    }

    fn write(&self, appointment: &Appointment) -> Result<()> {
        let cf = self.cf()?;
        let value = serde_json::to_vec(appointment)
            .map_err(|e| EngineError::Storage(format!("failed to serialize appointment: {e}")))?;
        self.db
            .put_cf(cf, appointment.id.to_be_bytes(), value)
            .map_err(|e| EngineError::Storage(format!("RocksDB write error: {e}")))
    }
}

#[async_trait]
impl AppointmentStore for RocksDbAppointmentStore {
    async fn get(&self, id: u32) -> Result<Option<Appointment>> {
        self.read(id)
    }

    async fn insert(&self, appointment: Appointment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&appointment)
    }

    async fn update_if(&self, id: u32, expected: &Expected, patch: &Patch) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        match self.read(id)? {
            Some(mut appointment) if expected.matches(&appointment) => {
                patch.apply(&mut appointment);
                self.write(&appointment)?;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn all(&self) -> Result<Vec<Appointment>> {
        let cf = self.cf()?;
        let mut appointments = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) =
                item.map_err(|e| EngineError::Storage(format!("RocksDB iteration error: {e}")))?;
            let appointment: Appointment = serde_json::from_slice(&value).map_err(|e| {
                EngineError::Storage(format!("failed to deserialize appointment: {e}"))
            })?;
            appointments.push(appointment);
        }
        appointments.sort_by_key(|appointment| appointment.id);
        Ok(appointments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::appointment::{AppointmentDraft, AppointmentStatus};
    use chrono::{NaiveDate, NaiveTime};
    use tempfile::tempdir;

    fn appointment(id: u32) -> Appointment {
        Appointment::from_draft(
            AppointmentDraft {
                id,
                family: 10,
                educator: 20,
                date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
                start_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
                amount: 20000,
                pin_code: Some("4821".to_string()),
                pin_expires_at: None,
            },
            format!("auth-{id}"),
        )
    }

    #[tokio::test]
    async fn test_rocksdb_round_trip() {
        let dir = tempdir().unwrap();
        let store = RocksDbAppointmentStore::open(dir.path()).unwrap();

        store.insert(appointment(1)).await.unwrap();
        let stored = store.get(1).await.unwrap().unwrap();
        assert_eq!(stored, appointment(1));
        assert!(store.get(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_conditional_update() {
        let dir = tempdir().unwrap();
        let store = RocksDbAppointmentStore::open(dir.path()).unwrap();
        store.insert(appointment(1)).await.unwrap();

        let patch = Patch {
            status: Some(AppointmentStatus::Accepted),
            ..Patch::default()
        };
        let rows = store
            .update_if(1, &Expected::status(AppointmentStatus::Pending), &patch)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let rows = store
            .update_if(1, &Expected::status(AppointmentStatus::Pending), &patch)
            .await
            .unwrap();
        assert_eq!(rows, 0);
        assert_eq!(
            store.get(1).await.unwrap().unwrap().status,
            AppointmentStatus::Accepted
        );
    }

    #[tokio::test]
    async fn test_rocksdb_all_is_ordered() {
        let dir = tempdir().unwrap();
        let store = RocksDbAppointmentStore::open(dir.path()).unwrap();
        for id in [5, 2, 9] {
            store.insert(appointment(id)).await.unwrap();
        }
        let ids: Vec<u32> = store
            .all()
            .await
            .unwrap()
            .iter()
            .map(|appointment| appointment.id)
            .collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }
}
