use tracing::trace;

use crate::{
    CardflowError, Result,
    common::MemCache,
    store::{WorkflowStore, data::Workflow},
};

#[derive(Clone)]
pub struct MemStore {
    workflows: MemCache<String, Workflow>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl MemStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            workflows: MemCache::new(capacity),
        }
    }
}

impl WorkflowStore for MemStore {
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        Ok(self.workflows.contains(&id.to_string()))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Workflow> {
        self.workflows.get(&id.to_string()).ok_or(CardflowError::Store(format!("workflow {} not found", id)))
    }

    fn list(&self) -> Result<Vec<Workflow>> {
        let mut rows = self.workflows.values();
        rows.sort_by(|a, b| b.update_time.cmp(&a.update_time).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    fn save(
        &self,
        data: &Workflow,
    ) -> Result<bool> {
        let mut record = data.clone();
        if let Some(existing) = self.workflows.get(&data.id) {
            record.create_time = existing.create_time;
        }
        trace!(id = %record.id, "save workflow");
        self.workflows.set(record.id.clone(), record);
        Ok(true)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!(id = %id, "delete workflow");
        Ok(self.workflows.remove(&id.to_string()).is_some())
    }
}

#[cfg(test)]
mod test {
    use super::MemStore;
    use crate::store::{WorkflowStore, data::Workflow};

    fn record(
        id: &str,
        time: i64,
    ) -> Workflow {
        Workflow {
            id: id.to_string(),
            name: format!("wf {}", id),
            data: "{}".to_string(),
            create_time: time,
            update_time: time,
        }
    }

    #[test]
    fn test_save_find_delete() {
        let store = MemStore::default();
        assert!(!store.exists("a").unwrap());
        assert!(store.find("a").is_err());

        store.save(&record("a", 1)).unwrap();
        let mut updated = record("a", 5);
        updated.name = "renamed".to_string();
        store.save(&updated).unwrap();

        let found = store.find("a").unwrap();
        assert_eq!(found.name, "renamed");
        assert_eq!(found.create_time, 1);
        assert_eq!(found.update_time, 5);

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
    }

    #[test]
    fn test_list_most_recent_first() {
        let store = MemStore::default();
        store.save(&record("old", 1)).unwrap();
        store.save(&record("new", 9)).unwrap();
        let ids: Vec<String> = store.list().unwrap().into_iter().map(|w| w.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }
}
