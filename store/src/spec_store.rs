use async_trait::async_trait;
use model::BakeSpec;

/// Read-only source of bake specs (§3, §6: "read-only to the core").
#[async_trait]
pub trait SpecStore: Send + Sync {
    async fn load_active(&self) -> anyhow::Result<Vec<BakeSpec>>;
    async fn get(&self, item_guid: &str) -> anyhow::Result<Option<BakeSpec>>;
}

/// Fixed-list implementation for tests and the headless runner (§4.6).
pub struct StaticSpecStore {
    specs: Vec<BakeSpec>,
}

impl StaticSpecStore {
    pub fn new(specs: Vec<BakeSpec>) -> Self {
        Self { specs }
    }
}

#[async_trait]
impl SpecStore for StaticSpecStore {
    async fn load_active(&self) -> anyhow::Result<Vec<BakeSpec>> {
        Ok(self.specs.iter().filter(|s| s.active).cloned().collect())
    }

    async fn get(&self, item_guid: &str) -> anyhow::Result<Option<BakeSpec>> {
        Ok(self.specs.iter().find(|s| s.item_guid == item_guid).cloned())
    }
}
