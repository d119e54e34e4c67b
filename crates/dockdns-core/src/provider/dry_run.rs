//! Dry-run decorator
//!
//! Wraps any [`DnsProvider`]: reads pass through, writes are logged and the
//! input record is echoed back unchanged.

use crate::error::Result;
use crate::record::{Record, RecordType};
use crate::traits::DnsProvider;
use async_trait::async_trait;
use tracing::info;

pub struct DryRunProvider {
    inner: Box<dyn DnsProvider>,
}

impl DryRunProvider {
    pub fn new(inner: Box<dyn DnsProvider>) -> Self {
        Self { inner }
    }

    fn log_action(action: &str, record: &Record) {
        info!(
            id = %record.id,
            name = %record.name,
            record_type = %record.record_type,
            content = %record.content,
            ttl = record.ttl,
            proxied = record.proxied,
            "DRY RUN {}",
            action
        );
    }
}

#[async_trait]
impl DnsProvider for DryRunProvider {
    async fn list(&self) -> Result<Vec<Record>> {
        self.inner.list().await
    }

    async fn get(&self, name: &str, record_type: RecordType) -> Result<Option<Record>> {
        self.inner.get(name, record_type).await
    }

    async fn create(&self, record: Record) -> Result<Record> {
        Self::log_action("CREATE", &record);
        Ok(record)
    }

    async fn update(&self, record: Record) -> Result<Record> {
        Self::log_action("UPDATE", &record);
        Ok(record)
    }

    async fn delete(&self, record: &Record) -> Result<()> {
        Self::log_action("DELETE", record);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}
