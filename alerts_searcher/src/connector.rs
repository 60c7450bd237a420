//! Per-run acquisition of the search index and queue connections.

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::publish::{AlertSink, KafkaSink};
use crate::search::{AlertIndex, ElasticsearchIndex};

/// Opens the collaborators of a single run. Whatever is returned is dropped
/// when the run ends, releasing its connection.
#[async_trait]
pub trait Connector: Send + Sync {
    type Index: AlertIndex;
    type Sink: AlertSink;

    async fn connect_index(&self, config: &Config) -> Result<Self::Index>;

    async fn connect_sink(&self, config: &Config) -> Result<Self::Sink>;
}

/// Elasticsearch for lookups, Kafka for forwarding.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveConnector;

#[async_trait]
impl Connector for LiveConnector {
    type Index = ElasticsearchIndex;
    type Sink = KafkaSink;

    async fn connect_index(&self, config: &Config) -> Result<ElasticsearchIndex> {
        ElasticsearchIndex::new(&config.search)
    }

    async fn connect_sink(&self, config: &Config) -> Result<KafkaSink> {
        KafkaSink::connect(&config.kafka).await
    }
}
