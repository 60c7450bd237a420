//! Alerts Searcher
//!
//! Polls the alerts search index for documents newer than the last run,
//! forwards each one unchanged to a Kafka topic and records the time of the
//! run in `<homeDir>/searcherState.properties` so the next run resumes from
//! there.

pub mod config;
pub mod connector;
pub mod error;
pub mod job;
pub mod properties;
pub mod publish;
pub mod search;
pub mod state;

pub use config::Config;
pub use connector::{Connector, LiveConnector};
pub use error::{Error, Result};
pub use job::{AlertsSearcher, RunReport};
pub use properties::Properties;
pub use publish::{AlertSink, KafkaSink};
pub use search::{AlertIndex, ElasticsearchIndex, SearchHit, SearchWindow};
pub use state::StateFile;
