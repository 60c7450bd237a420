//! Typed job configuration built from a flat [`Properties`] mapping.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use kafka::producer::RequiredAcks;

use crate::error::{Error, Result};
use crate::properties::Properties;

pub const HOME_DIR: &str = "homeDir";
pub const ES_HOST_NAME: &str = "elasticSearchHostName";
pub const ES_HOST_PORT: &str = "elasticSearchHostPort";
pub const ES_INDEX_NAME: &str = "elasticSearchIndexName";
pub const ES_DOC_TYPE: &str = "elasticSearchDocType";
pub const ES_TIMEOUT_SECS: &str = "elasticSearchTimeoutSecs";
pub const SEARCH_PAGE_SIZE: &str = "searchPageSize";
pub const KAFKA_BROKER_HOST_NAME: &str = "kafkaBrokerHostName";
pub const KAFKA_BROKER_HOST_PORT: &str = "kafkaBrokerHostPort";
pub const KAFKA_TOPIC_NAME: &str = "kafkaTopicName";
pub const KAFKA_REQUIRED_ACKS: &str = "kafkaRequiredAcks";
pub const KAFKA_ACK_TIMEOUT_MILLIS: &str = "kafkaAckTimeoutMillis";
pub const RUN_TIMEOUT_SECS: &str = "runTimeoutSecs";

/// Acknowledgment level the producer waits for on each send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acks {
    /// Do not wait for the broker at all
    None,
    /// Wait for the partition leader
    Leader,
    /// Wait for all in-sync replicas
    All,
}

impl Acks {
    pub fn as_required_acks(self) -> RequiredAcks {
        match self {
            Acks::None => RequiredAcks::None,
            Acks::Leader => RequiredAcks::One,
            Acks::All => RequiredAcks::All,
        }
    }
}

impl FromStr for Acks {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "none" => Ok(Acks::None),
            "1" | "leader" => Ok(Acks::Leader),
            "-1" | "all" => Ok(Acks::All),
            other => Err(Error::config(
                KAFKA_REQUIRED_ACKS,
                format!("expected 0, 1 or all, got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub host: String,
    pub port: u16,
    pub index: String,
    /// Empty selects the typeless search endpoint
    pub doc_type: String,
    pub page_size: usize,
    pub request_timeout: Duration,
}

impl SearchConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub required_acks: Acks,
    pub ack_timeout: Duration,
}

impl KafkaConfig {
    pub fn broker(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Everything one run needs. Built once by the host and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub home_dir: PathBuf,
    pub search: SearchConfig,
    pub kafka: KafkaConfig,
    pub run_timeout: Duration,
}

impl Config {
    pub fn from_properties(props: &Properties) -> Result<Self> {
        let home_dir = props
            .get(HOME_DIR)
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .ok_or_else(|| Error::config(HOME_DIR, "required key is missing"))?;

        let search = SearchConfig {
            host: props.get_or(ES_HOST_NAME, "localhost").trim().to_string(),
            port: parse_key(props, ES_HOST_PORT, "9300")?,
            index: props.get_or(ES_INDEX_NAME, "alerts").trim().to_string(),
            doc_type: props.get_or(ES_DOC_TYPE, "alert").trim().to_string(),
            page_size: positive(props, SEARCH_PAGE_SIZE, "100")?,
            request_timeout: Duration::from_secs(positive(props, ES_TIMEOUT_SECS, "30")?),
        };

        let kafka = KafkaConfig {
            host: props
                .get_or(KAFKA_BROKER_HOST_NAME, "localhost")
                .trim()
                .to_string(),
            port: parse_key(props, KAFKA_BROKER_HOST_PORT, "9092")?,
            topic: props.get_or(KAFKA_TOPIC_NAME, "test").trim().to_string(),
            required_acks: props.get_or(KAFKA_REQUIRED_ACKS, "1").parse()?,
            ack_timeout: Duration::from_millis(positive(props, KAFKA_ACK_TIMEOUT_MILLIS, "1000")?),
        };

        if kafka.topic.is_empty() {
            return Err(Error::config(KAFKA_TOPIC_NAME, "topic name is empty"));
        }

        Ok(Self {
            home_dir: normalize_home_dir(home_dir),
            search,
            kafka,
            run_timeout: Duration::from_secs(positive(props, RUN_TIMEOUT_SECS, "300")?),
        })
    }
}

/// Strips trailing slashes, keeping a lone `/` intact.
pub fn normalize_home_dir(dir: &str) -> PathBuf {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() && dir.starts_with('/') {
        PathBuf::from("/")
    } else {
        PathBuf::from(trimmed)
    }
}

fn parse_key<T>(props: &Properties, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = props.get_or(key, default).trim();
    raw.parse()
        .map_err(|e| Error::config(key, format!("'{raw}': {e}")))
}

fn positive<T>(props: &Properties, key: &str, default: &str) -> Result<T>
where
    T: FromStr + Default + PartialOrd,
    T::Err: std::fmt::Display,
{
    let value: T = parse_key(props, key, default)?;
    if value <= T::default() {
        return Err(Error::config(key, "must be greater than zero"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs.iter().copied().collect()
    }

    #[test]
    fn applies_defaults() {
        let config = Config::from_properties(&props(&[(HOME_DIR, "/opt/alerts")])).unwrap();

        assert_eq!(config.home_dir, PathBuf::from("/opt/alerts"));
        assert_eq!(config.search.base_url(), "http://localhost:9300");
        assert_eq!(config.search.index, "alerts");
        assert_eq!(config.search.doc_type, "alert");
        assert_eq!(config.search.page_size, 100);
        assert_eq!(config.kafka.broker(), "localhost:9092");
        assert_eq!(config.kafka.topic, "test");
        assert_eq!(config.kafka.required_acks, Acks::Leader);
        assert_eq!(config.run_timeout, Duration::from_secs(300));
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_properties(&props(&[
            (HOME_DIR, "/opt/alerts/"),
            (ES_HOST_NAME, "es.internal"),
            (ES_HOST_PORT, "9200"),
            (ES_DOC_TYPE, ""),
            (KAFKA_BROKER_HOST_NAME, "kafka.internal"),
            (KAFKA_BROKER_HOST_PORT, "19092"),
            (KAFKA_TOPIC_NAME, "alerts"),
            (KAFKA_REQUIRED_ACKS, "all"),
        ]))
        .unwrap();

        assert_eq!(config.home_dir, PathBuf::from("/opt/alerts"));
        assert_eq!(config.search.base_url(), "http://es.internal:9200");
        assert_eq!(config.search.doc_type, "");
        assert_eq!(config.kafka.broker(), "kafka.internal:19092");
        assert_eq!(config.kafka.topic, "alerts");
        assert_eq!(config.kafka.required_acks, Acks::All);
    }

    #[test]
    fn missing_home_dir_is_rejected() {
        let err = Config::from_properties(&Properties::new()).unwrap_err();
        assert!(matches!(err, Error::Config { ref key, .. } if key == HOME_DIR));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = Config::from_properties(&props(&[(HOME_DIR, "/tmp"), (ES_HOST_PORT, "93000")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config { ref key, .. } if key == ES_HOST_PORT));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = Config::from_properties(&props(&[(HOME_DIR, "/tmp"), (SEARCH_PAGE_SIZE, "0")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config { ref key, .. } if key == SEARCH_PAGE_SIZE));
    }

    #[test]
    fn parses_ack_levels() {
        assert_eq!("0".parse::<Acks>().unwrap(), Acks::None);
        assert_eq!("1".parse::<Acks>().unwrap(), Acks::Leader);
        assert_eq!("-1".parse::<Acks>().unwrap(), Acks::All);
        assert_eq!("ALL".parse::<Acks>().unwrap(), Acks::All);
        assert!("2".parse::<Acks>().is_err());
    }

    #[test]
    fn normalizes_trailing_slashes() {
        assert_eq!(normalize_home_dir("/var/state/"), PathBuf::from("/var/state"));
        assert_eq!(normalize_home_dir("/var/state//"), PathBuf::from("/var/state"));
        assert_eq!(normalize_home_dir("relative"), PathBuf::from("relative"));
        assert_eq!(normalize_home_dir("/"), PathBuf::from("/"));
    }
}
