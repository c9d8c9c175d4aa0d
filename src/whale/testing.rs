//! Fixtures for the whale engine tests.

use crate::explorer::testing::client_with;
use crate::explorer::transport::MockTransport;
use crate::explorer::{Address, ExplorerClient};
use crate::strategy::ActivityScorer;

use super::config::WhaleConfig;
use super::profile::ProfileBuilder;
use super::registry::{EntityKind, KnownEntity, KnownEntityRegistry};

pub struct Fixture {
    pub client: ExplorerClient,
    pub registry: KnownEntityRegistry,
    pub scorer: ActivityScorer,
    pub config: WhaleConfig,
}

impl Fixture {
    pub fn new(transport: MockTransport, registry: KnownEntityRegistry) -> Self {
        Self::with_config(transport, registry, WhaleConfig::default())
    }

    pub fn with_config(
        transport: MockTransport,
        registry: KnownEntityRegistry,
        config: WhaleConfig,
    ) -> Self {
        Self {
            client: client_with(transport),
            registry,
            scorer: ActivityScorer::new(config.scoring.clone()),
            config,
        }
    }

    pub fn profiles(&self) -> ProfileBuilder<'_> {
        ProfileBuilder::new(&self.client, &self.registry, &self.scorer, &self.config)
    }
}

pub fn addr(value: &str) -> Address {
    Address::parse(value).unwrap()
}

pub fn entity(address: &str, label: &str, kind: EntityKind) -> KnownEntity {
    KnownEntity {
        address: addr(address),
        label: label.to_string(),
        kind,
    }
}
