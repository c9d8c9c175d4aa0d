use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::explorer::Address;
use crate::explorer_config::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Exchange,
    Mixer,
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnownEntity {
    pub address: Address,
    pub label: String,
    pub kind: EntityKind,
}

// Labelled mainnet addresses shipped with the crate. Coverage is partial:
// anything unlisted is simply unknown.
const BUILTIN_ENTITIES: &[(&str, &str, EntityKind)] = &[
    ("0x28c6c06298d514db089934071355e5743bf21d60", "Binance 14", EntityKind::Exchange),
    ("0xbe0eb53f46cd790cd13851d5eff43d12404d33e8", "Binance 7", EntityKind::Exchange),
    ("0xa090e606e30bd747d4e6245a1517ebe430f0057e", "Gemini", EntityKind::Exchange),
    ("0x6cc5f688a315f3dc28a7781717a9a798a59fda7b", "OKX", EntityKind::Exchange),
    ("0x564286362092d8e7936f0549571a803b203aaced", "FTX", EntityKind::Exchange),
    ("0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae", "Ethereum Foundation", EntityKind::Other),
    ("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", "WETH Contract", EntityKind::Other),
    ("0x12d66f87a04a9e220743712ce6d9bb1b5616b8fc", "Tornado Cash 0.1 ETH", EntityKind::Mixer),
    ("0x47ce0c6ed5b0ce3d3a51fdb1c52dc66a7c3c2936", "Tornado Cash 1 ETH", EntityKind::Mixer),
    ("0x910cbd523d972eb0a6f4cae4618ad62622b39dbf", "Tornado Cash 10 ETH", EntityKind::Mixer),
    ("0xa160cdab225685da1d56aa342ad8841c3b53f291", "Tornado Cash 100 ETH", EntityKind::Mixer),
];

/// Read-only address → label lookup, insertion ordered.
#[derive(Clone, Debug, Default)]
pub struct KnownEntityRegistry {
    entities: Vec<KnownEntity>,
    index: HashMap<Address, usize>,
}

impl KnownEntityRegistry {
    pub fn new(entities: impl IntoIterator<Item = KnownEntity>) -> Self {
        let mut registry = Self::default();
        for entity in entities {
            registry.insert(entity);
        }
        registry
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_ENTITIES.iter().filter_map(|(address, label, kind)| {
            Address::parse(address).ok().map(|address| KnownEntity {
                address,
                label: label.to_string(),
                kind: *kind,
            })
        }))
    }

    /// Built-in entries extended (or relabelled) by a JSON array of
    /// `{ "address", "label", "kind" }` objects.
    pub fn builtin_with_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let extra: Vec<KnownEntity> =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut registry = Self::builtin();
        for entity in extra {
            registry.insert(entity);
        }
        log::info!("Loaded {} known entities", registry.len());
        Ok(registry)
    }

    fn insert(&mut self, entity: KnownEntity) {
        match self.index.get(&entity.address) {
            Some(&slot) => self.entities[slot] = entity,
            None => {
                self.index.insert(entity.address.clone(), self.entities.len());
                self.entities.push(entity);
            }
        }
    }

    pub fn get(&self, address: &Address) -> Option<&KnownEntity> {
        self.index.get(address).map(|&slot| &self.entities[slot])
    }

    pub fn label(&self, address: &Address) -> Option<&str> {
        self.get(address).map(|entity| entity.label.as_str())
    }

    pub fn exchange_name(&self, address: &Address) -> Option<&str> {
        self.get(address)
            .filter(|entity| entity.kind == EntityKind::Exchange)
            .map(|entity| entity.label.as_str())
    }

    pub fn is_exchange(&self, address: &Address) -> bool {
        self.exchange_name(address).is_some()
    }

    pub fn is_mixer(&self, address: &Address) -> bool {
        self.get(address)
            .is_some_and(|entity| entity.kind == EntityKind::Mixer)
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &KnownEntity> {
        self.entities
            .iter()
            .filter(|entity| entity.kind == EntityKind::Exchange)
    }

    /// Exchanges and labelled non-mixer addresses, in registry order.
    pub fn monitored(&self) -> impl Iterator<Item = &KnownEntity> {
        self.entities
            .iter()
            .filter(|entity| entity.kind != EntityKind::Mixer)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
