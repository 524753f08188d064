use std::fmt;
use std::str::FromStr;

use sensorlink_radio::{ChannelId, MAX_CHANNELS};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RegistryError, Result};

/// Address of a remote sensor node: its 3 to 5 byte radio address in
/// lowercase hex, for example `b3b4b5b6f1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddress(String);

impl NodeAddress {
    const MIN_BYTES: usize = 3;
    const MAX_BYTES: usize = 5;

    /// Validate and normalize an address.
    pub fn new(address: &str) -> Result<Self> {
        let len = address.len();
        let valid = len % 2 == 0
            && (Self::MIN_BYTES * 2..=Self::MAX_BYTES * 2).contains(&len)
            && address.bytes().all(|b| b.is_ascii_hexdigit());
        if !valid {
            return Err(RegistryError::InvalidAddress(address.to_string()));
        }
        Ok(Self(address.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeAddress {
    type Err = RegistryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for NodeAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NodeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Static assignment of receive channels to sensor node addresses.
///
/// Channel `n` listens to the `n`-th configured address. The table never
/// changes after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTable {
    nodes: [Option<NodeAddress>; MAX_CHANNELS as usize],
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign addresses to channels 1, 2, ... in order.
    pub fn from_addresses<S: AsRef<str>>(addresses: &[S]) -> Result<Self> {
        if addresses.len() > MAX_CHANNELS as usize {
            return Err(RegistryError::TooManyNodes {
                count: addresses.len(),
                max: MAX_CHANNELS as usize,
            });
        }
        let mut table = Self::new();
        for (address, channel) in addresses.iter().zip(ChannelId::all()) {
            table.assign(channel, NodeAddress::new(address.as_ref())?);
        }
        Ok(table)
    }

    /// Assign `address` to `channel`, replacing any previous assignment.
    pub fn assign(&mut self, channel: ChannelId, address: NodeAddress) {
        self.nodes[channel.index()] = Some(address);
    }

    /// Node address listening on `channel`.
    pub fn node_address(&self, channel: ChannelId) -> Option<&NodeAddress> {
        self.nodes[channel.index()].as_ref()
    }

    /// Channel listening to `address`.
    pub fn channel_of(&self, address: &NodeAddress) -> Option<ChannelId> {
        self.entries()
            .find(|(_, node)| *node == address)
            .map(|(channel, _)| channel)
    }

    /// Assigned channels in ascending order.
    pub fn entries(&self) -> impl Iterator<Item = (ChannelId, &NodeAddress)> {
        ChannelId::all().filter_map(move |channel| {
            self.node_address(channel).map(|address| (channel, address))
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(n: u8) -> ChannelId {
        ChannelId::new(n).unwrap()
    }

    #[test]
    fn address_validation() {
        assert!(NodeAddress::new("b3b4b5b6f1").is_ok());
        assert!(NodeAddress::new("e7e7e7").is_ok());
        assert_eq!(NodeAddress::new("B3B4B5B6F1").unwrap().as_str(), "b3b4b5b6f1");

        for bad in ["", "b3b4", "b3b4b5b6f1f2", "b3b4b5b6f", "zzb4b5b6f1"] {
            assert!(
                matches!(NodeAddress::new(bad), Err(RegistryError::InvalidAddress(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn table_assigns_channels_in_order() {
        let table = NodeTable::from_addresses(&["b3b4b5b6f1", "b3b4b5b6cd"]).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.node_address(ch(1)).unwrap().as_str(), "b3b4b5b6f1");
        assert_eq!(table.node_address(ch(2)).unwrap().as_str(), "b3b4b5b6cd");
        assert!(table.node_address(ch(3)).is_none());

        let cd = NodeAddress::new("b3b4b5b6cd").unwrap();
        assert_eq!(table.channel_of(&cd), Some(ch(2)));
    }

    #[test]
    fn table_rejects_too_many_nodes() {
        let addresses = ["aaaaaa"; 6];
        assert!(matches!(
            NodeTable::from_addresses(&addresses),
            Err(RegistryError::TooManyNodes { count: 6, max: 5 })
        ));
    }

    #[test]
    fn table_rejects_bad_address() {
        assert!(matches!(
            NodeTable::from_addresses(&["b3b4b5b6f1", "nope"]),
            Err(RegistryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn entries_are_ascending() {
        let mut table = NodeTable::new();
        table.assign(ch(4), NodeAddress::new("444444").unwrap());
        table.assign(ch(2), NodeAddress::new("222222").unwrap());

        let channels: Vec<u8> = table.entries().map(|(c, _)| c.get()).collect();
        assert_eq!(channels, vec![2, 4]);
        assert!(!table.is_empty());
    }

    #[test]
    fn address_serde() {
        let address: NodeAddress = serde_json::from_str(r#""B3B4B5B6F1""#).unwrap();
        assert_eq!(address.to_string(), "b3b4b5b6f1");
        assert!(serde_json::from_str::<NodeAddress>(r#""xyz""#).is_err());
    }
}
