//! IPv4 CIDR blocks

use crate::error::{Result, StackError};
use ipnet::Ipv4Net;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A canonical IPv4 CIDR block (no host bits set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cidr(Ipv4Net);

impl Cidr {
    /// `0.0.0.0/0`
    pub fn any_ipv4() -> Self {
        Self(Ipv4Net::default())
    }

    pub fn net(&self) -> Ipv4Net {
        self.0
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }

    pub fn is_any(&self) -> bool {
        self.0.prefix_len() == 0
    }

    /// Whether `other` lies entirely inside this block
    pub fn contains(&self, other: &Cidr) -> bool {
        self.0.contains(&other.0)
    }

    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.0.contains(&other.0) || other.0.contains(&self.0)
    }
}

impl FromStr for Cidr {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        let net: Ipv4Net = s.parse().map_err(|e: ipnet::AddrParseError| StackError::InvalidCidr {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        if net.trunc() != net {
            return Err(StackError::InvalidCidr {
                value: s.to_string(),
                reason: format!("host bits set, did you mean {}?", net.trunc()),
            });
        }

        Ok(Self(net))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Cidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cidr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> Cidr {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(cidr("10.0.10.0/24").to_string(), "10.0.10.0/24");
        assert_eq!(Cidr::any_ipv4().to_string(), "0.0.0.0/0");
        assert!(Cidr::any_ipv4().is_any());
    }

    #[test]
    fn test_rejects_host_bits() {
        let err = "10.0.0.1/16".parse::<Cidr>().unwrap_err();
        assert!(matches!(err, StackError::InvalidCidr { .. }));
        assert!(err.to_string().contains("10.0.0.0/16"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("10.0.0.0".parse::<Cidr>().is_err());
        assert!("10.0.0.0/33".parse::<Cidr>().is_err());
        assert!("vpc".parse::<Cidr>().is_err());
    }

    #[test]
    fn test_contains_and_overlaps() {
        let vpc = cidr("10.0.0.0/16");
        let a = cidr("10.0.10.0/24");
        let b = cidr("10.0.20.0/24");
        let wide = cidr("10.0.0.0/8");

        assert!(vpc.contains(&a));
        assert!(!a.contains(&vpc));
        assert!(!vpc.contains(&wide));
        assert!(!a.overlaps(&b));
        assert!(vpc.overlaps(&a));
        assert!(a.overlaps(&vpc));
        assert!(!vpc.contains(&cidr("192.168.0.0/24")));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&cidr("10.0.30.0/24")).unwrap();
        assert_eq!(json, "\"10.0.30.0/24\"");
        let back: Cidr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cidr("10.0.30.0/24"));
        assert!(serde_json::from_str::<Cidr>("\"10.0.30.1/24\"").is_err());
    }
}
