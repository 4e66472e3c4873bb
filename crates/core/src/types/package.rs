//! Enrollment packages.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::price::Price;

/// Enrollment tier forwarded to the payment-link request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageType {
    /// Full program at the regular price.
    Regular,
    /// Reduced-price pre-enrollment.
    Demo,
}

/// Unknown package type in form input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown package type: {0}")]
pub struct PackageTypeError(pub String);

impl PackageType {
    /// Wire value expected by the payment-link endpoint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "Regular",
            Self::Demo => "Demo",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = PackageTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(Self::Regular),
            "demo" => Ok(Self::Demo),
            _ => Err(PackageTypeError(s.to_owned())),
        }
    }
}

/// Catalog entry shown on a pricing card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub package_type: PackageType,
    pub label: &'static str,
    pub price: Price,
    /// Per-installment price when the package can be split.
    pub installment: Option<Installment>,
}

/// A split payment plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Installment {
    pub count: u8,
    pub price: Price,
}

impl Package {
    /// The catalog entry for a package type.
    #[must_use]
    pub fn for_type(package_type: PackageType) -> Self {
        match package_type {
            PackageType::Regular => Self {
                package_type,
                label: "Enroll Now",
                price: Price::inr(2_999),
                installment: Some(Installment {
                    count: 2,
                    price: Price::inr(1_499),
                }),
            },
            PackageType::Demo => Self {
                package_type,
                label: "Pre-Enrollment",
                price: Price::inr(499),
                installment: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("regular".parse::<PackageType>().unwrap(), PackageType::Regular);
        assert_eq!(" DEMO ".parse::<PackageType>().unwrap(), PackageType::Demo);
        assert!("premium".parse::<PackageType>().is_err());
    }

    #[test]
    fn test_serializes_as_wire_value() {
        assert_eq!(
            serde_json::to_string(&PackageType::Regular).unwrap(),
            "\"Regular\""
        );
        assert_eq!(serde_json::to_string(&PackageType::Demo).unwrap(), "\"Demo\"");
    }

    #[test]
    fn test_catalog_prices() {
        let regular = Package::for_type(PackageType::Regular);
        assert_eq!(regular.price.display(), "₹2,999");
        let split = regular.installment.unwrap();
        assert_eq!((split.count, split.price.display().as_str()), (2, "₹1,499"));

        let demo = Package::for_type(PackageType::Demo);
        assert_eq!(demo.price.display(), "₹499");
        assert!(demo.installment.is_none());
    }
}
