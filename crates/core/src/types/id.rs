//! Newtype IDs for Shopify global IDs.
//!
//! Shopify identifies every resource with a GID such as
//! `gid://shopify/Order/5512345678`. Use the `define_gid!` macro to create
//! type-safe wrappers so order, product and customer IDs cannot be mixed up.

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe Shopify GID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `numeric_id()`
/// - `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use growth_pilot_core::define_gid;
/// define_gid!(OrderId);
///
/// let id = OrderId::new("gid://shopify/Order/42");
/// assert_eq!(id.numeric_id(), Some(42));
/// ```
#[macro_export]
macro_rules! define_gid {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a GID string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying GID string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The trailing numeric part of the GID, if any.
            #[must_use]
            pub fn numeric_id(&self) -> Option<u64> {
                self.0.rsplit('/').next().and_then(|s| s.parse().ok())
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

define_gid!(OrderId);
define_gid!(ProductId);
define_gid!(CustomerId);
define_gid!(CheckoutId);
define_gid!(SubscriptionId);

/// A validated `*.myshopify.com` shop domain.
///
/// Shop domains key every persisted row, so they are normalized to lowercase
/// on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

/// Error returned when a string is not a valid shop domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid shop domain: {0}")]
pub struct InvalidShopDomain(pub String);

impl ShopDomain {
    const SUFFIX: &'static str = ".myshopify.com";

    /// Parse and validate a shop domain.
    ///
    /// Accepts `name.myshopify.com` where `name` is ASCII alphanumeric or `-`
    /// and does not start with `-`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidShopDomain` if the input is not a myshopify domain.
    pub fn parse(input: &str) -> Result<Self, InvalidShopDomain> {
        let normalized = input.trim().to_ascii_lowercase();
        let Some(name) = normalized.strip_suffix(Self::SUFFIX) else {
            return Err(InvalidShopDomain(input.to_owned()));
        };

        let valid = !name.is_empty()
            && !name.starts_with('-')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

        if valid {
            Ok(Self(normalized))
        } else {
            Err(InvalidShopDomain(input.to_owned()))
        }
    }

    /// Get the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The store handle without the `.myshopify.com` suffix.
    #[must_use]
    pub fn handle(&self) -> &str {
        self.0.strip_suffix(Self::SUFFIX).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = InvalidShopDomain;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(domain: ShopDomain) -> Self {
        domain.0
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = InvalidShopDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "postgres")]
impl ::sqlx::Type<::sqlx::Postgres> for ShopDomain {
    fn type_info() -> ::sqlx::postgres::PgTypeInfo {
        <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
        <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for ShopDomain {
    fn decode(
        value: ::sqlx::postgres::PgValueRef<'r>,
    ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
        let raw = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&raw)?)
    }
}

#[cfg(feature = "postgres")]
impl ::sqlx::Encode<'_, ::sqlx::Postgres> for ShopDomain {
    fn encode_by_ref(
        &self,
        buf: &mut ::sqlx::postgres::PgArgumentBuffer,
    ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
        <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gid_numeric_id() {
        let id = ProductId::new("gid://shopify/Product/123456");
        assert_eq!(id.numeric_id(), Some(123_456));
        assert_eq!(id.to_string(), "gid://shopify/Product/123456");

        let bad = ProductId::new("not-a-gid");
        assert_eq!(bad.numeric_id(), None);
    }

    #[test]
    fn test_shop_domain_valid() {
        let shop = ShopDomain::parse("My-Store.myshopify.com").unwrap();
        assert_eq!(shop.as_str(), "my-store.myshopify.com");
        assert_eq!(shop.handle(), "my-store");
    }

    #[test]
    fn test_shop_domain_rejects_foreign_hosts() {
        assert!(ShopDomain::parse("evil.com").is_err());
        assert!(ShopDomain::parse("evil.com/.myshopify.com").is_err());
        assert!(ShopDomain::parse(".myshopify.com").is_err());
        assert!(ShopDomain::parse("-store.myshopify.com").is_err());
        assert!(ShopDomain::parse("store.myshopify.com.evil.com").is_err());
    }

    #[test]
    fn test_shop_domain_serde() {
        let shop: ShopDomain = serde_json::from_str("\"store.myshopify.com\"").unwrap();
        assert_eq!(shop.handle(), "store");
        assert!(serde_json::from_str::<ShopDomain>("\"store.example.com\"").is_err());
    }
}
