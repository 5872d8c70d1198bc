//! Installed shops and their plans.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use growth_pilot_core::ShopDomain;
use growth_pilot_core::billing::{self, Plan};

/// An installed shop with its offline access token.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopSession {
    pub shop: ShopDomain,
    pub access_token: SecretString,
    pub scopes: Vec<String>,
    pub installed_at: DateTime<Utc>,
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("installed_at", &self.installed_at)
            .finish()
    }
}

/// The plan a shop is subscribed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopPlan {
    pub plan_id: String,
    pub subscription_id: Option<String>,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl ShopPlan {
    /// The static plan definition. Unknown ids fall back to the free plan.
    #[must_use]
    pub fn plan(&self) -> &'static Plan {
        billing::plan_by_id(&self.plan_id).unwrap_or_else(billing::free_plan)
    }
}
