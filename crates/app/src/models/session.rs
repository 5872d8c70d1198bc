//! Types stored in the browser session.

use serde::{Deserialize, Serialize};

use growth_pilot_core::ShopDomain;

/// The shop the browser session is signed in to.
///
/// Only the domain lives in the session. The access token stays in
/// `shop_sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentShop {
    pub shop: ShopDomain,
}

/// Session keys.
pub mod keys {
    /// Key for the signed-in shop.
    pub const CURRENT_SHOP: &str = "current_shop";

    /// Key for the OAuth `state` nonce between login and callback.
    pub const OAUTH_STATE: &str = "oauth_state";
}
