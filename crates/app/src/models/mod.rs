//! Domain models persisted by the app.

pub mod session;
pub mod settings;
pub mod shop;

pub use session::CurrentShop;
pub use settings::{AiFrequency, AiSettings, NotificationSettings, ReportFrequency, ShopSettings};
pub use shop::{ShopPlan, ShopSession};
