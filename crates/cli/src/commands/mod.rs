//! CLI subcommands.

pub mod migrate;
pub mod plans;
pub mod shops;

use secrecy::SecretString;

/// `DATABASE_URL` from the environment or `.env`.
pub(crate) fn database_url() -> Result<SecretString, std::env::VarError> {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").map(SecretString::from)
}
