use crate::api::{self, handlers::auth::state::AuthConfig};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: SecretString,
    pub allowed_origins: Vec<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the listener fails.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        port = args.port,
        origins = args.allowed_origins.len(),
        "starting server"
    );

    let auth_config = AuthConfig::new(args.token_secret);

    api::serve(args.port, args.dsn, auth_config, &args.allowed_origins).await
}
