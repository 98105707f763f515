//! Driver client options.

use std::str::FromStr;

use mongodb::options::{AuthMechanism, ClientOptions};

use coto_query::{ConnectOptions, ConnectionError, ConnectionResult, ConnectionUri};

/// Parse `uri` and apply the broker's client settings to it.
pub async fn client_options(
    uri: &ConnectionUri,
    options: &ConnectOptions,
) -> ConnectionResult<ClientOptions> {
    let mut client_options = ClientOptions::parse(uri.expose()).await.map_err(|e| {
        ConnectionError::other(format!(
            "failed to parse connection string {}: {}",
            uri,
            uri.scrub(&e.to_string())
        ))
    })?;
    apply_options(&mut client_options, options)?;
    Ok(client_options)
}

/// Apply timeouts, pool bounds, retry settings, and authentication options.
///
/// The socket timeout is not a driver option in this driver version; the
/// executor enforces it around each operation.
pub fn apply_options(
    client_options: &mut ClientOptions,
    options: &ConnectOptions,
) -> ConnectionResult<()> {
    let client = &options.client;

    client_options.app_name = Some(client.app_name.clone());
    client_options.connect_timeout = Some(client.connect_timeout);
    client_options.server_selection_timeout = Some(client.server_selection_timeout);
    client_options.min_pool_size = Some(client.min_pool_size);
    client_options.max_pool_size = Some(client.max_pool_size);
    client_options.retry_reads = Some(client.retry_reads);
    client_options.retry_writes = Some(client.retry_writes);

    let mechanism = parse_mechanism(&options.auth_mechanism)?;
    if let Some(credential) = client_options.credential.as_mut() {
        credential.source = Some(options.auth_source.clone());
        credential.mechanism = Some(mechanism);
    }
    Ok(())
}

/// Parse an authentication mechanism by its wire name.
pub fn parse_mechanism(name: &str) -> ConnectionResult<AuthMechanism> {
    AuthMechanism::from_str(name).map_err(|_| {
        ConnectionError::other(format!("unsupported authMechanism '{}'", name))
            .with_suggestion("Use SCRAM-SHA-256 or SCRAM-SHA-1")
    })
}
