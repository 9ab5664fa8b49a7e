use std::sync::Arc;

use color_eyre::eyre::Context;

use crate::{authorization::Authorizer, config::Config, subscription::SubscriptionClient};

#[derive(Clone)]
pub struct AppState {
    pub client: SubscriptionClient,
    pub authorizer: Arc<Authorizer>,
}

pub fn setup(config: &Config) -> color_eyre::Result<AppState> {
    let client = SubscriptionClient::from_config(&config.soap)
        .wrap_err("Failed to build subscription service client")?;

    if config.soap.validate_literals.approved.is_empty() {
        tracing::warn!(
            "No approved literals configured for {}; every authorization check will be denied",
            config.soap.validate_operation
        );
    }

    let authorizer = Authorizer::from_config(client.clone(), &config.cache);
    Ok(AppState {
        client,
        authorizer: Arc::new(authorizer),
    })
}
