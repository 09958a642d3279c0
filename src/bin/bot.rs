use anyhow::{Context, Result};
use dotenvy::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use tmi_relay::commands::{create_all_handlers, CommandRegistry, CommandRouter, ShoutoutHandler};
use tmi_relay::core::{CommandConfig, Config};
use tmi_relay::helix::transport::DEFAULT_TIMEOUT;
use tmi_relay::helix::{
    HelixClient, JsonFileSecretStore, OAuthCredential, ReqwestTransport, RetryScheduler,
    SecretStore,
};
use tmi_relay::irc::{Session, SessionConfig, TcpConnector};
use tmi_relay::orchestrator::Orchestrator;
use tmi_relay::relay::{ChannelRelay, NoopRelay, RelaySink};

fn load_command_config(config: &Config) -> Result<CommandConfig> {
    match &config.commands_path {
        Some(path) => {
            let commands = CommandConfig::load(path)
                .with_context(|| format!("Failed to load command config from {path}"))?;
            info!(
                "📄 Loaded command config from {path} \
                 ({} public, {} whitelisted, {} private, {} canned)",
                commands.public.len(),
                commands.whitelisted.len(),
                commands.private.len(),
                commands.responses.len()
            );
            Ok(commands)
        }
        None => {
            info!("COMMANDS_CONFIG not set, using default command config");
            Ok(CommandConfig::default())
        }
    }
}

/// Helix client, when client credentials and a stored token are available
fn build_helix(config: &Config) -> Result<Option<Arc<HelixClient>>> {
    let Some(client_id) = config.client_id.clone() else {
        info!("Helix client disabled (TWITCH_CLIENT_ID not set)");
        return Ok(None);
    };

    let store: Arc<dyn SecretStore> = Arc::new(JsonFileSecretStore::open(&config.secrets_path)?);
    let Some(credential) = OAuthCredential::load(store.as_ref()) else {
        warn!(
            "Helix client disabled: no access token in {}",
            config.secrets_path
        );
        return Ok(None);
    };

    let transport = Arc::new(ReqwestTransport::new(DEFAULT_TIMEOUT)?);
    let mut client = HelixClient::new(client_id, credential, store, transport)
        .with_scheduler(Arc::new(RetryScheduler::new()));
    match &config.client_secret {
        Some(secret) => client = client.with_client_secret(secret.clone()),
        None => warn!("TWITCH_CLIENT_SECRET not set, token refresh will fail"),
    }
    Ok(Some(Arc::new(client)))
}

/// Look up the bot's own user id as a startup check of the Helix credentials
async fn resolve_bot_user(helix: &HelixClient, login: &str) -> Option<String> {
    match helix.user_id(login).await {
        Ok(Some(id)) => {
            info!("🆔 Helix ready, {login} has user id {id}");
            Some(id)
        }
        Ok(None) => {
            warn!("Helix returned no user for {login}");
            None
        }
        Err(e) => {
            warn!("Helix startup check failed: {e}");
            None
        }
    }
}

fn build_relay(config: &Config) -> Arc<dyn RelaySink> {
    if !config.relay_enabled {
        return Arc::new(NoopRelay);
    }

    let (relay, mut rx) = ChannelRelay::new();
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            info!(target: "relay", "{}", message.text);
        }
    });
    info!("📡 Relay enabled");
    Arc::new(relay)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!(
        "Starting tmi-relay v{} as {}",
        env!("CARGO_PKG_VERSION"),
        config.nickname
    );

    let commands = load_command_config(&config)?;

    let mut registry = CommandRegistry::new();
    for handler in create_all_handlers(&commands) {
        registry.register(handler);
    }

    if let Some(helix) = build_helix(&config)? {
        match resolve_bot_user(&helix, &config.nickname).await {
            Some(bot_id) => registry.register(Arc::new(ShoutoutHandler::new(helix, bot_id))),
            None => warn!("Shoutouts disabled, bot user id unknown"),
        }
    }
    info!("📋 Registered commands: {}", registry.command_names().join(", "));
    let router = CommandRouter::new(Arc::new(commands), registry, build_relay(&config));

    let mut session_config = SessionConfig::new(&config.nickname, &config.secret);
    session_config.reconnect_delay = Duration::from_secs(config.reconnect_delay_secs);
    let session = Session::new(session_config, Arc::new(TcpConnector::new(&config.server)))
        .with_channels(&config.channels);

    let mut orchestrator = Orchestrator::new(session, router);
    let shutdown = orchestrator.shutdown_handle();
    let mut bot = tokio::spawn(async move { orchestrator.run().await });

    tokio::select! {
        result = &mut bot => {
            if let Err(e) = result? {
                error!("❌ Bot stopped: {e}");
                return Err(e.into());
            }
            info!("Session ended");
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Ctrl-C received, shutting down");
            shutdown.shutdown();
        }
    }

    bot.await??;
    info!("👋 Goodbye");
    Ok(())
}
