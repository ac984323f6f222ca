mod app;
mod auth;
mod cache;
mod cart;
mod commands;
mod commerce;
mod config;
mod event;
mod gateway;
mod logging;
mod query;
mod store;
mod sync;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::{App, AppContext};
use crate::auth::{IdentityProvider, Session};
use crate::cache::NormalizedCache;
use crate::cart::Cart;
use crate::commerce::CommerceClient;
use crate::gateway::{Gateway, HttpTransport};
use crate::store::{KeyValueStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "shopterm")]
#[command(about = "A terminal storefront for shoppers, warehouse staff and drivers")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/shopterm/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log filter, e.g. debug or shopterm=trace
  #[arg(long)]
  log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log, args.log_level.as_deref())?;
  tracing::info!(endpoint = %config.api.endpoint, "Starting shopterm");

  // Local state
  let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(config.storage.path.as_deref())?);
  let session = Arc::new(Session::load(store.clone())?);
  let cart = Cart::load(store)?;

  // Remote access
  let transport = HttpTransport::new(&config.api.endpoint).map_err(|e| eyre!(e))?;
  let gateway = Gateway::new(Arc::new(transport), session.clone(), config.api.auth_scheme);
  let commerce = CommerceClient::new(gateway, NormalizedCache::new());
  let identity = Arc::new(IdentityProvider::new(config.identity.clone())?);

  let ctx = AppContext {
    commerce,
    session,
    identity,
    cart,
  };

  // Initialize and run the app
  let mut app = App::new(ctx, config.display_title());
  app.run().await?;

  Ok(())
}
