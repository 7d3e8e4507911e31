//! Cubix Core
//!
//! Runtime orchestration: webhook ingress, conversation engine, and
//! Evolution API egress wired together over the event bus

pub mod engine;
pub mod menu;
pub mod session;

use anyhow::{Context, Result};
use cubix_catalog::resolve::ImageDir;
use cubix_catalog::Catalog;
use cubix_config::Config;
use cubix_ipc::{Envelope, EventBus, OutboundMessage};
use cubix_whatsapp::webhook::{self, WebhookState};
use cubix_whatsapp::EvolutionClient;
use session::SessionStore;
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tracing::{error, info, warn};

const MAX_INBOUND_CONCURRENCY: usize = 8;

pub struct CubixRuntime {
    config: Config,
    catalog: Arc<Catalog>,
    assets: Arc<ImageDir>,
    sessions: Arc<SessionStore>,
    event_bus: EventBus,
}

impl CubixRuntime {
    pub fn new(config: Config) -> Result<Self> {
        let catalog = Catalog::load(&config.catalog.algorithms_file).with_context(|| {
            format!(
                "failed to load algorithm catalog from {}",
                config.catalog.algorithms_file
            )
        })?;
        info!(
            "Catalog loaded: {} F2L, {} OLL, {} PLL cases",
            catalog.case_count(cubix_catalog::Category::F2l),
            catalog.case_count(cubix_catalog::Category::Oll),
            catalog.case_count(cubix_catalog::Category::Pll),
        );

        let assets = ImageDir::new(config.catalog.images_dir.clone());

        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            assets: Arc::new(assets),
            sessions: Arc::new(SessionStore::new()),
            event_bus: EventBus::new(),
        })
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub async fn run(&self) -> Result<()> {
        info!("Cubix runtime starting...");

        let client = EvolutionClient::new(&self.config.evolution);
        let outbound_rx = self.event_bus.outbound_subscribe();
        tokio::spawn(async move {
            client.run_outbound_handler(outbound_rx).await;
        });

        // Subscribe before the webhook goes live so no early event finds
        // the bus without a consumer.
        let mut inbound_rx = self.event_bus.subscribe();
        let outbound_tx = self.event_bus.outbound_sender();

        let webhook_state = Arc::new(WebhookState {
            bus: self.event_bus.clone(),
            dashboard_url: self.config.dashboard_url(),
        });
        let bind = self.config.server.bind.clone();
        tokio::spawn(async move {
            if let Err(e) = webhook::serve(&bind, webhook_state).await {
                error!("Webhook server terminated: {}", e);
            }
        });
        let semaphore = Arc::new(Semaphore::new(MAX_INBOUND_CONCURRENCY));

        loop {
            match inbound_rx.recv().await {
                Ok(envelope) => {
                    let catalog = Arc::clone(&self.catalog);
                    let assets = Arc::clone(&self.assets);
                    let sessions = Arc::clone(&self.sessions);
                    let outbound = outbound_tx.clone();
                    let semaphore = Arc::clone(&semaphore);
                    let trace_id = envelope.trace_id.clone();

                    tokio::spawn(async move {
                        let _permit = match semaphore.acquire_owned().await {
                            Ok(permit) => permit,
                            Err(err) => {
                                error!(
                                    "Inbound worker semaphore closed (trace_id={}): {}",
                                    trace_id, err
                                );
                                return;
                            }
                        };

                        Self::process_inbound(&catalog, &assets, &sessions, &outbound, envelope)
                            .await;
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Inbound channel closed, runtime stopping");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Inbound processor lagged; skipped {} events", skipped);
                }
            }
        }

        Ok(())
    }

    /// Runs one inbound event through the state machine. The session lock
    /// is held from load to publish so that events from the same sender
    /// never interleave; the wire sends themselves happen later in the
    /// outbound handler and never roll back a committed transition.
    async fn process_inbound(
        catalog: &Catalog,
        assets: &ImageDir,
        sessions: &SessionStore,
        outbound: &broadcast::Sender<OutboundMessage>,
        envelope: Envelope,
    ) {
        let handle = sessions.handle_for(&envelope.sender).await;
        let mut session = handle.lock().await;

        let transition = engine::transition(catalog, &session, &envelope.text);
        session.state = transition.state;
        session.group = transition.group.clone();

        let messages = engine::render(assets, &envelope.sender, transition.replies).await;
        for message in messages {
            if let Err(e) = outbound.send(message) {
                warn!(
                    "Failed to queue outbound message (trace_id={}): {}",
                    envelope.trace_id, e
                );
            }
        }
    }
}
