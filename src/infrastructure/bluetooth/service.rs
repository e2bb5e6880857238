//! Bridge Service Module
//!
//! Controller that turns command writes from the wireless client into
//! interpreter exchanges, and tracks the wireless connection state.

use crate::domain::chunker::NotificationChunker;
use crate::domain::echo;
use crate::domain::error::{BridgeError, BridgeResult};
use crate::domain::models::{
    BridgeEvent, BridgeNotice, CentralState, Command, LinkChange, NO_TCP,
};
use crate::domain::settings::BridgeSettings;
use crate::infrastructure::bluetooth::link::WirelessLink;
use crate::infrastructure::tcp::{ResponseReader, StreamSession};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Bounds the number of command writes accepted but not yet answered:
/// the exchange in flight plus a fixed number waiting behind it.
#[derive(Debug, Clone)]
pub struct ExchangeGuard {
    outstanding: Arc<AtomicUsize>,
    capacity: usize,
}

impl ExchangeGuard {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            outstanding: Arc::new(AtomicUsize::new(0)),
            capacity: queue_depth + 1,
        }
    }

    fn try_acquire(&self) -> bool {
        self.outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .is_ok()
    }

    fn release(&self) {
        let _ = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Writes accepted and not yet answered
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

/// Entry point for the radio layer. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    events: mpsc::UnboundedSender<BridgeEvent>,
    guard: ExchangeGuard,
}

impl BridgeHandle {
    pub fn central_connected(&self) -> BridgeResult<()> {
        self.send(BridgeEvent::CentralConnected)
    }

    pub fn central_disconnected(&self) -> BridgeResult<()> {
        self.send(BridgeEvent::CentralDisconnected)
    }

    /// Queue a command write.
    ///
    /// Empty writes are dropped with [`BridgeError::EmptyCommand`]. When the
    /// queue behind the running exchange is full the write is rejected with
    /// [`BridgeError::Busy`] and never reaches the controller.
    pub fn submit_write(&self, bytes: &[u8]) -> BridgeResult<()> {
        if bytes.is_empty() {
            debug!("Ignoring empty command write");
            return Err(BridgeError::EmptyCommand);
        }
        if !self.guard.try_acquire() {
            warn!(
                "Rejecting command {:?}: exchange in flight and queue full",
                String::from_utf8_lossy(bytes)
            );
            return Err(BridgeError::Busy);
        }

        let result = self.send(BridgeEvent::Write(bytes.to_vec()));
        if result.is_err() {
            self.guard.release();
        }
        result
    }

    /// Writes accepted and not yet answered
    pub fn outstanding(&self) -> usize {
        self.guard.outstanding()
    }

    fn send(&self, event: BridgeEvent) -> BridgeResult<()> {
        self.events
            .send(event)
            .map_err(|_| BridgeError::ControllerStopped)
    }
}

/// Bridge controller. Processes events strictly in arrival order, one
/// exchange at a time.
pub struct BridgeService<L: WirelessLink> {
    session: StreamSession,
    reader: ResponseReader,
    chunker: NotificationChunker,
    link: L,
    central: CentralState,
    events: mpsc::UnboundedReceiver<BridgeEvent>,
    guard: ExchangeGuard,
    notices: Option<mpsc::UnboundedSender<BridgeNotice>>,
}

impl<L: WirelessLink> BridgeService<L> {
    /// Create the controller and the handle feeding it
    pub fn new(settings: &BridgeSettings, session: StreamSession, link: L) -> (Self, BridgeHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let guard = ExchangeGuard::new(settings.command_queue_depth);

        let service = Self {
            session,
            reader: ResponseReader::from_settings(settings),
            chunker: NotificationChunker::new(settings.fragment_size, settings.fragment_delay()),
            link,
            central: CentralState::default(),
            events: rx,
            guard: guard.clone(),
            notices: None,
        };
        let handle = BridgeHandle { events: tx, guard };

        (service, handle)
    }

    /// Publish status notices on `sender`
    pub fn with_notices(mut self, sender: mpsc::UnboundedSender<BridgeNotice>) -> Self {
        self.notices = Some(sender);
        self
    }

    pub fn central_state(&self) -> CentralState {
        self.central
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Advertise, then process events until every handle is dropped.
    pub async fn run(mut self) -> Self {
        if let Err(e) = self.link.start_advertising() {
            warn!("Could not start advertising: {}", e);
        }
        info!("Bridge ready, interpreter at {}", self.session.addr());

        while let Some(event) = self.events.recv().await {
            self.handle_event(event).await;
        }

        info!("All bridge handles dropped, controller stopping");
        self
    }

    pub async fn handle_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::CentralConnected => self.on_link_change(LinkChange::Connected),
            BridgeEvent::CentralDisconnected => self.on_link_change(LinkChange::Disconnected),
            BridgeEvent::Write(bytes) => {
                match Command::from_bytes(&bytes) {
                    Ok(command) => {
                        self.exchange(&command).await;
                    }
                    Err(e) => debug!("Dropping write: {}", e),
                }
                self.guard.release();
            }
        }
    }

    fn on_link_change(&mut self, change: LinkChange) {
        let Some(next) = self.central.transition(change) else {
            debug!("Ignoring {:?} while {:?}", change, self.central);
            return;
        };
        self.central = next;

        match next {
            CentralState::CentralConnected => {
                info!("Client connected");
                self.publish(BridgeNotice::CentralConnected);
            }
            CentralState::Idle => {
                info!("Client disconnected, advertising again");
                self.publish(BridgeNotice::CentralDisconnected);
                if let Err(e) = self.link.start_advertising() {
                    warn!("Could not restart advertising: {}", e);
                }
            }
        }
    }

    /// Run one full exchange and notify the cleaned response.
    ///
    /// Returns the cleaned response text.
    pub async fn exchange(&mut self, command: &Command) -> String {
        let raw = self.fetch_response(command).await;
        let response = echo::clean(&raw, command.original());
        debug!(
            "Command {:?}: {} raw bytes, {} after cleaning",
            command.original(),
            raw.len(),
            response.len()
        );

        let link = &mut self.link;
        let fragments = match self.chunker.send(&response, |f| link.notify(f)).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!("Response to {:?} cut short: {}", command.original(), e);
                0
            }
        };

        self.publish(BridgeNotice::ExchangeCompleted {
            command: command.original().to_string(),
            response_len: response.len(),
            fragments,
        });
        response
    }

    async fn fetch_response(&mut self, command: &Command) -> String {
        let attempts = self.session.connect_attempts();
        if !self.session.ensure_connected().await {
            self.publish(BridgeNotice::StreamUnavailable);
            return NO_TCP.to_string();
        }
        // A new attempt that succeeded means a fresh stream, including
        // reconnects after a close noticed by ensure_connected itself
        if self.session.connect_attempts() != attempts {
            self.publish(BridgeNotice::StreamConnected);
        }

        self.session.write(command.normalized().as_bytes()).await;
        self.reader.read(&mut self.session).await
    }

    fn publish(&self, notice: BridgeNotice) {
        if let Some(sender) = &self.notices {
            let _ = sender.send(notice);
        }
    }
}
