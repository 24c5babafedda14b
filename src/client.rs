use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;

use crate::callbacks::SessionCallbacks;
use crate::classifier::{EventClassifier, PhraseClassifier};
use crate::credential::CredentialProvider;
use crate::controller::{Action, HostEvent, TurnController, TurnState};
use crate::directive::Directive;
use crate::error::TransportError;
use crate::microphone::MicrophoneGate;
use crate::transport::{AudioConstraints, AudioOutput, Backend, ChannelEvent, ChannelEvents, ControlChannel, PeerConnection};
use crate::types;
use outbox::Outbox;
use scheduler::Scheduler;

pub mod config;
pub mod consts;
mod outbox;
mod scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Negotiated; waiting for the control channel to open.
    Connecting,
    Connected,
    Closed,
}

/// Transport handles released by teardown, in acquisition order.
struct Resources {
    microphone: Arc<MicrophoneGate>,
    peer: Arc<dyn PeerConnection>,
    channel: Mutex<Option<Arc<dyn ControlChannel>>>,
    output: Mutex<Option<Arc<dyn AudioOutput>>>,
    closed: Arc<AtomicBool>,
}

impl Resources {
    fn new(peer: Arc<dyn PeerConnection>) -> Self {
        Self {
            microphone: Arc::new(MicrophoneGate::new()),
            peer,
            channel: Mutex::new(None),
            output: Mutex::new(None),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns false when already released.
    async fn release(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.microphone.set_enabled(false);
        self.microphone.stop_all();
        let channel = self.channel.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(channel) = channel {
            channel.close().await;
        }
        self.peer.close().await;
        let output = self.output.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(output) = output {
            output.release();
        }
        true
    }
}

/// State shared with the event loop and background sends.
struct Shared {
    controller: Mutex<TurnController>,
    classifier: Box<dyn EventClassifier>,
    callbacks: Arc<dyn SessionCallbacks>,
    outbox: Arc<Outbox>,
    scheduler: Scheduler,
    status: Mutex<Status>,
    opening: Directive,
    opening_delay: Duration,
    opening_latched: AtomicBool,
    opening_task: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn set_status(&self, status: Status) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    fn status(&self) -> Status {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs one controller step and carries out its actions. A step that
    /// cancels invalidates pending directives before the controller lock is
    /// released; schedules decided earlier are then dropped.
    fn drive<F>(&self, f: F)
    where
        F: FnOnce(&mut TurnController) -> Vec<Action>,
    {
        let (actions, generation) = {
            let mut controller = self.controller.lock().unwrap_or_else(|e| e.into_inner());
            let actions = f(&mut controller);
            let generation = if actions.contains(&Action::CancelPending) {
                self.scheduler.invalidate()
            } else {
                self.scheduler.generation()
            };
            (actions, generation)
        };
        self.apply(actions, generation);
    }

    fn apply(&self, actions: Vec<Action>, generation: u64) {
        for action in actions {
            match action {
                Action::Notify(event) => self.notify(event),
                Action::Schedule { directive, delay } => self.scheduler.schedule(directive, delay, generation),
                Action::CancelPending => self.scheduler.cancel_before(generation),
            }
        }
    }

    fn notify(&self, event: HostEvent) {
        match event {
            HostEvent::CharacterAssigned(name) => self.callbacks.on_character_assigned(&name),
            HostEvent::LineComplete => self.callbacks.on_line_complete(),
            HostEvent::TurnStart => self.callbacks.on_turn_start(),
            HostEvent::TurnEnd => self.callbacks.on_turn_end(),
            HostEvent::WaitingForUser => self.callbacks.on_waiting_for_user(),
        }
    }

    fn on_open(self: &Arc<Self>) {
        tracing::info!("control channel open");
        self.set_status(Status::Connected);
        if self.opening_latched.swap(true, Ordering::SeqCst) {
            return;
        }

        let shared = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(shared.opening_delay).await;
            if shared.outbox.is_closed() {
                return;
            }
            match shared.outbox.send(&shared.opening).await {
                Ok(()) => shared.drive(|c| c.opening_sent()),
                Err(e) => {
                    tracing::error!("failed to send opening prompt: {}", e);
                    shared.callbacks.on_error(&e);
                }
            }
        });
        *self.opening_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    fn on_message(&self, text: &str) {
        let json = match serde_json::from_str::<serde_json::Value>(text) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("dropping malformed message: {}, text=> {:?}", e, text);
                return;
            }
        };
        let event_type = json.get("type").and_then(|v| v.as_str());
        let event_id = json.get("event_id").and_then(|v| v.as_str());
        tracing::debug!("received message: {}, id={}", event_type.unwrap_or("unknown"), event_id.unwrap_or("unknown"));

        let event = match serde_json::from_value::<types::ServerEvent>(json) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("failed to deserialize event: {}, text=> {:?}", e, text);
                return;
            }
        };

        let signals = self.classifier.classify(&event);
        if signals.is_empty() {
            return;
        }
        self.drive(|c| signals.into_iter().flat_map(|s| c.handle(s)).collect());
    }

    fn abort_tasks(&self) {
        self.scheduler.cancel_all();
        if let Some(handle) = self.opening_task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

async fn run(shared: Arc<Shared>, mut events: ChannelEvents) {
    while let Some(event) = events.next().await {
        if shared.outbox.is_closed() {
            break;
        }
        match event {
            ChannelEvent::Open => shared.on_open(),
            ChannelEvent::Message(text) => shared.on_message(&text),
            ChannelEvent::Error(message) => {
                let e = TransportError::Channel(message);
                tracing::error!("{}", e);
                shared.callbacks.on_error(&e);
            }
            ChannelEvent::Closed => {
                tracing::info!("control channel closed");
                break;
            }
        }
    }
    shared.set_status(Status::Closed);
}

/// One rehearsal attempt over one transport session.
pub struct Session {
    shared: Arc<Shared>,
    resources: Arc<Resources>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn status(&self) -> Status {
        self.shared.status()
    }

    pub fn is_closed(&self) -> bool {
        self.resources.closed.load(Ordering::SeqCst)
    }

    pub fn turn_state(&self) -> TurnState {
        self.shared.controller.lock().unwrap_or_else(|e| e.into_inner()).state()
    }

    pub fn character(&self) -> Option<String> {
        let controller = self.shared.controller.lock().unwrap_or_else(|e| e.into_inner());
        controller.character().map(|c| c.to_string())
    }

    pub fn microphone(&self) -> &MicrophoneGate {
        &self.resources.microphone
    }

    pub fn enable_microphone(&self, on: bool) {
        self.resources.microphone.set_enabled(on);
    }

    /// Writes one directive now. Fails with [`TransportError::ChannelNotReady`] unless the channel is open.
    pub async fn send_directive(&self, directive: &Directive) -> Result<(), TransportError> {
        self.shared.scheduler.send_now(directive).await
    }

    /// Mutes the microphone and tells the agent to stop; pending continuations are dropped.
    pub async fn stop_reading(&self) -> Result<(), TransportError> {
        self.enable_microphone(false);
        self.shared.drive(|c| c.stop_reading());
        self.send_directive(&Directive::StopReading).await
    }

    /// Clears the character assignment and asks the agent to start again.
    pub async fn start_over(&self) -> Result<(), TransportError> {
        self.shared.drive(|c| c.start_over());
        self.send_directive(&Directive::StartOver).await
    }

    /// Releases every transport resource. Later calls do nothing.
    pub async fn teardown(&self) {
        if self.is_closed() {
            return;
        }
        tracing::info!("tearing down session");
        self.shared.drive(|c| c.close());
        self.shared.abort_tasks();
        if let Some(handle) = self.event_loop.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
        self.resources.release().await;
        self.shared.set_status(Status::Closed);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.abort_tasks();
        if let Some(handle) = self.event_loop.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

async fn establish(
    resources: &Resources,
    credential: &SecretString,
    backend: &Backend,
) -> Result<ChannelEvents, TransportError> {
    let output = backend.media.open_speaker().await?;
    backend.peer.route_remote_audio(output.clone());
    *resources.output.lock().unwrap_or_else(|e| e.into_inner()) = Some(output);

    let tracks = backend.media.open_microphone(&AudioConstraints::default()).await?;
    if tracks.is_empty() {
        return Err(TransportError::MediaAcquisition("no audio track".to_string()));
    }
    for track in &tracks {
        track.set_enabled(false);
        backend.peer.add_track(track.clone())?;
    }
    resources.microphone.attach(tracks);

    let (channel, events) = backend.peer.create_data_channel(consts::CONTROL_CHANNEL_LABEL).await?;
    *resources.channel.lock().unwrap_or_else(|e| e.into_inner()) = Some(channel);

    let offer = backend.peer.create_offer().await?;
    backend.peer.set_local_description(offer.clone()).await?;
    let answer = backend.negotiator.negotiate(&offer, credential).await?;
    backend.peer.set_remote_description(answer).await?;
    Ok(events)
}

pub async fn connect_with_config(
    credential: SecretString,
    backend: Backend,
    callbacks: Arc<dyn SessionCallbacks>,
    config: config::Config,
) -> Result<Session, TransportError> {
    if credential.expose_secret().trim().is_empty() {
        let e = TransportError::Credential("empty credential".to_string());
        tracing::error!("bootstrap failed: {}", e);
        callbacks.on_error(&e);
        return Err(e);
    }

    let resources = Arc::new(Resources::new(backend.peer.clone()));
    let events = match establish(&resources, &credential, &backend).await {
        Ok(events) => events,
        Err(e) => {
            tracing::error!("bootstrap failed: {}", e);
            resources.release().await;
            callbacks.on_error(&e);
            return Err(e);
        }
    };
    let channel = resources
        .channel
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
        .ok_or(TransportError::Closed)?;

    let outbox = Arc::new(Outbox::new(channel, resources.closed.clone(), config.auto_response()));
    let shared = Arc::new(Shared {
        controller: Mutex::new(TurnController::new(config.continue_delay())),
        classifier: Box::new(PhraseClassifier::new()),
        callbacks: callbacks.clone(),
        scheduler: Scheduler::new(outbox.clone(), callbacks),
        outbox,
        status: Mutex::new(Status::Connecting),
        opening: Directive::opening(config.script_title(), config.characters()),
        opening_delay: config.opening_delay(),
        opening_latched: AtomicBool::new(false),
        opening_task: Mutex::new(None),
    });
    let event_loop = tokio::spawn(run(shared.clone(), events));
    tracing::info!("session negotiated with {}", config.model());

    Ok(Session {
        shared,
        resources,
        event_loop: Mutex::new(Some(event_loop)),
    })
}

pub async fn connect(
    credential: SecretString,
    backend: Backend,
    callbacks: Arc<dyn SessionCallbacks>,
) -> Result<Session, TransportError> {
    connect_with_config(credential, backend, callbacks, config::Config::new()).await
}

/// Fetches a credential from `provider`, then connects with it.
pub async fn connect_with_provider(
    provider: &dyn CredentialProvider,
    backend: Backend,
    callbacks: Arc<dyn SessionCallbacks>,
    config: config::Config,
) -> Result<Session, TransportError> {
    let credential = match provider.fetch().await {
        Ok(credential) => credential,
        Err(e) => {
            tracing::error!("failed to obtain credential: {}", e);
            callbacks.on_error(&e);
            return Err(e);
        }
    };
    connect_with_config(credential, backend, callbacks, config).await
}
