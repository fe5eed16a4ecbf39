//! Room coordinator actor.
//!
//! A single task owns all room state. Callers hold a [`RoomHandle`] and talk
//! to it over an mpsc mailbox. Platform calls run in spawned tasks that post
//! a [`Completion`] back, so the actor keeps serving commands and platform
//! events while a capability check, publish or filter call is in flight.
//!
//! Each join starts a new visit epoch. Completions from an earlier epoch are
//! discarded and any publisher they created is destroyed.

use super::filter::FilterLifecycle;
use super::messages::{Completion, CompletionKind, RoomMessage, ScreenShareOutcome, StopTrigger};
use super::roster::Roster;
use super::screen_share::{ExternalStop, ScreenShareController, StartOutcome, ToggleAction};
use crate::backend::JoinParams;
use crate::chat::{self, ChatMessage, ChatPayload};
use crate::config::DEFAULT_USERNAME;
use crate::errors::{ChatError, FilterError, PlatformError, RoomError, ScreenShareError};
use crate::platform::{
    ConnectRequest, MediaPlatform, PlatformEvent, PublisherId, PublisherOptions, RawSignal,
    ScreenShareCapability, StreamDestroyedReason, StreamInfo, VideoFilter, VideoSource,
};
use crate::signaling::{self, SignalingRelay};
use crate::state::{ConnectionState, RoomState, ScreenShareState, StatusMessage, StatusTone};
use common::types::{ConnectionId, SessionId};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Room actor mailbox size.
const ROOM_CHANNEL_BUFFER: usize = 64;

/// Completion channel size.
const COMPLETION_CHANNEL_BUFFER: usize = 64;

/// Platform event channel size per visit.
const EVENT_CHANNEL_BUFFER: usize = 256;

pub const STATUS_CONNECTING: &str = "Connecting to session...";
pub const STATUS_CONNECTED: &str = "Connected to session.";
pub const STATUS_LEFT: &str = "Left the session.";
pub const STATUS_CHECKING_CAPABILITY: &str = "Checking screen sharing capability...";
pub const STATUS_SCREEN_SHARED: &str = "Screen is being shared successfully.";
pub const STATUS_SCREEN_STOPPED: &str = "Screen sharing stopped.";
pub const STATUS_SCREEN_STOPPED_EXTERNALLY: &str = "Screen sharing stopped by user action.";
pub const STATUS_PUBLISHER_MISSING: &str = "Publisher not initialized.";
pub const STATUS_FILTERS_UNSUPPORTED: &str = "Video filters are not supported in this browser.";
pub const STATUS_CLEARING_FILTER: &str = "Clearing filter...";
pub const STATUS_FILTER_CLEARED: &str = "Filter cleared.";

/// Handle to the room actor.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    state: watch::Receiver<RoomState>,
    cancel_token: CancellationToken,
}

impl RoomHandle {
    /// Join a session. Resolves once connected, or with the connection error.
    pub async fn join(&self, params: JoinParams) -> Result<ConnectionId, RoomError> {
        self.request(|respond_to| RoomMessage::Join { params, respond_to })
            .await?
    }

    /// Leave the room. All local publishers are gone when this returns.
    pub async fn leave(&self) -> Result<(), RoomError> {
        self.request(|respond_to| RoomMessage::Leave { respond_to })
            .await
    }

    /// Start or stop sharing the screen. Resolves when the toggle finishes.
    pub async fn toggle_screen_share(&self) -> Result<ScreenShareOutcome, RoomError> {
        self.request(|respond_to| RoomMessage::ToggleScreenShare { respond_to })
            .await?
    }

    pub async fn apply_filter(&self, filter: VideoFilter) -> Result<(), RoomError> {
        self.request(|respond_to| RoomMessage::ApplyFilter { filter, respond_to })
            .await?
    }

    pub async fn clear_filter(&self) -> Result<(), RoomError> {
        self.request(|respond_to| RoomMessage::ClearFilter { respond_to })
            .await?
    }

    pub async fn send_chat(&self, text: impl Into<String>) -> Result<(), RoomError> {
        let text = text.into();
        self.request(|respond_to| RoomMessage::SendChat { text, respond_to })
            .await?
    }

    /// Current state, read through the actor.
    pub async fn state(&self) -> Result<RoomState, RoomError> {
        self.request(|respond_to| RoomMessage::GetState { respond_to })
            .await
    }

    /// Watch state snapshots as the actor publishes them.
    pub fn subscribe(&self) -> watch::Receiver<RoomState> {
        self.state.clone()
    }

    /// Stop the actor; the room is left on the way out.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> Result<T, RoomError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(build(tx))
            .await
            .map_err(|e| RoomError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RoomError::Internal(format!("response receive failed: {e}")))
    }
}

/// The room coordinator.
pub struct RoomActor {
    platform: Arc<dyn MediaPlatform>,
    relay: SignalingRelay,
    receiver: mpsc::Receiver<RoomMessage>,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    /// Platform events for the current visit; `None` while disconnected.
    events: Option<mpsc::Receiver<PlatformEvent>>,
    state_tx: watch::Sender<RoomState>,
    cancel_token: CancellationToken,
    epoch: u64,

    connection: ConnectionState,
    session_id: Option<SessionId>,
    connection_id: Option<ConnectionId>,
    identity: Option<String>,
    camera_publisher: Option<PublisherId>,
    camera_published: bool,
    screen: ScreenShareController,
    filter: FilterLifecycle,
    roster: Roster,
    transcript: Vec<ChatMessage>,
    connection_status: Option<StatusMessage>,
    camera_status: Option<StatusMessage>,
    screen_status: Option<StatusMessage>,
    filter_status: Option<StatusMessage>,

    pending_join: Option<oneshot::Sender<Result<ConnectionId, RoomError>>>,
    pending_toggle: Option<oneshot::Sender<Result<ScreenShareOutcome, RoomError>>>,
    pending_filter: Option<oneshot::Sender<Result<(), RoomError>>>,
}

impl RoomActor {
    /// Spawn the room actor.
    pub fn spawn(
        platform: Arc<dyn MediaPlatform>,
        cancel_token: CancellationToken,
    ) -> (RoomHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(ROOM_CHANNEL_BUFFER);
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_CHANNEL_BUFFER);
        let (state_tx, state_rx) = watch::channel(RoomState::default());

        let actor = Self {
            relay: SignalingRelay::new(platform.clone()),
            platform,
            receiver,
            completion_tx,
            completion_rx,
            events: None,
            state_tx,
            cancel_token: cancel_token.clone(),
            epoch: 0,
            connection: ConnectionState::Disconnected,
            session_id: None,
            connection_id: None,
            identity: None,
            camera_publisher: None,
            camera_published: false,
            screen: ScreenShareController::new(),
            filter: FilterLifecycle::new(),
            roster: Roster::new(),
            transcript: Vec::new(),
            connection_status: None,
            camera_status: None,
            screen_status: None,
            filter_status: None,
            pending_join: None,
            pending_toggle: None,
            pending_filter: None,
        };

        let task = tokio::spawn(actor.run());

        let handle = RoomHandle {
            sender,
            state: state_rx,
            cancel_token,
        };

        (handle, task)
    }

    #[instrument(skip_all, name = "room.coordinator")]
    async fn run(mut self) {
        debug!(target: "room.coordinator", "Room actor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: "room.coordinator", "Room actor cancelled");
                    break;
                }

                message = self.receiver.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            debug!(target: "room.coordinator", "All room handles dropped");
                            break;
                        }
                    }
                }

                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion).await;
                }

                event = next_event(&mut self.events) => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            debug!(target: "room.coordinator", "Platform event stream closed");
                            self.events = None;
                        }
                    }
                }
            }

            self.publish_state();
        }

        self.leave().await;
        self.publish_state();

        debug!(target: "room.coordinator", "Room actor stopped");
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join { params, respond_to } => self.start_join(params, respond_to),
            RoomMessage::Leave { respond_to } => {
                self.leave().await;
                let _ = respond_to.send(());
            }
            RoomMessage::ToggleScreenShare { respond_to } => self.toggle_screen_share(respond_to),
            RoomMessage::ApplyFilter { filter, respond_to } => {
                self.apply_filter(filter, respond_to);
            }
            RoomMessage::ClearFilter { respond_to } => self.clear_filter(respond_to),
            RoomMessage::SendChat { text, respond_to } => self.send_chat(&text, respond_to),
            RoomMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
        }
    }

    async fn handle_completion(&mut self, completion: Completion) {
        if completion.epoch != self.epoch {
            self.discard_stale(completion).await;
            return;
        }

        match completion.kind {
            CompletionKind::Connected(result) => self.on_connected(result).await,
            CompletionKind::CameraReady(result) => self.on_camera_ready(result),
            CompletionKind::CameraPublished(result) => match result {
                Ok(()) => info!(target: "room.coordinator", "Camera published"),
                Err(e) => {
                    warn!(target: "room.coordinator", error = %e, "Failed to publish camera");
                    self.camera_status =
                        Some(StatusMessage::error(format!("Failed to publish camera: {e}")));
                }
            },
            CompletionKind::Subscribed { stream_id, result } => {
                if let Err(e) = result {
                    warn!(
                        target: "room.coordinator",
                        stream_id = %stream_id,
                        error = %e,
                        "Failed to subscribe to remote stream"
                    );
                }
            }
            CompletionKind::CapabilityChecked(capability) => {
                self.on_capability_checked(capability);
            }
            CompletionKind::ScreenStarted(result) => self.on_screen_started(result),
            CompletionKind::ScreenStopped { trigger, result } => {
                self.on_screen_stopped(&trigger, result);
            }
            CompletionKind::FilterApplied(result) => self.on_filter_applied(result),
            CompletionKind::FilterCleared(result) => self.on_filter_cleared(result),
            CompletionKind::ChatSent {
                payload,
                result,
                respond_to,
            } => self.on_chat_sent(payload, result, respond_to),
        }
    }

    async fn handle_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::StreamCreated(stream) => self.on_stream_created(stream),
            PlatformEvent::StreamDestroyed(stream) => {
                if self.roster.remove_stream(&stream) {
                    info!(
                        target: "room.coordinator",
                        connection_id = %stream.connection_id,
                        participants = self.roster.len(),
                        "Participant left"
                    );
                }
            }
            PlatformEvent::PublisherStreamDestroyed { publisher, reason } => {
                self.on_publisher_stream_destroyed(publisher, reason);
            }
            PlatformEvent::SignalReceived(raw) => self.on_signal(&raw),
            PlatformEvent::SessionDisconnected { reason } => {
                warn!(target: "room.coordinator", reason = %reason, "Session disconnected by platform");
                self.teardown(false).await;
                self.connection_status = Some(StatusMessage::error(format!(
                    "Disconnected from session: {reason}"
                )));
            }
        }
    }

    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    fn start_join(
        &mut self,
        params: JoinParams,
        respond_to: oneshot::Sender<Result<ConnectionId, RoomError>>,
    ) {
        if self.connection != ConnectionState::Disconnected {
            let _ = respond_to.send(Err(RoomError::AlreadyJoined));
            return;
        }

        self.epoch += 1;
        self.connection = ConnectionState::Connecting;
        self.session_id = Some(params.session_id.clone());
        self.identity = Some(params.identity.clone());
        self.connection_status = Some(StatusMessage::pending(STATUS_CONNECTING));
        self.pending_join = Some(respond_to);

        info!(
            target: "room.coordinator",
            session_id = %params.session_id,
            identity = %params.identity,
            epoch = self.epoch,
            "Joining room"
        );

        // The sender goes to connect itself so no event can precede our listener
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        self.events = Some(event_rx);

        let request = ConnectRequest {
            application_id: params.application_id,
            session_id: params.session_id,
            token: params.token,
        };
        let platform = self.platform.clone();
        self.spawn_completion(async move {
            CompletionKind::Connected(platform.connect(&request, event_tx).await)
        });

        let options = PublisherOptions {
            source: VideoSource::Camera,
            name: params.identity,
        };
        let platform = self.platform.clone();
        self.spawn_completion(async move {
            CompletionKind::CameraReady(platform.init_publisher(&options).await)
        });
    }

    async fn on_connected(&mut self, result: Result<ConnectionId, PlatformError>) {
        match result {
            Ok(connection_id) => {
                info!(
                    target: "room.coordinator",
                    connection_id = %connection_id,
                    "Connected to session"
                );
                self.connection = ConnectionState::Connected;
                self.connection_id = Some(connection_id.clone());
                self.connection_status = Some(StatusMessage::success(STATUS_CONNECTED));
                self.publish_camera();

                if let Some(respond_to) = self.pending_join.take() {
                    let _ = respond_to.send(Ok(connection_id));
                }
            }
            Err(e) => {
                warn!(target: "room.coordinator", error = %e, "Failed to connect to session");
                let pending_join = self.pending_join.take();
                let camera = self.camera_publisher.take();

                self.reset_visit();
                if let Some(publisher) = camera {
                    self.remove_publisher(&publisher, false).await;
                }

                self.connection_status =
                    Some(StatusMessage::error(format!("Failed to connect: {e}")));
                if let Some(respond_to) = pending_join {
                    let _ = respond_to.send(Err(RoomError::Connection(e)));
                }
            }
        }
    }

    fn on_camera_ready(&mut self, result: Result<PublisherId, PlatformError>) {
        match result {
            Ok(publisher) => {
                debug!(target: "room.coordinator", publisher = %publisher, "Camera publisher ready");
                self.camera_publisher = Some(publisher);
                self.publish_camera();
            }
            Err(e) => {
                warn!(target: "room.coordinator", error = %e, "Failed to initialize camera publisher");
                self.camera_status =
                    Some(StatusMessage::error(format!("Failed to start camera: {e}")));
            }
        }
    }

    /// Publish the camera once both the connection and the publisher exist.
    fn publish_camera(&mut self) {
        if self.connection != ConnectionState::Connected || self.camera_published {
            return;
        }
        let Some(publisher) = self.camera_publisher.clone() else {
            return;
        };

        self.camera_published = true;
        let platform = self.platform.clone();
        self.spawn_completion(async move {
            CompletionKind::CameraPublished(platform.publish(&publisher).await)
        });
    }

    async fn leave(&mut self) {
        match self.connection {
            ConnectionState::Disconnected => {}
            ConnectionState::Connecting => {
                info!(target: "room.coordinator", "Abandoning pending join");
                self.teardown(false).await;
            }
            ConnectionState::Connected => {
                info!(target: "room.coordinator", "Leaving room");
                self.teardown(true).await;
            }
        }
    }

    /// Remove local publishers, optionally disconnect, and drop the visit.
    async fn teardown(&mut self, disconnect: bool) {
        let screen = self.screen.state().publisher().cloned();
        let camera = self.camera_publisher.take();
        let camera_published = self.camera_published;
        let connection_id = self.connection_id.take();

        self.reset_visit();

        // Screen goes first so the camera never returns to main while it exists
        if let Some(publisher) = screen {
            self.remove_publisher(&publisher, true).await;
        }
        if let Some(publisher) = camera {
            self.remove_publisher(&publisher, camera_published).await;
        }

        if let (true, Some(connection_id)) = (disconnect, connection_id) {
            if let Err(e) = self.platform.disconnect(&connection_id).await {
                warn!(target: "room.coordinator", error = %e, "Failed to disconnect cleanly");
            }
        }

        self.connection_status = Some(StatusMessage::new(STATUS_LEFT, StatusTone::Neutral));
    }

    /// Start a new epoch and discard all per-visit state.
    fn reset_visit(&mut self) {
        self.epoch += 1;
        self.connection = ConnectionState::Disconnected;
        self.events = None;
        self.session_id = None;
        self.connection_id = None;
        self.identity = None;
        self.camera_publisher = None;
        self.camera_published = false;
        self.screen.reset();
        self.filter.reset();
        self.roster.clear();
        self.transcript.clear();
        self.camera_status = None;
        self.screen_status = None;
        self.filter_status = None;

        if let Some(respond_to) = self.pending_join.take() {
            let _ = respond_to.send(Err(RoomError::JoinAbandoned));
        }
        if let Some(respond_to) = self.pending_toggle.take() {
            let _ = respond_to.send(Err(RoomError::NotConnected));
        }
        if let Some(respond_to) = self.pending_filter.take() {
            let _ = respond_to.send(Err(RoomError::NotConnected));
        }
    }

    async fn discard_stale(&mut self, completion: Completion) {
        debug!(
            target: "room.coordinator",
            completion_epoch = completion.epoch,
            current_epoch = self.epoch,
            "Discarding completion from an earlier visit"
        );

        match completion.kind {
            CompletionKind::CameraReady(Ok(publisher))
            | CompletionKind::ScreenStarted(Ok(publisher)) => {
                self.remove_publisher(&publisher, true).await;
            }
            CompletionKind::Connected(Ok(connection_id))
                if self.connection_id.as_ref() != Some(&connection_id) =>
            {
                debug!(
                    target: "room.coordinator",
                    connection_id = %connection_id,
                    "Closing abandoned connection"
                );
                if let Err(e) = self.platform.disconnect(&connection_id).await {
                    warn!(target: "room.coordinator", error = %e, "Failed to drop abandoned connection");
                }
            }
            CompletionKind::ChatSent {
                result, respond_to, ..
            } => {
                let _ = respond_to
                    .send(result.map_err(|e| ChatError::Relay(e.to_string()).into()));
            }
            _ => {}
        }
    }

    async fn remove_publisher(&self, publisher: &PublisherId, unpublish: bool) {
        if unpublish {
            if let Err(e) = self.platform.unpublish(publisher).await {
                warn!(target: "room.coordinator", publisher = %publisher, error = %e, "Failed to unpublish");
            }
        }
        if let Err(e) = self.platform.destroy_publisher(publisher).await {
            warn!(target: "room.coordinator", publisher = %publisher, error = %e, "Failed to destroy publisher");
        }
    }

    // ------------------------------------------------------------------
    // Roster and signals
    // ------------------------------------------------------------------

    fn on_stream_created(&mut self, stream: StreamInfo) {
        if self.connection_id.as_ref() == Some(&stream.connection_id) {
            debug!(target: "room.coordinator", stream_id = %stream.stream_id, "Ignoring own stream");
            return;
        }

        if self.roster.add_stream(&stream) {
            info!(
                target: "room.coordinator",
                connection_id = %stream.connection_id,
                participants = self.roster.len(),
                "Participant joined"
            );
        }

        let platform = self.platform.clone();
        self.spawn_completion(async move {
            let result = platform.subscribe(&stream).await;
            CompletionKind::Subscribed {
                stream_id: stream.stream_id,
                result,
            }
        });
    }

    fn on_publisher_stream_destroyed(
        &mut self,
        publisher: PublisherId,
        reason: StreamDestroyedReason,
    ) {
        if !reason.is_external_stop() {
            debug!(target: "room.coordinator", publisher = %publisher, reason = ?reason, "Publisher stream destroyed");
            return;
        }

        if self.camera_publisher.as_ref() == Some(&publisher) {
            warn!(target: "room.coordinator", cause = ?reason, "Camera stream stopped outside the app");
            return;
        }

        match self.screen.external_stop(&publisher, &reason) {
            ExternalStop::Teardown => {
                info!(
                    target: "room.screen_share",
                    publisher = %publisher,
                    cause = ?reason,
                    "Screen share stopped outside the app"
                );
                self.spawn_stop(publisher, StopTrigger::External { cause: reason });
            }
            ExternalStop::Deferred => {
                debug!(
                    target: "room.screen_share",
                    publisher = %publisher,
                    cause = ?reason,
                    "Stream stopped before publish was confirmed"
                );
            }
            ExternalStop::Ignored => {}
        }
    }

    fn on_signal(&mut self, raw: &RawSignal) {
        let signal = match signaling::decode(raw) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(target: "room.signaling", error = %e, "Dropping malformed signal");
                return;
            }
        };

        match chat::decode_incoming(&signal, self.connection_id.as_ref()) {
            Ok(Some(message)) => {
                debug!(target: "room.chat", sender = %message.sender, "Chat message received");
                self.transcript.push(message);
            }
            Ok(None) => {}
            Err(e) => warn!(target: "room.chat", error = %e, "Dropping malformed chat message"),
        }
    }

    // ------------------------------------------------------------------
    // Screen sharing
    // ------------------------------------------------------------------

    fn toggle_screen_share(
        &mut self,
        respond_to: oneshot::Sender<Result<ScreenShareOutcome, RoomError>>,
    ) {
        if self.connection != ConnectionState::Connected {
            let _ = respond_to.send(Err(RoomError::NotConnected));
            return;
        }

        match self.screen.begin_toggle() {
            Err(e) => {
                debug!(target: "room.screen_share", "Toggle rejected while another is in flight");
                let _ = respond_to.send(Err(e));
            }
            Ok(ToggleAction::CheckCapability) => {
                self.screen_status = Some(StatusMessage::pending(STATUS_CHECKING_CAPABILITY));
                self.pending_toggle = Some(respond_to);

                let platform = self.platform.clone();
                self.spawn_completion(async move {
                    CompletionKind::CapabilityChecked(
                        platform.check_screen_sharing_capability().await,
                    )
                });
            }
            Ok(ToggleAction::Stop(publisher)) => {
                self.pending_toggle = Some(respond_to);
                self.spawn_stop(publisher, StopTrigger::Toggle);
            }
        }
    }

    fn on_capability_checked(&mut self, capability: ScreenShareCapability) {
        if *self.screen.state() != ScreenShareState::CapabilityChecking {
            return;
        }

        if let Err(e) = self.screen.capability_checked(capability) {
            self.fail_toggle(e);
            return;
        }

        let options = PublisherOptions {
            source: VideoSource::Screen,
            name: format!(
                "{} (Screen)",
                self.identity.as_deref().unwrap_or(DEFAULT_USERNAME)
            ),
        };
        let platform = self.platform.clone();
        self.spawn_completion(async move {
            CompletionKind::ScreenStarted(start_screen(platform, options).await)
        });
    }

    fn on_screen_started(&mut self, result: Result<PublisherId, ScreenShareError>) {
        match self.screen.start_completed(result) {
            Ok(StartOutcome::Sharing) => {
                info!(target: "room.screen_share", "Screen share started");
                self.screen_status = Some(StatusMessage::success(STATUS_SCREEN_SHARED));
                if let Some(respond_to) = self.pending_toggle.take() {
                    let _ = respond_to.send(Ok(ScreenShareOutcome::Sharing));
                }
            }
            Ok(StartOutcome::StoppedEarly { publisher, cause }) => {
                // The toggle is answered once the teardown completes
                info!(
                    target: "room.screen_share",
                    publisher = %publisher,
                    cause = ?cause,
                    "Screen share stopped outside the app while starting"
                );
                self.spawn_stop(publisher, StopTrigger::External { cause });
            }
            Err(e) => self.fail_toggle(e),
        }
    }

    fn on_screen_stopped(&mut self, trigger: &StopTrigger, result: Result<(), PlatformError>) {
        if let Err(e) = result {
            warn!(target: "room.screen_share", error = %e, "Screen publisher teardown reported an error");
        }

        self.screen.stop_completed();

        let status = match trigger {
            StopTrigger::Toggle => {
                info!(target: "room.screen_share", "Screen share stopped");
                STATUS_SCREEN_STOPPED
            }
            StopTrigger::External { .. } => STATUS_SCREEN_STOPPED_EXTERNALLY,
        };
        self.screen_status = Some(StatusMessage::new(status, StatusTone::Neutral));

        if let Some(respond_to) = self.pending_toggle.take() {
            let _ = respond_to.send(Ok(ScreenShareOutcome::Stopped));
        }
    }

    fn spawn_stop(&self, publisher: PublisherId, trigger: StopTrigger) {
        let platform = self.platform.clone();
        self.spawn_completion(async move {
            // An externally stopped stream is already unpublished
            let unpublished = match trigger {
                StopTrigger::Toggle => platform.unpublish(&publisher).await,
                StopTrigger::External { .. } => Ok(()),
            };
            let destroyed = platform.destroy_publisher(&publisher).await;
            CompletionKind::ScreenStopped {
                trigger,
                result: unpublished.and(destroyed),
            }
        });
    }

    fn fail_toggle(&mut self, error: ScreenShareError) {
        warn!(target: "room.screen_share", error = %error, "Screen share failed");
        self.screen_status = Some(StatusMessage::error(error.to_string()));
        if let Some(respond_to) = self.pending_toggle.take() {
            let _ = respond_to.send(Err(error.into()));
        }
    }

    // ------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------

    fn apply_filter(
        &mut self,
        filter: VideoFilter,
        respond_to: oneshot::Sender<Result<(), RoomError>>,
    ) {
        let Some(publisher) = self.camera_publisher.clone() else {
            self.reject_filter(
                FilterError::Unavailable(STATUS_PUBLISHER_MISSING.to_string()),
                respond_to,
            );
            return;
        };
        if !self.platform.has_media_processor_support() {
            self.reject_filter(
                FilterError::Unavailable(STATUS_FILTERS_UNSUPPORTED.to_string()),
                respond_to,
            );
            return;
        }
        if let Err(e) = self.filter.begin_apply(filter.clone()) {
            let _ = respond_to.send(Err(e));
            return;
        }

        info!(target: "room.filter", filter = filter.label(), "Applying video filter");
        self.filter_status = Some(StatusMessage::pending(format!(
            "Applying {}...",
            filter.label()
        )));
        self.pending_filter = Some(respond_to);

        let platform = self.platform.clone();
        self.spawn_completion(async move {
            CompletionKind::FilterApplied(platform.apply_video_filter(&publisher, &filter).await)
        });
    }

    fn on_filter_applied(&mut self, result: Result<(), PlatformError>) {
        let reply = match self.filter.complete_apply(result) {
            Ok(filter) => {
                self.filter_status = Some(StatusMessage::success(format!(
                    "{} applied successfully.",
                    filter.label()
                )));
                Ok(())
            }
            Err(e) => {
                warn!(target: "room.filter", error = %e, "Video filter failed");
                self.filter_status = Some(StatusMessage::error(e.to_string()));
                Err(e.into())
            }
        };

        if let Some(respond_to) = self.pending_filter.take() {
            let _ = respond_to.send(reply);
        }
    }

    fn clear_filter(&mut self, respond_to: oneshot::Sender<Result<(), RoomError>>) {
        let Some(publisher) = self.camera_publisher.clone() else {
            let _ = respond_to.send(Ok(()));
            return;
        };
        if let Err(e) = self.filter.begin_clear() {
            let _ = respond_to.send(Err(e));
            return;
        }

        self.filter_status = Some(StatusMessage::pending(STATUS_CLEARING_FILTER));
        self.pending_filter = Some(respond_to);

        let platform = self.platform.clone();
        self.spawn_completion(async move {
            CompletionKind::FilterCleared(platform.clear_video_filter(&publisher).await)
        });
    }

    fn on_filter_cleared(&mut self, result: Result<(), PlatformError>) {
        let reply = match self.filter.complete_clear(result) {
            Ok(()) => {
                self.filter_status = Some(StatusMessage::success(STATUS_FILTER_CLEARED));
                Ok(())
            }
            Err(e) => {
                warn!(target: "room.filter", error = %e, "Failed to clear video filter");
                self.filter_status = Some(StatusMessage::error(e.to_string()));
                Err(e.into())
            }
        };

        if let Some(respond_to) = self.pending_filter.take() {
            let _ = respond_to.send(reply);
        }
    }

    fn reject_filter(
        &mut self,
        error: FilterError,
        respond_to: oneshot::Sender<Result<(), RoomError>>,
    ) {
        self.filter_status = Some(StatusMessage::error(error.to_string()));
        let _ = respond_to.send(Err(error.into()));
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    fn send_chat(&mut self, text: &str, respond_to: oneshot::Sender<Result<(), RoomError>>) {
        if self.connection != ConnectionState::Connected {
            let _ = respond_to.send(Err(RoomError::NotConnected));
            return;
        }

        let sender = self.identity.as_deref().unwrap_or(DEFAULT_USERNAME);
        let (payload, envelope) = match chat::prepare_outgoing(sender, text) {
            Ok(prepared) => prepared,
            Err(e) => {
                let _ = respond_to.send(Err(e.into()));
                return;
            }
        };

        let relay = self.relay.clone();
        self.spawn_completion(async move {
            let result = relay.send(&envelope).await;
            CompletionKind::ChatSent {
                payload,
                result,
                respond_to,
            }
        });
    }

    fn on_chat_sent(
        &mut self,
        payload: ChatPayload,
        result: Result<(), PlatformError>,
        respond_to: oneshot::Sender<Result<(), RoomError>>,
    ) {
        let reply = match result {
            Ok(()) => {
                self.transcript.push(ChatMessage::local(payload));
                Ok(())
            }
            Err(e) => {
                let error = ChatError::Relay(e.to_string());
                warn!(target: "room.chat", error = %error, "Chat message not sent");
                self.transcript.push(ChatMessage::system(error.to_string()));
                Err(error.into())
            }
        };
        let _ = respond_to.send(reply);
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn spawn_completion<F>(&self, operation: F)
    where
        F: Future<Output = CompletionKind> + Send + 'static,
    {
        let completion_tx = self.completion_tx.clone();
        let epoch = self.epoch;

        tokio::spawn(async move {
            let kind = operation.await;
            if completion_tx.send(Completion { epoch, kind }).await.is_err() {
                debug!(target: "room.coordinator", epoch, "Room actor gone, dropping completion");
            }
        });
    }

    fn snapshot(&self) -> RoomState {
        RoomState {
            connection: self.connection,
            session_id: self.session_id.clone(),
            connection_id: self.connection_id.clone(),
            identity: self.identity.clone(),
            camera_publisher: self.camera_publisher.clone(),
            screen_share: self.screen.state().clone(),
            filter: self.filter.status(),
            roster: self.roster.participants().to_vec(),
            transcript: self.transcript.clone(),
            connection_status: self.connection_status.clone(),
            camera_status: self.camera_status.clone(),
            screen_status: self.screen_status.clone(),
            filter_status: self.filter_status.clone(),
        }
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.snapshot());
    }
}

/// Create and publish a screen publisher, destroying it if the publish fails.
async fn start_screen(
    platform: Arc<dyn MediaPlatform>,
    options: PublisherOptions,
) -> Result<PublisherId, ScreenShareError> {
    let publisher = platform
        .init_publisher(&options)
        .await
        .map_err(|e| ScreenShareError::InitFailed(e.to_string()))?;

    if let Err(e) = platform.publish(&publisher).await {
        if let Err(destroy_error) = platform.destroy_publisher(&publisher).await {
            warn!(
                target: "room.screen_share",
                error = %destroy_error,
                "Failed to destroy unpublished screen publisher"
            );
        }
        return Err(ScreenShareError::PublishFailed(e.to_string()));
    }

    Ok(publisher)
}

/// Next platform event, or pending forever while disconnected.
async fn next_event(events: &mut Option<mpsc::Receiver<PlatformEvent>>) -> Option<PlatformEvent> {
    match events {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}
