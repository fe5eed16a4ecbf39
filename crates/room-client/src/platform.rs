//! Media platform seam.
//!
//! The media platform owns connections, publishers, subscribers and the
//! signaling relay. The room coordinator only drives it through
//! [`MediaPlatform`], so a browser binding, a native SDK binding or
//! [`mock::MockPlatform`] can sit behind it.
//!
//! Platform-originated events (remote streams, signals, disconnects) are
//! delivered on the channel handed to [`MediaPlatform::connect`], so no event
//! can arrive before the coordinator is listening.

use crate::errors::PlatformError;
use common::secret::SecretString;
use common::types::{ConnectionId, SessionId, StreamId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Default image for background replacement.
pub const DEFAULT_BACKGROUND_IMAGE_URL: &str =
    "https://cdn.pixabay.com/photo/2025/10/09/14/14/muztagh-9883659_1280.jpg";

/// Identifier of a local publisher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublisherId(String);

impl PublisherId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublisherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a connection needs: where to connect and the credential to use.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub application_id: String,
    pub session_id: SessionId,
    pub token: SecretString,
}

/// Source of a local publisher's video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoSource {
    Camera,
    Screen,
}

/// Options for creating a local publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherOptions {
    pub source: VideoSource,
    /// Name shown to other participants.
    pub name: String,
}

/// A stream published to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub stream_id: StreamId,
    /// Connection that published the stream.
    pub connection_id: ConnectionId,
    pub name: Option<String>,
}

/// Result of a screen sharing capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenShareCapability {
    pub supported: bool,
    pub extension_required: bool,
}

impl ScreenShareCapability {
    pub const SUPPORTED: Self = Self {
        supported: true,
        extension_required: false,
    };
}

/// Background blur strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurStrength {
    Low,
    High,
}

/// A video filter for the camera publisher, in the platform's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VideoFilter {
    BackgroundBlur {
        #[serde(rename = "blurStrength")]
        strength: BlurStrength,
    },
    BackgroundReplacement {
        #[serde(rename = "backgroundImgUrl")]
        image_url: String,
    },
}

impl VideoFilter {
    /// Background replacement with the bundled default image.
    pub fn default_replacement() -> Self {
        VideoFilter::BackgroundReplacement {
            image_url: DEFAULT_BACKGROUND_IMAGE_URL.to_string(),
        }
    }

    /// Human-readable label used in status messages.
    pub fn label(&self) -> &'static str {
        match self {
            VideoFilter::BackgroundBlur {
                strength: BlurStrength::Low,
            } => "Background Blur (Low)",
            VideoFilter::BackgroundBlur {
                strength: BlurStrength::High,
            } => "Background Blur (High)",
            VideoFilter::BackgroundReplacement { .. } => "Background Replacement",
        }
    }
}

/// Why a publisher's stream went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDestroyedReason {
    /// The user stopped capture through a native control.
    MediaStopped,
    SessionDisconnected,
    ClientDisconnected,
    Unpublished,
    Other(String),
}

impl StreamDestroyedReason {
    /// Whether this stop came from outside the app and must be handled
    /// like a manual toggle-off.
    pub fn is_external_stop(&self) -> bool {
        matches!(
            self,
            StreamDestroyedReason::MediaStopped | StreamDestroyedReason::SessionDisconnected
        )
    }
}

/// A raw application signal as delivered by the relay.
///
/// Shapes are validated by [`crate::signaling::decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawSignal {
    pub kind: Option<String>,
    pub data: serde_json::Value,
    /// Originating connection; `None` for server-sent signals.
    pub from: Option<ConnectionId>,
}

/// Events pushed by the platform during a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    StreamCreated(StreamInfo),
    StreamDestroyed(StreamInfo),
    PublisherStreamDestroyed {
        publisher: PublisherId,
        reason: StreamDestroyedReason,
    },
    SignalReceived(RawSignal),
    SessionDisconnected {
        reason: String,
    },
}

/// Trait for media platform operations (enables mocking).
#[async_trait::async_trait]
pub trait MediaPlatform: Send + Sync {
    /// Connect to a session. `events` receives every event for this connection.
    async fn connect(
        &self,
        request: &ConnectRequest,
        events: mpsc::Sender<PlatformEvent>,
    ) -> Result<ConnectionId, PlatformError>;

    /// Close one connection. Unknown or already closed ids are a no-op.
    async fn disconnect(&self, connection: &ConnectionId) -> Result<(), PlatformError>;

    /// Create a local publisher; capture starts but nothing is sent yet.
    async fn init_publisher(&self, options: &PublisherOptions)
        -> Result<PublisherId, PlatformError>;

    async fn publish(&self, publisher: &PublisherId) -> Result<(), PlatformError>;

    async fn unpublish(&self, publisher: &PublisherId) -> Result<(), PlatformError>;

    async fn destroy_publisher(&self, publisher: &PublisherId) -> Result<(), PlatformError>;

    async fn subscribe(&self, stream: &StreamInfo) -> Result<(), PlatformError>;

    async fn check_screen_sharing_capability(&self) -> ScreenShareCapability;

    /// Whether video filters are available at all.
    fn has_media_processor_support(&self) -> bool;

    async fn apply_video_filter(
        &self,
        publisher: &PublisherId,
        filter: &VideoFilter,
    ) -> Result<(), PlatformError>;

    async fn clear_video_filter(&self, publisher: &PublisherId) -> Result<(), PlatformError>;

    /// Send an application signal to every connection in the session.
    async fn signal(&self, kind: &str, data: &str) -> Result<(), PlatformError>;
}

/// Mock media platform for testing.
///
/// Records every call, tracks live publishers, and can fail or hold any
/// operation so tests can observe in-flight states.
pub mod mock {

    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::{Mutex, MutexGuard, Semaphore};

    /// Configurable outcomes for the mock.
    #[derive(Debug, Clone)]
    pub struct MockBehavior {
        pub fail_connect: Option<PlatformError>,
        pub fail_camera_init: bool,
        pub capability: ScreenShareCapability,
        pub fail_screen_init: Option<String>,
        pub fail_screen_publish: Option<String>,
        pub fail_filter: Option<String>,
        pub fail_clear: Option<String>,
        pub fail_signal: Option<String>,
        pub fail_subscribe: bool,
        /// Relay every sent signal back to the sender, like the real relay.
        pub echo_signals: bool,
    }

    impl Default for MockBehavior {
        fn default() -> Self {
            Self {
                fail_connect: None,
                fail_camera_init: false,
                capability: ScreenShareCapability::SUPPORTED,
                fail_screen_init: None,
                fail_screen_publish: None,
                fail_filter: None,
                fail_clear: None,
                fail_signal: None,
                fail_subscribe: false,
                echo_signals: true,
            }
        }
    }

    /// A recorded platform call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MockCall {
        Connect(SessionId),
        Disconnect(ConnectionId),
        InitPublisher(VideoSource),
        Publish(PublisherId),
        Unpublish(PublisherId),
        DestroyPublisher(PublisherId),
        Subscribe(StreamId),
        CheckCapability,
        ApplyFilter(VideoFilter),
        ClearFilter,
        Signal { kind: String, data: String },
    }

    /// Operations that can be held until released.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum GatedOp {
        Connect,
        CapabilityCheck,
        ScreenPublish,
        FilterApply,
        FilterClear,
    }

    #[derive(Default)]
    struct MockInner {
        calls: Vec<MockCall>,
        /// Open connections with the order they were requested in.
        connections: HashMap<ConnectionId, (u64, mpsc::Sender<PlatformEvent>)>,
        publishers: HashMap<PublisherId, VideoSource>,
        gates: HashMap<GatedOp, Arc<Semaphore>>,
    }

    /// In-process media platform.
    pub struct MockPlatform {
        connection_id: ConnectionId,
        next_connection: AtomicU64,
        behavior: Mutex<MockBehavior>,
        inner: Mutex<MockInner>,
        media_processor: AtomicBool,
        next_publisher: AtomicU64,
    }

    impl Default for MockPlatform {
        fn default() -> Self {
            Self::new("local-connection")
        }
    }

    impl MockPlatform {
        /// Create a mock whose first connection gets `connection_id`.
        ///
        /// Later connections get `{connection_id}-2`, `{connection_id}-3`...
        pub fn new(connection_id: &str) -> Self {
            Self {
                connection_id: ConnectionId::from(connection_id),
                next_connection: AtomicU64::new(1),
                behavior: Mutex::new(MockBehavior::default()),
                inner: Mutex::new(MockInner::default()),
                media_processor: AtomicBool::new(true),
                next_publisher: AtomicU64::new(1),
            }
        }

        /// Connections that are open, oldest first.
        pub async fn live_connections(&self) -> Vec<ConnectionId> {
            let inner = self.inner.lock().await;
            let mut open: Vec<_> = inner
                .connections
                .iter()
                .map(|(id, (sequence, _))| (*sequence, id.clone()))
                .collect();
            open.sort();
            open.into_iter().map(|(_, id)| id).collect()
        }

        /// Mutable access to the configured outcomes.
        pub async fn behavior(&self) -> MutexGuard<'_, MockBehavior> {
            self.behavior.lock().await
        }

        pub fn set_media_processor_support(&self, supported: bool) {
            self.media_processor.store(supported, Ordering::SeqCst);
        }

        /// Hold every future call of `op` until [`Self::release`].
        pub async fn hold(&self, op: GatedOp) {
            self.inner
                .lock()
                .await
                .gates
                .insert(op, Arc::new(Semaphore::new(0)));
        }

        /// Let one held call of `op` proceed.
        pub async fn release(&self, op: GatedOp) {
            if let Some(gate) = self.inner.lock().await.gates.get(&op) {
                gate.add_permits(1);
            }
        }

        /// Stop holding `op`; waiting calls proceed.
        pub async fn open(&self, op: GatedOp) {
            if let Some(gate) = self.inner.lock().await.gates.remove(&op) {
                gate.close();
            }
        }

        /// Deliver an event on the newest open connection.
        ///
        /// Returns false when no connection is listening.
        pub async fn emit(&self, event: PlatformEvent) -> bool {
            match self.newest_connection().await {
                Some((_, sender)) => sender.send(event).await.is_ok(),
                None => false,
            }
        }

        async fn newest_connection(&self) -> Option<(ConnectionId, mpsc::Sender<PlatformEvent>)> {
            self.inner
                .lock()
                .await
                .connections
                .iter()
                .max_by_key(|(_, (sequence, _))| *sequence)
                .map(|(id, (_, sender))| (id.clone(), sender.clone()))
        }

        /// Every call made so far, in order.
        pub async fn calls(&self) -> Vec<MockCall> {
            self.inner.lock().await.calls.clone()
        }

        /// Publishers created and not yet destroyed.
        pub async fn live_publishers(&self) -> HashSet<PublisherId> {
            self.inner.lock().await.publishers.keys().cloned().collect()
        }

        /// Live publishers of one source.
        pub async fn live_publishers_of(&self, source: VideoSource) -> Vec<PublisherId> {
            self.inner
                .lock()
                .await
                .publishers
                .iter()
                .filter(|(_, s)| **s == source)
                .map(|(id, _)| id.clone())
                .collect()
        }

        async fn record(&self, call: MockCall) {
            self.inner.lock().await.calls.push(call);
        }

        async fn pass_gate(&self, op: GatedOp) {
            let gate = self.inner.lock().await.gates.get(&op).cloned();
            if let Some(gate) = gate {
                // A closed gate lets everyone through
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
        }

        fn failure(message: &str) -> PlatformError {
            PlatformError::Other(message.to_string())
        }
    }

    #[async_trait::async_trait]
    impl MediaPlatform for MockPlatform {
        async fn connect(
            &self,
            request: &ConnectRequest,
            events: mpsc::Sender<PlatformEvent>,
        ) -> Result<ConnectionId, PlatformError> {
            self.record(MockCall::Connect(request.session_id.clone()))
                .await;
            let sequence = self.next_connection.fetch_add(1, Ordering::SeqCst);
            self.pass_gate(GatedOp::Connect).await;

            if let Some(error) = self.behavior.lock().await.fail_connect.clone() {
                return Err(error);
            }

            let connection_id = if sequence == 1 {
                self.connection_id.clone()
            } else {
                ConnectionId::from(format!("{}-{sequence}", self.connection_id))
            };
            self.inner
                .lock()
                .await
                .connections
                .insert(connection_id.clone(), (sequence, events));
            Ok(connection_id)
        }

        async fn disconnect(&self, connection: &ConnectionId) -> Result<(), PlatformError> {
            self.record(MockCall::Disconnect(connection.clone())).await;
            self.inner.lock().await.connections.remove(connection);
            Ok(())
        }

        async fn init_publisher(
            &self,
            options: &PublisherOptions,
        ) -> Result<PublisherId, PlatformError> {
            self.record(MockCall::InitPublisher(options.source)).await;

            {
                let behavior = self.behavior.lock().await;
                match options.source {
                    VideoSource::Camera if behavior.fail_camera_init => {
                        return Err(Self::failure("camera permission denied"));
                    }
                    VideoSource::Screen => {
                        if let Some(message) = &behavior.fail_screen_init {
                            return Err(Self::failure(message));
                        }
                    }
                    VideoSource::Camera => {}
                }
            }

            let id = PublisherId::new(format!(
                "publisher-{}",
                self.next_publisher.fetch_add(1, Ordering::SeqCst)
            ));
            self.inner
                .lock()
                .await
                .publishers
                .insert(id.clone(), options.source);
            Ok(id)
        }

        async fn publish(&self, publisher: &PublisherId) -> Result<(), PlatformError> {
            self.record(MockCall::Publish(publisher.clone())).await;

            let source = self.inner.lock().await.publishers.get(publisher).copied();
            match source {
                None => Err(PlatformError::UnknownPublisher(publisher.to_string())),
                Some(VideoSource::Screen) => {
                    self.pass_gate(GatedOp::ScreenPublish).await;
                    match &self.behavior.lock().await.fail_screen_publish {
                        Some(message) => Err(Self::failure(message)),
                        None => Ok(()),
                    }
                }
                Some(VideoSource::Camera) => Ok(()),
            }
        }

        async fn unpublish(&self, publisher: &PublisherId) -> Result<(), PlatformError> {
            self.record(MockCall::Unpublish(publisher.clone())).await;
            Ok(())
        }

        async fn destroy_publisher(&self, publisher: &PublisherId) -> Result<(), PlatformError> {
            self.record(MockCall::DestroyPublisher(publisher.clone()))
                .await;
            match self.inner.lock().await.publishers.remove(publisher) {
                Some(_) => Ok(()),
                None => Err(PlatformError::UnknownPublisher(publisher.to_string())),
            }
        }

        async fn subscribe(&self, stream: &StreamInfo) -> Result<(), PlatformError> {
            self.record(MockCall::Subscribe(stream.stream_id.clone()))
                .await;
            if self.behavior.lock().await.fail_subscribe {
                return Err(Self::failure("subscriber could not be created"));
            }
            Ok(())
        }

        async fn check_screen_sharing_capability(&self) -> ScreenShareCapability {
            self.record(MockCall::CheckCapability).await;
            self.pass_gate(GatedOp::CapabilityCheck).await;
            self.behavior.lock().await.capability
        }

        fn has_media_processor_support(&self) -> bool {
            self.media_processor.load(Ordering::SeqCst)
        }

        async fn apply_video_filter(
            &self,
            _publisher: &PublisherId,
            filter: &VideoFilter,
        ) -> Result<(), PlatformError> {
            self.record(MockCall::ApplyFilter(filter.clone())).await;
            self.pass_gate(GatedOp::FilterApply).await;
            match &self.behavior.lock().await.fail_filter {
                Some(message) => Err(Self::failure(message)),
                None => Ok(()),
            }
        }

        async fn clear_video_filter(&self, _publisher: &PublisherId) -> Result<(), PlatformError> {
            self.record(MockCall::ClearFilter).await;
            self.pass_gate(GatedOp::FilterClear).await;
            match &self.behavior.lock().await.fail_clear {
                Some(message) => Err(Self::failure(message)),
                None => Ok(()),
            }
        }

        async fn signal(&self, kind: &str, data: &str) -> Result<(), PlatformError> {
            self.record(MockCall::Signal {
                kind: kind.to_string(),
                data: data.to_string(),
            })
            .await;

            let (failure, echo) = {
                let behavior = self.behavior.lock().await;
                (behavior.fail_signal.clone(), behavior.echo_signals)
            };
            if let Some(message) = failure {
                return Err(Self::failure(&message));
            }

            if echo {
                if let Some((from, sender)) = self.newest_connection().await {
                    let echoed = PlatformEvent::SignalReceived(RawSignal {
                        kind: Some(format!("signal:{kind}")),
                        data: serde_json::Value::String(data.to_string()),
                        from: Some(from),
                    });
                    // The receiving side may already be gone
                    let _ = sender.send(echoed).await;
                }
            }
            Ok(())
        }
    }

    /// Build a remote stream description.
    pub fn remote_stream(connection_id: &str, stream_id: &str, name: &str) -> StreamInfo {
        StreamInfo {
            stream_id: StreamId::from(stream_id),
            connection_id: ConnectionId::from(connection_id),
            name: Some(name.to_string()),
        }
    }
}
