//! Room coordinator tests against the in-process media platform.
//!
//! Covers joining and leaving, roster churn, screen-share exclusivity,
//! the filter lifecycle and chat.

use common::secret::SecretString;
use common::types::{ConnectionId, SessionId};
use room_client::actors::coordinator::{
    STATUS_CHECKING_CAPABILITY, STATUS_FILTERS_UNSUPPORTED, STATUS_PUBLISHER_MISSING,
    STATUS_SCREEN_SHARED, STATUS_SCREEN_STOPPED, STATUS_SCREEN_STOPPED_EXTERNALLY,
};
use room_client::chat::SYSTEM_SENDER;
use room_client::errors::{ChatError, FilterError, PlatformError, ScreenShareError};
use room_client::platform::mock::{remote_stream, GatedOp, MockCall, MockPlatform};
use room_client::platform::{
    BlurStrength, PlatformEvent, RawSignal, ScreenShareCapability, StreamDestroyedReason,
    VideoFilter, VideoSource,
};
use room_client::state::{
    ConnectionState, DisplayMode, FilterPhase, RoomState, ScreenShareState, StatusTone,
};
use room_client::view::{MainSurface, RoomView};
use room_client::{JoinParams, RoomActor, RoomError, RoomHandle, ScreenShareOutcome};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const LOCAL_CONNECTION: &str = "local-connection";

fn join_params(identity: &str) -> JoinParams {
    JoinParams {
        application_id: "test-application".to_string(),
        session_id: SessionId::from("1_session"),
        token: SecretString::from("T1==token"),
        identity: identity.to_string(),
    }
}

fn spawn_room() -> (Arc<MockPlatform>, RoomHandle) {
    let platform = Arc::new(MockPlatform::new(LOCAL_CONNECTION));
    let (handle, _task) = RoomActor::spawn(platform.clone(), CancellationToken::new());
    (platform, handle)
}

/// Spawn a room and join it as "Alice" with the camera ready.
async fn joined_room() -> Result<(Arc<MockPlatform>, RoomHandle), anyhow::Error> {
    let (platform, handle) = spawn_room();
    handle.join(join_params("Alice")).await?;
    wait_for_state(&handle, |state| state.camera_publisher.is_some()).await?;
    Ok((platform, handle))
}

async fn wait_for_state(
    handle: &RoomHandle,
    predicate: impl FnMut(&RoomState) -> bool,
) -> Result<RoomState, anyhow::Error> {
    let mut receiver = handle.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), async {
        receiver.wait_for(predicate).await.map(|state| state.clone())
    })
    .await??;
    Ok(state)
}

/// Poll `check` until it holds or five seconds pass.
async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn screen_publishers(platform: &MockPlatform) -> usize {
    platform.live_publishers_of(VideoSource::Screen).await.len()
}

fn local_disconnect() -> MockCall {
    MockCall::Disconnect(ConnectionId::from(LOCAL_CONNECTION))
}

fn chat_signal(from: &str, data: serde_json::Value) -> PlatformEvent {
    PlatformEvent::SignalReceived(RawSignal {
        kind: Some("signal:chat".to_string()),
        data,
        from: Some(ConnectionId::from(from)),
    })
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[tokio::test]
async fn test_join_connects_and_publishes_camera() -> Result<(), anyhow::Error> {
    let (platform, handle) = spawn_room();

    let connection_id = handle.join(join_params("Alice")).await?;
    assert_eq!(connection_id, ConnectionId::from(LOCAL_CONNECTION));

    let state = wait_for_state(&handle, |state| state.camera_publisher.is_some()).await?;
    assert_eq!(state.connection, ConnectionState::Connected);
    assert_eq!(state.identity.as_deref(), Some("Alice"));
    assert_eq!(state.session_id, Some(SessionId::from("1_session")));

    let Some(camera) = state.camera_publisher.clone() else {
        unreachable!("camera publisher missing after join");
    };
    assert!(
        eventually(|| async {
            platform
                .calls()
                .await
                .contains(&MockCall::Publish(camera.clone()))
        })
        .await
    );

    Ok(())
}

#[tokio::test]
async fn test_second_join_is_rejected() -> Result<(), anyhow::Error> {
    let (_platform, handle) = joined_room().await?;

    let result = handle.join(join_params("Alice")).await;

    assert_eq!(result, Err(RoomError::AlreadyJoined));
    Ok(())
}

#[tokio::test]
async fn test_connect_failure_surfaces_error_and_cleans_up() -> Result<(), anyhow::Error> {
    let (platform, handle) = spawn_room();
    let rejection = PlatformError::Rejected {
        code: 1004,
        message: "Authentication error".to_string(),
    };
    platform.behavior().await.fail_connect = Some(rejection.clone());

    let result = handle.join(join_params("Alice")).await;

    assert_eq!(result, Err(RoomError::Connection(rejection)));
    let state = handle.state().await?;
    assert_eq!(state.connection, ConnectionState::Disconnected);
    assert_eq!(
        state.connection_status.map(|status| status.tone),
        Some(StatusTone::Error)
    );

    // The camera publisher created for the failed attempt is destroyed
    assert!(eventually(|| async { platform.live_publishers().await.is_empty() }).await);

    // Never retried
    let connects = platform
        .calls()
        .await
        .iter()
        .filter(|call| matches!(call, MockCall::Connect(_)))
        .count();
    assert_eq!(connects, 1);

    Ok(())
}

#[tokio::test]
async fn test_leave_while_connecting_abandons_join() -> Result<(), anyhow::Error> {
    let (platform, handle) = spawn_room();
    platform.hold(GatedOp::Connect).await;

    let join = tokio::spawn({
        let handle = handle.clone();
        async move { handle.join(join_params("Alice")).await }
    });
    wait_for_state(&handle, |state| {
        state.connection == ConnectionState::Connecting
    })
    .await?;

    handle.leave().await?;
    assert_eq!(join.await?, Err(RoomError::JoinAbandoned));

    // The late connection is dropped and nothing is left published
    platform.release(GatedOp::Connect).await;
    assert!(eventually(|| async { platform.calls().await.contains(&local_disconnect()) }).await);
    assert!(eventually(|| async { platform.live_publishers().await.is_empty() }).await);
    assert_eq!(handle.state().await?.connection, ConnectionState::Disconnected);

    Ok(())
}

#[tokio::test]
async fn test_abandoned_connection_closed_after_quick_rejoin() -> Result<(), anyhow::Error> {
    let (platform, handle) = spawn_room();
    platform.hold(GatedOp::Connect).await;

    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.join(join_params("Alice")).await }
    });
    wait_for_state(&handle, |state| {
        state.connection == ConnectionState::Connecting
    })
    .await?;
    handle.leave().await?;
    assert_eq!(first.await?, Err(RoomError::JoinAbandoned));

    let second = tokio::spawn({
        let handle = handle.clone();
        async move { handle.join(join_params("Alice")).await }
    });
    wait_for_state(&handle, |state| {
        state.connection == ConnectionState::Connecting
    })
    .await?;

    // The abandoned connect finishes first, while the rejoin is pending
    platform.release(GatedOp::Connect).await;
    assert!(eventually(|| async { platform.calls().await.contains(&local_disconnect()) }).await);

    platform.release(GatedOp::Connect).await;
    let connection_id = second.await??;
    assert_ne!(connection_id, ConnectionId::from(LOCAL_CONNECTION));
    assert_eq!(platform.live_connections().await, vec![connection_id]);
    assert_eq!(handle.state().await?.connection, ConnectionState::Connected);

    Ok(())
}

#[tokio::test]
async fn test_camera_init_failure_is_reported() -> Result<(), anyhow::Error> {
    let (platform, handle) = spawn_room();
    platform.behavior().await.fail_camera_init = true;

    handle.join(join_params("Alice")).await?;

    let state = wait_for_state(&handle, |state| state.camera_status.is_some()).await?;
    assert_eq!(state.connection, ConnectionState::Connected);
    assert!(state.camera_publisher.is_none());
    let Some(status) = RoomView::project(&state).camera_status else {
        unreachable!("camera status missing from view");
    };
    assert_eq!(status.tone, StatusTone::Error);
    assert!(status.text.starts_with("Failed to start camera"));

    handle.leave().await?;
    assert!(handle.state().await?.camera_status.is_none());
    Ok(())
}

#[tokio::test]
async fn test_leave_removes_all_local_publishers() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    handle.toggle_screen_share().await?;
    assert_eq!(platform.live_publishers().await.len(), 2);

    handle.leave().await?;

    // Torn down before leave returned
    assert!(platform.live_publishers().await.is_empty());
    assert!(platform.calls().await.contains(&local_disconnect()));

    let state = handle.state().await?;
    assert_eq!(state.connection, ConnectionState::Disconnected);
    assert_eq!(state.display_mode(), DisplayMode::CameraMain);
    assert!(state.roster.is_empty());
    assert!(state.camera_publisher.is_none());

    Ok(())
}

#[tokio::test]
async fn test_leave_when_disconnected_is_noop() -> Result<(), anyhow::Error> {
    let (platform, handle) = spawn_room();

    handle.leave().await?;

    assert!(platform.calls().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rejoin_after_leave() -> Result<(), anyhow::Error> {
    let (_platform, handle) = joined_room().await?;
    handle.send_chat("first visit").await?;
    handle.leave().await?;

    handle.join(join_params("Alice")).await?;

    let state = handle.state().await?;
    assert_eq!(state.connection, ConnectionState::Connected);
    assert!(state.transcript.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_platform_disconnect_tears_down_room() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;

    platform
        .emit(PlatformEvent::SessionDisconnected {
            reason: "networkDisconnected".to_string(),
        })
        .await;

    let state = wait_for_state(&handle, |state| {
        state.connection == ConnectionState::Disconnected
    })
    .await?;
    assert!(state
        .connection_status
        .is_some_and(|status| status.text.contains("networkDisconnected")));
    assert!(platform.live_publishers().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_cancel_leaves_room() -> Result<(), anyhow::Error> {
    let platform = Arc::new(MockPlatform::new(LOCAL_CONNECTION));
    let (handle, task) = RoomActor::spawn(platform.clone(), CancellationToken::new());
    handle.join(join_params("Alice")).await?;
    wait_for_state(&handle, |state| state.camera_publisher.is_some()).await?;

    handle.cancel();
    tokio::time::timeout(Duration::from_secs(5), task).await??;

    assert!(platform.live_publishers().await.is_empty());
    assert!(matches!(
        handle.state().await,
        Err(RoomError::Internal(_))
    ));

    Ok(())
}

// ============================================================================
// Roster
// ============================================================================

#[tokio::test]
async fn test_roster_follows_stream_events() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    assert!(RoomView::project(&handle.state().await?).roster_placeholder_visible);

    platform
        .emit(PlatformEvent::StreamCreated(remote_stream("c1", "s1", "Bob")))
        .await;
    platform
        .emit(PlatformEvent::StreamCreated(remote_stream("c2", "s2", "Carol")))
        .await;
    platform
        .emit(PlatformEvent::StreamDestroyed(remote_stream("c1", "s1", "Bob")))
        .await;
    platform
        .emit(PlatformEvent::StreamDestroyed(remote_stream("c9", "s9", "Ghost")))
        .await;
    platform
        .emit(PlatformEvent::StreamCreated(remote_stream("c3", "s3", "Dan")))
        .await;

    let state = wait_for_state(&handle, |state| state.roster.len() == 2).await?;
    let names: Vec<_> = state
        .roster
        .iter()
        .map(|p| p.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["Carol", "Dan"]);

    let view = RoomView::project(&state);
    assert!(!view.roster_placeholder_visible);
    assert_eq!(view.tiles.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_own_stream_is_not_a_participant() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;

    platform
        .emit(PlatformEvent::StreamCreated(remote_stream(
            LOCAL_CONNECTION,
            "own",
            "Alice",
        )))
        .await;
    platform
        .emit(PlatformEvent::StreamCreated(remote_stream("c1", "s1", "Bob")))
        .await;

    let state = wait_for_state(&handle, |state| !state.roster.is_empty()).await?;
    assert_eq!(state.roster.len(), 1);
    assert!(state
        .roster
        .iter()
        .all(|p| p.connection_id != ConnectionId::from(LOCAL_CONNECTION)));

    Ok(())
}

#[tokio::test]
async fn test_failed_subscription_keeps_participant() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    platform.behavior().await.fail_subscribe = true;

    platform
        .emit(PlatformEvent::StreamCreated(remote_stream("c1", "s1", "Bob")))
        .await;

    wait_for_state(&handle, |state| state.roster.len() == 1).await?;
    assert!(
        eventually(|| async {
            platform
                .calls()
                .await
                .iter()
                .any(|call| matches!(call, MockCall::Subscribe(_)))
        })
        .await
    );
    assert_eq!(handle.state().await?.roster.len(), 1);

    Ok(())
}

// ============================================================================
// Screen sharing
// ============================================================================

#[tokio::test]
async fn test_toggle_pair_restores_camera_main() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;

    assert_eq!(
        handle.toggle_screen_share().await?,
        ScreenShareOutcome::Sharing
    );
    let state = handle.state().await?;
    assert_eq!(state.display_mode(), DisplayMode::ScreenMain);
    assert_eq!(
        state.screen_status.map(|status| status.text),
        Some(STATUS_SCREEN_SHARED.to_string())
    );
    assert_eq!(screen_publishers(&platform).await, 1);

    let view = RoomView::project(&handle.state().await?);
    assert_eq!(view.main_surface, MainSurface::Screen);
    assert!(view.mini_self_view_visible);
    assert_eq!(view.screen_toggle_label, "Stop Sharing Screen");

    assert_eq!(
        handle.toggle_screen_share().await?,
        ScreenShareOutcome::Stopped
    );
    let state = handle.state().await?;
    assert_eq!(state.display_mode(), DisplayMode::CameraMain);
    assert_eq!(state.screen_share, ScreenShareState::Idle);
    assert_eq!(
        state.screen_status.map(|status| status.text),
        Some(STATUS_SCREEN_STOPPED.to_string())
    );
    assert_eq!(screen_publishers(&platform).await, 0);

    Ok(())
}

#[tokio::test]
async fn test_toggle_in_flight_is_rejected() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    platform.hold(GatedOp::CapabilityCheck).await;

    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.toggle_screen_share().await }
    });
    let state = wait_for_state(&handle, |state| {
        state.screen_share == ScreenShareState::CapabilityChecking
    })
    .await?;
    assert_eq!(
        state.screen_status.map(|status| status.text),
        Some(STATUS_CHECKING_CAPABILITY.to_string())
    );
    assert!(!RoomView::project(&handle.state().await?).screen_toggle_enabled);

    assert_eq!(
        handle.toggle_screen_share().await,
        Err(RoomError::ToggleInFlight)
    );
    assert_eq!(
        handle.state().await?.screen_share,
        ScreenShareState::CapabilityChecking
    );

    platform.release(GatedOp::CapabilityCheck).await;
    assert_eq!(first.await??, ScreenShareOutcome::Sharing);

    let capability_checks = platform
        .calls()
        .await
        .iter()
        .filter(|call| matches!(call, MockCall::CheckCapability))
        .count();
    assert_eq!(capability_checks, 1);

    Ok(())
}

#[tokio::test]
async fn test_unsupported_browser_returns_to_idle() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    platform.behavior().await.capability = ScreenShareCapability {
        supported: false,
        extension_required: false,
    };

    let result = handle.toggle_screen_share().await;

    assert_eq!(
        result,
        Err(RoomError::ScreenShare(ScreenShareError::Unsupported))
    );
    let state = handle.state().await?;
    assert_eq!(state.screen_share, ScreenShareState::Idle);
    assert_eq!(
        state.screen_status.as_ref().map(|status| status.text.as_str()),
        Some("Not supported in this browser.")
    );
    assert!(RoomView::project(&state).screen_toggle_enabled);
    assert_eq!(screen_publishers(&platform).await, 0);

    Ok(())
}

#[tokio::test]
async fn test_extension_required_is_reported() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    platform.behavior().await.capability = ScreenShareCapability {
        supported: true,
        extension_required: true,
    };

    assert_eq!(
        handle.toggle_screen_share().await,
        Err(RoomError::ScreenShare(ScreenShareError::ExtensionRequired))
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_publish_leaves_camera_main() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    platform.behavior().await.fail_screen_publish = Some("permission denied".to_string());

    let result = handle.toggle_screen_share().await;

    assert_eq!(
        result,
        Err(RoomError::ScreenShare(ScreenShareError::PublishFailed(
            "permission denied".to_string()
        )))
    );
    let state = handle.state().await?;
    assert_eq!(state.display_mode(), DisplayMode::CameraMain);
    assert_eq!(state.screen_share, ScreenShareState::Idle);
    assert_eq!(
        state.screen_status.map(|status| status.tone),
        Some(StatusTone::Error)
    );
    assert_eq!(screen_publishers(&platform).await, 0);

    // The control is usable again
    platform.behavior().await.fail_screen_publish = None;
    assert_eq!(
        handle.toggle_screen_share().await?,
        ScreenShareOutcome::Sharing
    );

    Ok(())
}

#[tokio::test]
async fn test_native_stop_is_handled_like_toggle_off() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    handle.toggle_screen_share().await?;
    let Some(publisher) = handle.state().await?.screen_share.publisher().cloned() else {
        unreachable!("screen publisher missing while sharing");
    };

    platform
        .emit(PlatformEvent::PublisherStreamDestroyed {
            publisher,
            reason: StreamDestroyedReason::MediaStopped,
        })
        .await;

    let state = wait_for_state(&handle, |state| {
        state.screen_share == ScreenShareState::Idle
    })
    .await?;
    assert_eq!(state.display_mode(), DisplayMode::CameraMain);
    assert_eq!(
        state.screen_status.map(|status| status.text),
        Some(STATUS_SCREEN_STOPPED_EXTERNALLY.to_string())
    );
    assert_eq!(screen_publishers(&platform).await, 0);

    Ok(())
}

#[tokio::test]
async fn test_native_stop_while_starting_returns_to_camera() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    platform.hold(GatedOp::ScreenPublish).await;

    let toggle = tokio::spawn({
        let handle = handle.clone();
        async move { handle.toggle_screen_share().await }
    });
    wait_for_state(&handle, |state| {
        state.screen_share == ScreenShareState::Starting
    })
    .await?;
    assert!(eventually(|| async { screen_publishers(&platform).await == 1 }).await);
    let Some(screen) = platform
        .live_publishers_of(VideoSource::Screen)
        .await
        .into_iter()
        .next()
    else {
        unreachable!("screen publisher missing while starting");
    };

    platform
        .emit(PlatformEvent::PublisherStreamDestroyed {
            publisher: screen.clone(),
            reason: StreamDestroyedReason::MediaStopped,
        })
        .await;
    // Events are handled in order; once Bob is listed the stop was seen
    platform
        .emit(PlatformEvent::StreamCreated(remote_stream("c1", "s1", "Bob")))
        .await;
    wait_for_state(&handle, |state| !state.roster.is_empty()).await?;

    platform.release(GatedOp::ScreenPublish).await;

    assert_eq!(toggle.await?, Ok(ScreenShareOutcome::Stopped));
    let state = handle.state().await?;
    assert_eq!(state.screen_share, ScreenShareState::Idle);
    assert_eq!(state.display_mode(), DisplayMode::CameraMain);
    assert_eq!(
        state.screen_status.map(|status| status.text),
        Some(STATUS_SCREEN_STOPPED_EXTERNALLY.to_string())
    );
    assert_eq!(screen_publishers(&platform).await, 0);
    assert!(!platform.calls().await.contains(&MockCall::Unpublish(screen)));

    Ok(())
}

#[tokio::test]
async fn test_own_unpublish_event_does_not_stop_share() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    handle.toggle_screen_share().await?;
    let Some(publisher) = handle.state().await?.screen_share.publisher().cloned() else {
        unreachable!("screen publisher missing while sharing");
    };

    platform
        .emit(PlatformEvent::PublisherStreamDestroyed {
            publisher,
            reason: StreamDestroyedReason::Unpublished,
        })
        .await;
    // Events are handled in order; once Bob is listed the unpublish was seen
    platform
        .emit(PlatformEvent::StreamCreated(remote_stream("c1", "s1", "Bob")))
        .await;
    let state = wait_for_state(&handle, |state| !state.roster.is_empty()).await?;

    assert_eq!(state.display_mode(), DisplayMode::ScreenMain);
    Ok(())
}

#[tokio::test]
async fn test_toggle_requires_connection() -> Result<(), anyhow::Error> {
    let (_platform, handle) = spawn_room();

    assert_eq!(
        handle.toggle_screen_share().await,
        Err(RoomError::NotConnected)
    );
    Ok(())
}

#[tokio::test]
async fn test_screen_started_after_leave_is_destroyed() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    platform.hold(GatedOp::ScreenPublish).await;

    let toggle = tokio::spawn({
        let handle = handle.clone();
        async move { handle.toggle_screen_share().await }
    });
    wait_for_state(&handle, |state| {
        state.screen_share == ScreenShareState::Starting
    })
    .await?;

    handle.leave().await?;
    assert_eq!(toggle.await?, Err(RoomError::NotConnected));

    platform.release(GatedOp::ScreenPublish).await;
    assert!(eventually(|| async { platform.live_publishers().await.is_empty() }).await);

    Ok(())
}

// ============================================================================
// Filters
// ============================================================================

#[tokio::test]
async fn test_apply_filter_success() -> Result<(), anyhow::Error> {
    let (_platform, handle) = joined_room().await?;
    let blur = VideoFilter::BackgroundBlur {
        strength: BlurStrength::Low,
    };

    handle.apply_filter(blur.clone()).await?;

    let state = handle.state().await?;
    assert_eq!(state.filter.phase, FilterPhase::Applied);
    assert_eq!(state.filter.active, Some(blur));
    assert_eq!(
        state.filter_status.map(|status| status.text),
        Some("Background Blur (Low) applied successfully.".to_string())
    );

    Ok(())
}

#[tokio::test]
async fn test_failed_filter_keeps_previous() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    let low = VideoFilter::BackgroundBlur {
        strength: BlurStrength::Low,
    };
    handle.apply_filter(low.clone()).await?;
    platform.behavior().await.fail_filter = Some("image blocked".to_string());

    let result = handle
        .apply_filter(VideoFilter::default_replacement())
        .await;

    let Err(RoomError::Filter(FilterError::Application { label, message })) = result else {
        unreachable!("expected filter application error, got {result:?}");
    };
    assert_eq!(label, "Background Replacement");
    assert!(message.starts_with("image blocked"));

    let state = handle.state().await?;
    assert_eq!(state.filter.phase, FilterPhase::Failed);
    assert_eq!(state.filter.active, Some(low));
    assert!(state.camera_publisher.is_some());

    Ok(())
}

#[tokio::test]
async fn test_filter_without_processor_support() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    platform.set_media_processor_support(false);

    let result = handle
        .apply_filter(VideoFilter::BackgroundBlur {
            strength: BlurStrength::High,
        })
        .await;

    assert_eq!(
        result,
        Err(RoomError::Filter(FilterError::Unavailable(
            STATUS_FILTERS_UNSUPPORTED.to_string()
        )))
    );
    assert!(!platform
        .calls()
        .await
        .iter()
        .any(|call| matches!(call, MockCall::ApplyFilter(_))));

    Ok(())
}

#[tokio::test]
async fn test_filter_before_publisher_exists() -> Result<(), anyhow::Error> {
    let (_platform, handle) = spawn_room();

    let result = handle
        .apply_filter(VideoFilter::BackgroundBlur {
            strength: BlurStrength::Low,
        })
        .await;

    assert_eq!(
        result,
        Err(RoomError::Filter(FilterError::Unavailable(
            STATUS_PUBLISHER_MISSING.to_string()
        )))
    );
    // Clearing without a publisher is a no-op
    handle.clear_filter().await?;

    Ok(())
}

#[tokio::test]
async fn test_filter_operation_in_flight_is_busy() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    platform.hold(GatedOp::FilterApply).await;

    let apply = tokio::spawn({
        let handle = handle.clone();
        async move {
            handle
                .apply_filter(VideoFilter::BackgroundBlur {
                    strength: BlurStrength::Low,
                })
                .await
        }
    });
    wait_for_state(&handle, |state| state.filter.phase == FilterPhase::Applying).await?;

    assert_eq!(
        handle
            .apply_filter(VideoFilter::default_replacement())
            .await,
        Err(RoomError::FilterBusy)
    );
    assert_eq!(handle.clear_filter().await, Err(RoomError::FilterBusy));

    platform.release(GatedOp::FilterApply).await;
    apply.await??;

    Ok(())
}

#[tokio::test]
async fn test_clear_filter() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    handle
        .apply_filter(VideoFilter::BackgroundBlur {
            strength: BlurStrength::High,
        })
        .await?;

    platform.behavior().await.fail_clear = Some("processor busy".to_string());
    let result = handle.clear_filter().await;
    assert_eq!(
        result,
        Err(RoomError::Filter(FilterError::Clear(
            "processor busy".to_string()
        )))
    );
    assert!(handle.state().await?.filter.active.is_some());

    platform.behavior().await.fail_clear = None;
    handle.clear_filter().await?;

    let state = handle.state().await?;
    assert_eq!(state.filter.phase, FilterPhase::Idle);
    assert!(state.filter.active.is_none());
    assert_eq!(
        state.filter_status.map(|status| status.text),
        Some("Filter cleared.".to_string())
    );

    Ok(())
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn test_chat_send_appends_once_and_drops_echo() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;

    handle.send_chat("  hi  ").await?;

    // Events are delivered in order, so the echo is handled before this one
    platform
        .emit(chat_signal(
            "c-bob",
            serde_json::json!(r#"{"sender":"Bob","text":"hello"}"#),
        ))
        .await;
    let state = wait_for_state(&handle, |state| {
        state.transcript.iter().any(|m| m.sender == "Bob")
    })
    .await?;

    assert_eq!(state.transcript.len(), 2);
    let mine: Vec<_> = state
        .transcript
        .iter()
        .filter(|m| m.originated_locally)
        .collect();
    assert_eq!(mine.len(), 1);
    assert!(mine
        .first()
        .is_some_and(|m| m.text == "hi" && m.sender == "Alice"));

    Ok(())
}

#[tokio::test]
async fn test_blank_chat_is_not_sent() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;

    assert_eq!(
        handle.send_chat("   ").await,
        Err(RoomError::Chat(ChatError::Empty))
    );
    assert!(!platform
        .calls()
        .await
        .iter()
        .any(|call| matches!(call, MockCall::Signal { .. })));
    assert!(handle.state().await?.transcript.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_chat_relay_failure_adds_system_entry() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;
    platform.behavior().await.fail_signal = Some("relay offline".to_string());

    let result = handle.send_chat("hello").await;

    assert_eq!(
        result,
        Err(RoomError::Chat(ChatError::Relay("relay offline".to_string())))
    );
    let transcript = handle.state().await?.transcript;
    assert_eq!(transcript.len(), 1);
    assert!(transcript.first().is_some_and(|m| m.sender == SYSTEM_SENDER
        && m.text == "Failed to send message: relay offline"));

    Ok(())
}

#[tokio::test]
async fn test_malformed_signals_are_dropped() -> Result<(), anyhow::Error> {
    let (platform, handle) = joined_room().await?;

    platform
        .emit(chat_signal(
            "c-bob",
            serde_json::json!({"sender": "Bob", "text": "nested"}),
        ))
        .await;
    platform
        .emit(chat_signal("c-bob", serde_json::json!("not json")))
        .await;
    platform
        .emit(PlatformEvent::SignalReceived(RawSignal {
            kind: None,
            data: serde_json::json!("{}"),
            from: None,
        }))
        .await;
    platform
        .emit(chat_signal(
            "c-bob",
            serde_json::json!(r#"{"sender":"Bob","text":"valid"}"#),
        ))
        .await;

    let state = wait_for_state(&handle, |state| !state.transcript.is_empty()).await?;
    assert_eq!(state.transcript.len(), 1);
    assert!(state
        .transcript
        .first()
        .is_some_and(|m| m.text == "valid" && !m.originated_locally));
    assert_eq!(state.connection, ConnectionState::Connected);

    Ok(())
}

#[tokio::test]
async fn test_chat_requires_connection() -> Result<(), anyhow::Error> {
    let (_platform, handle) = spawn_room();

    assert_eq!(handle.send_chat("hi").await, Err(RoomError::NotConnected));
    Ok(())
}
