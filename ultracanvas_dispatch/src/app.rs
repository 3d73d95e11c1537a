// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Application start-up and tear-down.

use ultracanvas_native::{NativeError, NativeEventSource};

use crate::config::DispatchConfig;
use crate::coordinator::DispatchCoordinator;
use crate::error::DispatchError;

/// Connect to the display and build a coordinator.
///
/// A connection failure is reported as [`DispatchError::BackendInit`].
pub fn initialize<S, F>(config: DispatchConfig, connect: F) -> Result<DispatchCoordinator<S>, DispatchError>
where
    S: NativeEventSource,
    F: FnOnce() -> Result<S, NativeError>,
{
    let source = connect().map_err(|error| {
        tracing::error!(%error, "display connection failed");
        DispatchError::BackendInit(error)
    })?;
    tracing::info!(
        queue_capacity = config.queue_capacity,
        max_events_per_turn = config.max_events_per_turn,
        "dispatch coordinator initialized"
    );
    Ok(DispatchCoordinator::new(config, source))
}

/// Release selections, destroy windows and close the display connection.
pub fn shutdown<S: NativeEventSource>(coordinator: DispatchCoordinator<S>) {
    coordinator.shutdown();
    tracing::info!("dispatch coordinator stopped");
}

/// Process exit status for the result of [`DispatchCoordinator::run`].
///
/// `0` for a clean exit, `2` when the backend never came up, `1` for any other failure.
pub fn exit_code(result: &Result<(), DispatchError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(DispatchError::BackendInit(_)) => 2,
        Err(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultracanvas_native::headless::{HeadlessDisplay, HeadlessServer};

    #[test]
    fn failed_connections_are_init_errors() {
        let result = initialize(DispatchConfig::default(), || {
            Err::<HeadlessDisplay, _>(NativeError::Disconnected)
        });
        let error = result.map(|_| ()).unwrap_err();
        assert!(matches!(error, DispatchError::BackendInit(_)));
        assert_eq!(exit_code(&Err(error)), 2);
        assert_eq!(exit_code(&Ok(())), 0);
        assert_eq!(exit_code(&Err(DispatchError::Native(NativeError::Disconnected))), 1);
    }

    #[test]
    fn shutdown_destroys_windows() {
        let server = HeadlessServer::new();
        let mut app = initialize(DispatchConfig::default(), || Ok(server.connect())).unwrap();
        let window = app
            .create_window(&ultracanvas_native::WindowDescriptor::default())
            .unwrap();
        let native = app.window(window).unwrap().native();
        assert!(server.window_exists(native));
        shutdown(app);
        assert!(!server.window_exists(native));
    }
}
