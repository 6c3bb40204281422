//! Application Startup
//!
//! Wires the connection manager, the display dispatcher and the console.

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::services::{
    ConnectionEvent, ConnectionHandle, ConnectionManager, EventDispatcher, TimingDisplayDriver,
};
use crate::application::ClientObserver;
use crate::config::Settings;
use crate::infrastructure::{Connector, WebSocketConnector};
use crate::presentation::{read_console, spawn_stdin_lines, ConsoleExit, ConsoleObserver};
use crate::shared::error::ClientError;

/// Application instance
pub struct Application<C: Connector, O: ClientObserver> {
    manager: ConnectionManager<C>,
    handle: ConnectionHandle,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    dispatcher: EventDispatcher<O>,
}

impl Application<WebSocketConnector, ConsoleObserver<std::io::Stdout>> {
    /// Build the console client from settings
    pub fn build(settings: Settings) -> Self {
        Self::with_parts(WebSocketConnector::new(), ConsoleObserver::stdout(), &settings)
    }
}

impl<C: Connector, O: ClientObserver> Application<C, O> {
    pub fn with_parts(connector: C, observer: O, settings: &Settings) -> Self {
        let (manager, handle, events) = ConnectionManager::new(connector, settings);
        let dispatcher = EventDispatcher::new(TimingDisplayDriver::new(&settings.display), observer);

        Self {
            manager,
            handle,
            events,
            dispatcher,
        }
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Run until Ctrl-C or a `quit` line on stdin.
    pub async fn run_until_stopped(self) -> Result<()> {
        let console = tokio::spawn(read_console(spawn_stdin_lines(), self.handle.clone()));
        self.run_until(shutdown_signal(console)).await?;
        Ok(())
    }

    /// Connect, then dispatch events until `shutdown` resolves.
    ///
    /// The manager is shut down and awaited before this returns, so no
    /// timer or link outlives the call.
    pub async fn run_until<F>(self, shutdown: F) -> Result<O>
    where
        F: std::future::Future<Output = ()>,
    {
        let Self {
            manager,
            handle,
            mut events,
            mut dispatcher,
        } = self;

        let manager_task = manager.spawn();
        handle.start()?;

        dispatcher.run(&mut events, shutdown).await;

        handle.shutdown();
        manager_task.await?;

        // Deliver what the manager emitted while stopping
        while let Ok(event) = events.try_recv() {
            dispatcher.dispatch(event);
        }

        Ok(dispatcher.into_observer())
    }
}

async fn shutdown_signal(console: JoinHandle<Result<ConsoleExit, ClientError>>) {
    let quit = async move {
        match console.await {
            Ok(Ok(ConsoleExit::Quit)) => return,
            Ok(Ok(ConsoleExit::EndOfInput)) => tracing::debug!("Console input closed"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Console reader stopped"),
            Err(e) => tracing::warn!(error = %e, "Console task failed"),
        }
        // Without a console only Ctrl-C stops the client
        std::future::pending::<()>().await
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => tracing::info!("Ctrl-C received, shutting down"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        },
        () = quit => tracing::info!("Quit requested, shutting down"),
    }
}
