//! Event Dispatcher
//!
//! Single cooperative loop between the connection manager and the front
//! end. Status events feed the display driver and the observer; driver
//! ticks go to the observer.

use std::future::Future;

use tokio::sync::mpsc;

use super::connection::ConnectionEvent;
use super::display::TimingDisplayDriver;
use crate::application::observer::ClientObserver;

pub struct EventDispatcher<O: ClientObserver> {
    driver: TimingDisplayDriver,
    observer: O,
}

impl<O: ClientObserver> EventDispatcher<O> {
    pub fn new(driver: TimingDisplayDriver, observer: O) -> Self {
        Self { driver, observer }
    }

    pub fn driver(&self) -> &TimingDisplayDriver {
        &self.driver
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Route one connection event.
    pub fn dispatch(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected { .. } => self.observer.on_connected(),
            ConnectionEvent::Disconnected { reason } => self.observer.on_disconnected(&reason),
            ConnectionEvent::HeartbeatTimeout => self.observer.on_heartbeat_timeout(),
            ConnectionEvent::Status(status) => {
                self.observer.on_status(&status);
                if let Some(tick) = self.driver.handle_status(&status) {
                    self.observer.on_display_tick(&tick.formatted, tick.raw_micros);
                }
            }
            ConnectionEvent::CommandDropped(command) => self.observer.on_command_dropped(&command),
        }
    }

    /// Run until `shutdown` resolves or the event stream ends.
    pub async fn run<F>(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<ConnectionEvent>,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => break,

                event = events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => {
                        tracing::debug!("Connection event stream ended");
                        break;
                    }
                },

                tick = self.driver.next_tick() => {
                    self.observer.on_display_tick(&tick.formatted, tick.raw_micros);
                }
            }
        }
    }
}
