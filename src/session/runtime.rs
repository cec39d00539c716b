use super::controller::{CompletionReceiver, SessionController};
use crate::audio::sink::SinkEvent;
use crate::commands::{CommandReceiver, SessionHandle};
use crate::events::EventSender;
use crate::media_session::MediaCommandReceiver;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// The session task: one loop that owns the controller and feeds it every
/// input in arrival order.
pub struct SessionRuntime {
    controller: SessionController,
    commands: CommandReceiver,
    sink_events: mpsc::UnboundedReceiver<SinkEvent>,
    completions: CompletionReceiver,
    media_commands: MediaCommandReceiver,
    tick: Duration,
}

impl SessionRuntime {
    /// Wires the sink and media session into the controller and returns the
    /// runtime plus the handle front ends talk to.
    pub fn new(
        mut controller: SessionController,
        completions: CompletionReceiver,
        events: EventSender,
        tick: Duration,
    ) -> (Self, SessionHandle) {
        let (sink_tx, sink_events) = mpsc::unbounded_channel();
        controller.sink_mut().attach(sink_tx);
        let media_commands = controller.media_mut().register();

        let (command_tx, commands) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(command_tx, events);

        let runtime = Self {
            controller,
            commands,
            sink_events,
            completions,
            media_commands,
            tick,
        };
        (runtime, handle)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        self.controller.start();

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!("[session] running, poll every {:?}", self.tick);
        loop {
            let polling = self.controller.is_polling();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.controller.handle_command(command) {
                            break;
                        }
                    }
                    None => {
                        log::info!("[session] all handles dropped");
                        self.controller.shutdown();
                        break;
                    }
                },
                Some(event) = self.sink_events.recv() => {
                    self.controller.handle_sink_event(event);
                }
                Some(completion) = self.completions.recv() => {
                    self.controller.handle_completion(completion);
                }
                Some(command) = self.media_commands.recv() => {
                    self.controller.handle_media_command(command);
                }
                _ = interval.tick(), if polling => {
                    self.controller.on_tick();
                }
            }
        }
        log::info!("[session] loop exited");
    }
}
