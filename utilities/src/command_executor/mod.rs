use std::{
    error::Error,
    sync::mpsc::{Receiver, Sender},
};

use tokio::sync::oneshot;

pub trait Command: Send {
    type Response: Send;
    type Handler: DeviceHandler<Command = Self>;

    fn execute(
        self,
        handler: &mut Self::Handler,
    ) -> Result<Self::Response, <Self::Handler as DeviceHandler>::Error>;
}

pub trait DeviceHandler {
    type Command: Command<Handler = Self>;
    type Error: Error + Send + Sync + 'static;
}

type HandlerResult<C> = Result<<C as Command>::Response, HandlerError<C>>;
type HandlerError<C> = <<C as Command>::Handler as DeviceHandler>::Error;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError<E: Error + 'static> {
    #[error(transparent)]
    Device(E),

    #[error("Device executor '{0}' is not running")]
    Stopped(String),

    #[error("Unexpected response type from '{0}'")]
    UnexpectedResponse(String),
}

pub struct GenericCommand<C: Command> {
    command: C,
    response_ch: oneshot::Sender<HandlerResult<C>>,
}

impl<C: Command> GenericCommand<C> {
    pub fn new(command: C, response_ch: oneshot::Sender<HandlerResult<C>>) -> Self {
        Self {
            command,
            response_ch,
        }
    }

    /// Runs the command and returns whether it succeeded and whether the
    /// caller was still waiting for the reply.
    fn execute(self, handler: &mut C::Handler) -> (bool, bool) {
        let result = self.command.execute(handler);
        let succeeded = result.is_ok();

        if let Err(e) = &result {
            tracing::warn!("Device command failed: {}", e);
        }

        (succeeded, self.response_ch.send(result).is_ok())
    }
}

/// Owns a blocking device handler on a dedicated thread.
///
/// The executor stops, and drops its handler, once every `CommandSender` is
/// gone. Handlers release their hardware in `Drop`.
pub struct CommandExecutor<H: DeviceHandler + Send + 'static> {
    name: String,
    handler: H,
    commands_ch: Receiver<GenericCommand<H::Command>>,
}

impl<H: DeviceHandler + Send> CommandExecutor<H> {
    pub fn new(name: impl Into<String>, handler: H) -> (Self, CommandSender<H::Command>) {
        let name = name.into();
        let (sender, commands_ch) = std::sync::mpsc::channel();

        let executor = Self {
            name: name.clone(),
            handler,
            commands_ch,
        };

        (executor, CommandSender::new(name, sender))
    }

    pub fn run(self) {
        let Self {
            name,
            mut handler,
            commands_ch,
        } = self;

        tracing::debug!(executor = %name, "Command executor started");

        let mut failed = 0usize;
        while let Ok(command) = commands_ch.recv() {
            let (succeeded, delivered) = command.execute(&mut handler);
            if !succeeded {
                failed += 1;
            }
            if !delivered {
                tracing::debug!(executor = %name, "Caller dropped before the reply");
            }
        }

        drop(handler);
        tracing::debug!(executor = %name, failed, "Command executor stopped");
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run())
    }
}

pub struct CommandSender<C: Command> {
    name: String,
    commands_ch: Sender<GenericCommand<C>>,
}

impl<C: Command> Clone for CommandSender<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            commands_ch: self.commands_ch.clone(),
        }
    }
}

impl<C: Command> CommandSender<C> {
    pub fn new(name: String, commands_ch: Sender<GenericCommand<C>>) -> Self {
        Self { name, commands_ch }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn send_command(
        &self,
        command: C,
    ) -> Result<C::Response, ExecutorError<HandlerError<C>>> {
        let (response_ch, response_rx) = oneshot::channel();
        let command = GenericCommand::new(command, response_ch);

        self.commands_ch
            .send(command)
            .map_err(|_| ExecutorError::Stopped(self.name.clone()))?;

        response_rx
            .await
            .map_err(|_| ExecutorError::Stopped(self.name.clone()))?
            .map_err(ExecutorError::Device)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
    };

    use super::*;

    struct Counter {
        value: i32,
        released: Arc<AtomicBool>,
    }

    impl Drop for Counter {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    impl DeviceHandler for Counter {
        type Command = CounterCommand;
        type Error = io::Error;
    }

    enum CounterCommand {
        Add(i32),
        Fail,
    }

    impl Command for CounterCommand {
        type Response = i32;
        type Handler = Counter;

        fn execute(self, handler: &mut Counter) -> io::Result<i32> {
            match self {
                CounterCommand::Add(n) => {
                    handler.value += n;
                    Ok(handler.value)
                }
                CounterCommand::Fail => Err(io::Error::other("boom")),
            }
        }
    }

    fn counter() -> (Counter, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        (
            Counter {
                value: 0,
                released: released.clone(),
            },
            released,
        )
    }

    #[tokio::test]
    async fn commands_run_in_order_on_one_handler() {
        let (handler, _) = counter();
        let (executor, sender) = CommandExecutor::new("counter", handler);
        let handle = executor.spawn();

        assert_eq!(sender.send_command(CounterCommand::Add(2)).await.unwrap(), 2);
        assert_eq!(sender.send_command(CounterCommand::Add(3)).await.unwrap(), 5);

        drop(sender);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn device_errors_reach_the_caller() {
        let (handler, _) = counter();
        let (executor, sender) = CommandExecutor::new("counter", handler);
        let _handle = executor.spawn();

        match sender.send_command(CounterCommand::Fail).await {
            Err(ExecutorError::Device(e)) => assert_eq!(e.to_string(), "boom"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn handler_is_released_when_senders_are_dropped() {
        let (handler, released) = counter();
        let (executor, sender) = CommandExecutor::new("counter", handler);
        let handle = executor.spawn();

        let second = sender.clone();
        drop(sender);
        assert!(!released.load(Ordering::SeqCst));

        drop(second);
        handle.await.unwrap();
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stopped_executor_is_reported() {
        let (handler, _) = counter();
        let (executor, sender) = CommandExecutor::new("counter", handler);
        drop(executor);

        match sender.send_command(CounterCommand::Add(1)).await {
            Err(ExecutorError::Stopped(name)) => assert_eq!(name, "counter"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
