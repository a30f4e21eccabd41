//! The session context: current view, the one connection, and the
//! operations that move between Home and Chat.
//!
//! A [`Session`] runs as its own task. Front ends talk to it through a
//! [`SessionHandle`] and watch the [`SessionEvent`] stream, so no network
//! call ever runs on the render loop.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use anyhow::{Result, anyhow};

use crate::api::{
    Credentials, LoginOutcome, RegisterOutcome, Registration, SessionApi, TicketOutcome,
};
use crate::connection::{Connection, ConnectionEvent, Connector};
use crate::state::{View, BAD_CREDENTIALS, NOT_CONNECTED, REGISTERED};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask for a ticket with the current session cookie and connect if granted
    Verify,
    LogIn(Credentials),
    Register(Registration),
    LogOut,
    Send(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ViewChanged(View),
    /// Text for the error region
    Error(String),
    /// Text for the info region
    Info(String),
    /// An inbound frame, to append to the message list
    Message(String),
    /// The relay closed the connection
    Disconnected,
}

/// Sending side of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: UnboundedSender<Command>,
}

impl SessionHandle {
    /// A handle plus the raw command stream, for driving a session by hand
    pub fn channel() -> (Self, UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { commands: tx }, rx)
    }

    pub fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Session task has stopped"))
    }
}

enum Step {
    Command(Option<Command>),
    Inbound(Option<ConnectionEvent>),
}

pub struct Session<A, C> {
    api: A,
    connector: C,
    view: View,
    connection: Option<Connection>,
    events: UnboundedSender<SessionEvent>,
}

impl<A, C> Session<A, C>
where
    A: SessionApi,
    C: Connector,
{
    pub fn new(api: A, connector: C, events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            api,
            connector,
            view: View::Home,
            connection: None,
            events,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn emit(&self, event: SessionEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| anyhow!("Session event receiver dropped"))
    }

    fn show(&mut self, view: View) -> Result<()> {
        self.view = view;
        self.emit(SessionEvent::ViewChanged(view))
    }

    pub async fn handle(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Verify => self.verify().await,
            Command::LogIn(credentials) => self.log_in(&credentials).await,
            Command::Register(registration) => self.register(&registration).await,
            Command::LogOut => self.log_out().await,
            Command::Send(text) => self.send(text),
        }
    }

    /// Ticket verification. Connects only once a ticket has been granted.
    pub async fn verify(&mut self) -> Result<()> {
        let outcome = match self.api.ws_ticket().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("ticket request failed: {:#}", e);
                self.emit(SessionEvent::Error(format!("Could not reach the server: {}", e)))?;
                return self.show(View::Home);
            }
        };

        let ticket = match outcome {
            TicketOutcome::Granted(ticket) => ticket,
            TicketOutcome::Denied(status) => {
                tracing::info!(%status, "no session, staying on home view");
                return self.show(View::Home);
            }
        };

        if let Some(old) = self.connection.take() {
            old.close();
        }

        let connection = match self.connector.open().await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!("could not open connection: {:#}", e);
                self.emit(SessionEvent::Error(format!("Could not connect: {}", e)))?;
                return self.show(View::Home);
            }
        };

        // First frame on the fresh connection authorizes it
        if let Err(e) = connection.send(ticket.into_string()) {
            self.emit(SessionEvent::Error(format!("Could not connect: {}", e)))?;
            return self.show(View::Home);
        }
        self.connection = Some(connection);
        tracing::info!("authorized, entering chat");
        self.show(View::Chat)
    }

    pub async fn log_in(&mut self, credentials: &Credentials) -> Result<()> {
        match self.api.log_in(credentials).await {
            Ok(LoginOutcome::Accepted) => {
                tracing::info!(username = %credentials.username, "login accepted");
                self.verify().await
            }
            Ok(LoginOutcome::Rejected(status)) => {
                tracing::info!(%status, username = %credentials.username, "login rejected");
                self.emit(SessionEvent::Error(BAD_CREDENTIALS.to_string()))
            }
            Err(e) => {
                tracing::warn!("login request failed: {:#}", e);
                self.emit(SessionEvent::Error(format!("Could not reach the server: {}", e)))
            }
        }
    }

    pub async fn register(&mut self, registration: &Registration) -> Result<()> {
        match self.api.register(registration).await {
            Ok(RegisterOutcome::Registered) => {
                tracing::info!(username = %registration.username, "registered");
                self.emit(SessionEvent::Info(REGISTERED.to_string()))
            }
            Ok(RegisterOutcome::Refused(reason)) => {
                tracing::info!(username = %registration.username, %reason, "registration refused");
                self.emit(SessionEvent::Error(reason))
            }
            Err(e) => {
                tracing::warn!("subscribe request failed: {:#}", e);
                self.emit(SessionEvent::Error(format!("Could not reach the server: {}", e)))
            }
        }
    }

    /// Always lands on Home, whatever the server says.
    pub async fn log_out(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        self.show(View::Home)?;

        if let Err(e) = self.api.log_out().await {
            tracing::warn!("logout request failed: {:#}", e);
        }
        Ok(())
    }

    pub fn send(&mut self, text: String) -> Result<()> {
        let sent = match &self.connection {
            Some(connection) => connection.send(text),
            None => Err(anyhow!(NOT_CONNECTED)),
        };

        if let Err(e) = sent {
            tracing::warn!("dropping outbound message: {}", e);
            self.emit(SessionEvent::Error(NOT_CONNECTED.to_string()))?;
        }
        Ok(())
    }

    pub fn receive(&mut self, event: ConnectionEvent) -> Result<()> {
        match event {
            ConnectionEvent::Frame(text) => self.emit(SessionEvent::Message(text)),
            ConnectionEvent::Closed => {
                self.connection = None;
                self.emit(SessionEvent::Disconnected)
            }
        }
    }

    /// Process commands and inbound frames until the command side hangs up.
    pub async fn run(mut self, mut commands: UnboundedReceiver<Command>) -> Result<()> {
        loop {
            let step = tokio::select! {
                command = commands.recv() => Step::Command(command),
                event = next_inbound(&mut self.connection) => Step::Inbound(event),
            };

            match step {
                Step::Command(Some(command)) => self.handle(command).await?,
                Step::Command(None) => break,
                Step::Inbound(Some(event)) => self.receive(event)?,
                // Sender gone without a close frame
                Step::Inbound(None) => self.receive(ConnectionEvent::Closed)?,
            }
        }

        tracing::debug!("session task finished");
        Ok(())
    }
}

async fn next_inbound(connection: &mut Option<Connection>) -> Option<ConnectionEvent> {
    match connection {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

/// Start a session task
pub fn spawn<A, C>(
    api: A,
    connector: C,
) -> (SessionHandle, UnboundedReceiver<SessionEvent>, JoinHandle<Result<()>>)
where
    A: SessionApi + 'static,
    C: Connector + 'static,
{
    let (handle, commands) = SessionHandle::channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let session = Session::new(api, connector, events_tx);
    let task = tokio::spawn(session.run(commands));

    (handle, events_rx, task)
}
