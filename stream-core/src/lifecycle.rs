//! Processor lifecycle state machine.
//!
//! Two externally visible states. Transport reconnection is invisible here:
//! once started, a processor stays started until told to stop.

/// Lifecycle state - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessorState {
    /// No stream open, no handlers running.
    #[default]
    NotStarted,
    /// Stream open (or opening), handlers running.
    Started,
}

/// Commands from the owner of the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open the stream and begin dispatching.
    Start,
    /// Release the stream.
    Stop,
}

/// What the caller must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Open the connection and spawn the listener.
    OpenStream,
    /// Stop the listener and close the connection.
    CloseStream,
    /// Refuse: a stream is already open.
    RejectStart,
    /// Nothing to do.
    Nothing,
}

impl ProcessorState {
    /// Create a new state machine in the NotStarted state.
    pub fn new() -> Self {
        Self::NotStarted
    }

    /// Process a command and return the new state plus the effect to execute.
    pub fn on_command(self, command: Command) -> (Self, Effect) {
        match (self, command) {
            (Self::NotStarted, Command::Start) => (Self::Started, Effect::OpenStream),
            // A second start would leak the first connection
            (Self::Started, Command::Start) => (Self::Started, Effect::RejectStart),
            (Self::Started, Command::Stop) => (Self::NotStarted, Effect::CloseStream),
            (Self::NotStarted, Command::Stop) => (Self::NotStarted, Effect::Nothing),
        }
    }

    /// Check if started.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }
}
