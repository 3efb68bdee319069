use crate::error::ControllerError;
use std::sync::Mutex;

/// A user-facing playback command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    TogglePlayPause,
    SeekTo(f64),
    Rewind(f64),
    SetRate(f64),
}

/// Coalescing class of a command
///
/// Rapid UI events only ever leave one pending command per kind; for seeks
/// and rate picks only the final target matters, and repeated transport
/// clicks collapse into the newest intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Transport,
    Seek,
    Rate,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Play | Command::Pause | Command::TogglePlayPause => CommandKind::Transport,
            Command::SeekTo(_) | Command::Rewind(_) => CommandKind::Seek,
            Command::SetRate(_) => CommandKind::Rate,
        }
    }
}

/// Result of one pumped command
#[derive(Debug)]
pub struct CommandOutcome {
    pub command: Command,
    pub result: Result<(), ControllerError>,
}

const SLOT_COUNT: usize = 3;

fn slot_index(kind: CommandKind) -> usize {
    match kind {
        CommandKind::Transport => 0,
        CommandKind::Seek => 1,
        CommandKind::Rate => 2,
    }
}

/// Pending commands, one slot per kind, latest wins
///
/// The queue never executes anything itself; the controller drains it in a
/// fixed kind order (transport, then seek, then rate) so repeated pump
/// calls dispatch identically.
#[derive(Default)]
pub struct CommandQueue {
    slots: Mutex<[Option<Command>; SLOT_COUNT]>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command, replacing any older command of the same kind
    ///
    /// Returns the command that was displaced, if any.
    pub fn submit(&self, command: Command) -> Option<Command> {
        let mut slots = self.slots.lock().unwrap();
        slots[slot_index(command.kind())].replace(command)
    }

    /// Take all pending commands in dispatch order
    pub fn drain(&self) -> Vec<Command> {
        let mut slots = self.slots.lock().unwrap();
        slots.iter_mut().filter_map(|slot| slot.take()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap().iter().all(|slot| slot.is_none())
    }
}
