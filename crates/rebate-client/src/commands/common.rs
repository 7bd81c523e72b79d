use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::ClientResult;
use crate::clock::{Clock, SystemClock};
use crate::setup::ensure_initialized_with_home_override;
use crate::state::open_connection;

/// Where a command finds its store and what it treats as "now".
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    pub home_override: Option<&'a Path>,
    pub clock: &'a dyn Clock,
}

impl Default for CommandContext<'_> {
    fn default() -> Self {
        Self {
            home_override: None,
            clock: &SystemClock,
        }
    }
}

impl<'a> CommandContext<'a> {
    pub fn at_home(home: &'a Path) -> Self {
        Self {
            home_override: Some(home),
            ..Self::default()
        }
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }
}

pub(crate) struct OpenStore {
    pub(crate) db_path: PathBuf,
    pub(crate) connection: Connection,
}

pub(crate) fn open_store(context: &CommandContext<'_>) -> ClientResult<OpenStore> {
    let setup = ensure_initialized_with_home_override(context.home_override)?;
    let db_path = setup.db_path;
    let connection = open_connection(&db_path)?;
    Ok(OpenStore {
        db_path,
        connection,
    })
}
