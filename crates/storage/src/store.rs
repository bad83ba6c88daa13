use std::path::Path;

use attribution_core::PipelineResult;
use rusqlite::Connection;
use tracing::info;

/// Output relations written by the pipeline. Input relations are owned
/// elsewhere and never created here.
const OUTPUT_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS attribution_customer_journey (
        conv_id TEXT NOT NULL,
        session_id TEXT NOT NULL,
        ihc REAL NOT NULL,
        PRIMARY KEY (conv_id, session_id)
    );
    CREATE TABLE IF NOT EXISTS channel_reporting (
        channel_name TEXT NOT NULL,
        date TEXT NOT NULL,
        cost REAL NOT NULL,
        ihc REAL NOT NULL,
        ihc_revenue REAL NOT NULL
    );
";

/// Single connection shared by every stage of one run.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened attribution store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> PipelineResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn ensure_output_schema(&self) -> PipelineResult<()> {
        self.conn.execute_batch(OUTPUT_SCHEMA)?;
        info!("Output schema verified");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> PipelineResult<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        info!("Closed attribution store");
        Ok(())
    }
}
