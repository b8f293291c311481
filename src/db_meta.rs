use rusqlite::OptionalExtension;
use rusqlite::{Connection, Result, NO_PARAMS};

use crate::schema;

pub fn ensure_schema(conn: &mut Connection, schema: &str) -> Result<bool> {
    trace!("trying to get schema version");

    conn.execute_batch(schema::META_SCHEMA)?;

    let schema_version: Option<u32> = conn
        .query_row(
            "SELECT value FROM Musicfs WHERE key = 'schema'",
            NO_PARAMS,
            |row| row.get(0),
        )
        .optional()?;

    match schema_version {
        Some(version) if version == schema::SCHEMA_VERSION => Ok(true),
        Some(version) => {
            error!(
                "unsupported schema version {} (expected {})",
                version,
                schema::SCHEMA_VERSION
            );
            Ok(false)
        }
        None => {
            debug!("empty database, creating schema");

            let tx = conn.transaction()?;
            tx.execute_batch(schema)?;
            tx.execute(
                "INSERT INTO Musicfs (key, value) VALUES ('schema', ?)",
                &[schema::SCHEMA_VERSION],
            )?;
            tx.commit()?;

            Ok(true)
        }
    }
}
