use rusqlite::types::{ToSql, Value};
use rusqlite::{Result, Statement};

use crate::store::Catalog;

/// One in-progress parameterized catalog query: the prepared statement, its
/// positional bind values in call order, and the column consumers are fed
/// from.
pub struct Lookup<'a> {
    st: Statement<'a>,
    values: Vec<Box<dyn ToSql>>,
    field: usize,
}

impl<'a> Lookup<'a> {
    pub fn start(catalog: &'a Catalog, field: usize, query: &str) -> Result<Lookup<'a>> {
        let st = match catalog.connection().prepare(query) {
            Ok(st) => st,
            Err(e) => {
                error!("can't prepare '{}': {}", query, e);
                return Err(e);
            }
        };

        Ok(Lookup {
            st,
            values: Vec::new(),
            field,
        })
    }

    pub fn bind_text(&mut self, value: &str) {
        self.values.push(Box::new(value.to_string()));
    }

    pub fn bind_int(&mut self, value: i64) {
        self.values.push(Box::new(value));
    }

    /// Step the query row by row, feeding the selected column to `consumer`
    /// as text (integers are stringified). Iteration ends when the consumer
    /// returns true or the rows run out; the statement is released either
    /// way.
    pub fn finish<F>(mut self, mut consumer: F) -> Result<()>
    where
        F: FnMut(&str) -> bool,
    {
        let mut rows = self.st.query(&self.values)?;

        while let Some(row) = rows.next()? {
            let value: Value = row.get(self.field)?;

            let text = match value {
                Value::Integer(i) => i.to_string(),
                Value::Text(s) => s,
                _ => continue,
            };

            if consumer(&text) {
                break;
            }
        }

        Ok(())
    }
}
