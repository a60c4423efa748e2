use bytes::Bytes;

use super::{HandlerError, HostRow, TableHandler};
use crate::{
    backend::StorageBackend,
    codec::{CodecError, FieldCodec, FieldValue},
    id::RowId,
    logging::bridge_log,
    query::{QueryKey, QueryType},
    row::{changed_indices, Row},
    schema::ColumnType,
};

impl<B: StorageBackend> TableHandler<B> {
    /// Insert a host row under a fresh identity.
    ///
    /// A NULL or zero auto-increment value is replaced by the next counter
    /// value when filling is enabled, and written back into `values`.
    pub fn insert(&mut self, values: &mut HostRow) -> Result<RowId, HandlerError> {
        self.failed_key = None;
        if self.option.fill_auto_increment {
            self.fill_auto_increment(values)?;
        }
        let row = self.pack_row(values, self.ids.generate())?;
        let unique: Vec<String> = self
            .schema
            .indices()
            .filter(|(_, index)| index.is_unique())
            .map(|(name, _)| name.to_string())
            .collect();
        self.check_unique(&row, unique)?;

        let bytes = row.serialize();
        self.call("insert_row", |backend| backend.insert_row(&bytes))?;
        Ok(row.id())
    }

    /// Replace the current row, whose host image is `old`, with `new`.
    pub fn update(&mut self, old: &HostRow, new: &HostRow) -> Result<(), HandlerError> {
        self.failed_key = None;
        let id = self.position.ok_or(HandlerError::NoCurrentRow)?;
        let old_row = self.pack_row(old, id)?;
        let new_row = self.pack_row(new, id)?;
        if self.option.check_unique_on_update {
            let changed: Vec<String> = changed_indices(&self.schema, &old_row, &new_row)
                .filter(|(_, index)| index.is_unique())
                .map(|(name, _)| name.to_string())
                .collect();
            self.check_unique(&new_row, changed)?;
        }

        let (old_bytes, new_bytes) = (old_row.serialize(), new_row.serialize());
        self.call("update_row", |backend| {
            backend.update_row(&old_bytes, &new_bytes)
        })
    }

    /// Delete the current row.
    pub fn delete(&mut self) -> Result<(), HandlerError> {
        let id = self.position.take().ok_or(HandlerError::NoCurrentRow)?;
        self.call("delete_row", |backend| backend.delete_row(id))
    }

    /// Delete every row, keeping the auto-increment counter.
    pub fn delete_all_rows(&mut self) -> Result<(), HandlerError> {
        self.position = None;
        self.call("delete_all_rows", |backend| backend.delete_all_rows())
    }

    /// Delete every row and reset the auto-increment counter.
    pub fn truncate(&mut self) -> Result<(), HandlerError> {
        self.position = None;
        self.call("truncate", |backend| backend.truncate())
    }

    /// Number of stored rows.
    pub fn row_count(&mut self) -> Result<u64, HandlerError> {
        self.call("get_row_count", |backend| backend.get_row_count())
    }

    /// Next auto-increment value.
    pub fn auto_increment(&mut self) -> Result<u64, HandlerError> {
        self.call("get_autoincrement", |backend| backend.get_autoincrement())
    }

    /// Overwrite the next auto-increment value.
    pub fn set_auto_increment(&mut self, value: u64) -> Result<(), HandlerError> {
        self.call("set_autoincrement", |backend| backend.set_autoincrement(value))
    }

    fn fill_auto_increment(&mut self, values: &mut HostRow) -> Result<(), HandlerError> {
        let Some(position) = self
            .schema
            .auto_increment_column()
            .and_then(|column| self.schema.column_position(column))
        else {
            return Ok(());
        };
        let given = values
            .get(position)
            .and_then(|value| value.as_ref())
            .and_then(FieldValue::as_auto_increment)
            .unwrap_or(0);

        if given != 0 {
            // Explicit values move the counter past themselves.
            let next = self.auto_increment()?;
            if given >= next {
                self.set_auto_increment(given.saturating_add(1))?;
            }
            return Ok(());
        }
        if position >= values.len() {
            return Ok(());
        }
        let assigned = self.call("increment_autoincrement", |backend| {
            backend.increment_autoincrement(1)
        })?;
        let value = match self.codecs[position] {
            FieldCodec::SignedInt(_) => i64::try_from(assigned)
                .map(FieldValue::Signed)
                .map_err(|_| CodecError::IntegerOverflow {
                    column_type: ColumnType::Long,
                    value: assigned,
                })?,
            FieldCodec::Double(_) => FieldValue::Double(assigned as f64),
            _ => FieldValue::Unsigned(assigned),
        };
        values[position] = Some(value);
        Ok(())
    }

    fn check_unique(&mut self, row: &Row, indices: Vec<String>) -> Result<(), HandlerError> {
        for name in indices {
            let Some(index) = self.schema.index(&name) else {
                continue;
            };
            let mut builder = QueryKey::builder(name.as_str(), index, QueryType::ExactKey);
            for column in index.columns() {
                let value = self
                    .schema
                    .column_position(column)
                    .and_then(|position| row.value(position))
                    .cloned();
                builder = builder.key(column.as_str(), value);
            }
            let key: Bytes = builder.build()?.serialize();

            let duplicate = self.call("index_contains_duplicate", |backend| {
                backend.index_contains_duplicate(&name, &key)
            })?;
            if duplicate {
                bridge_log!(
                    log::Level::Info,
                    ctx: self.option.log_context,
                    "duplicate_key",
                    "table={} index={}",
                    self.name,
                    name
                );
                self.failed_key = Some(name.clone());
                return Err(HandlerError::DuplicateKey { index: name });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{MemoryBackend, MemoryStore},
        codec::{HostField, HostIndex, HostTable, HostType},
        handler::HostOutcome,
        option::HandlerOption,
    };

    fn handler(option: HandlerOption) -> TableHandler<MemoryBackend> {
        let host = HostTable::new(vec![
            HostField::new("id", HostType::LongLong).auto_increment(),
            HostField::new("email", HostType::Varchar { max_length: 16, binary: false })
                .nullable(),
        ])
        .with_index(HostIndex::new("by_email", ["email"], true));
        TableHandler::create(MemoryStore::new().session(), "users", &host, option).unwrap()
    }

    fn user(email: Option<&str>) -> HostRow {
        vec![None, email.map(FieldValue::from)]
    }

    #[test]
    fn insert_fills_auto_increment() {
        let mut handler = handler(HandlerOption::default().initial_auto_increment(10));
        let mut row = user(Some("a@x"));
        handler.insert(&mut row).unwrap();
        assert_eq!(row[0], Some(FieldValue::Signed(10)));

        let mut explicit = vec![Some(FieldValue::Signed(50)), None];
        handler.insert(&mut explicit).unwrap();
        let mut next = user(None);
        handler.insert(&mut next).unwrap();
        assert_eq!(next[0], Some(FieldValue::Signed(51)));
        assert_eq!(handler.row_count().unwrap(), 3);
    }

    #[test]
    fn signed_counter_past_i64_is_rejected() {
        let mut handler = handler(HandlerOption::default());
        let past = i64::MAX as u64 + 1;
        handler.set_auto_increment(past).unwrap();

        let mut row = user(Some("a@x"));
        let err = handler.insert(&mut row).unwrap_err();
        assert_eq!(
            err,
            HandlerError::Codec(CodecError::IntegerOverflow {
                column_type: ColumnType::Long,
                value: past,
            })
        );
        assert_eq!(row[0], None);
        assert_eq!(handler.row_count().unwrap(), 0);
    }

    #[test]
    fn unique_violation_records_failed_key() {
        let mut handler = handler(HandlerOption::default());
        handler.insert(&mut user(Some("a@x"))).unwrap();
        let err = handler.insert(&mut user(Some("a@x"))).unwrap_err();
        assert_eq!(err.outcome(), HostOutcome::DuplicateKey);
        assert_eq!(handler.failed_key(), Some("by_email"));
        assert_eq!(handler.row_count().unwrap(), 1);

        // NULLs never collide.
        handler.insert(&mut user(None)).unwrap();
        handler.insert(&mut user(None)).unwrap();
        assert_eq!(handler.failed_key(), None);
    }

    #[test]
    fn update_checks_only_changed_unique_indices() {
        let mut handler = handler(HandlerOption::default());
        handler.insert(&mut user(Some("a@x"))).unwrap();
        handler.insert(&mut user(Some("b@x"))).unwrap();

        let mut current = HostRow::new();
        handler.begin_table_scan().unwrap();
        handler.next(&mut current).unwrap().unwrap();
        handler.end_scan().unwrap();

        assert!(handler.update(&current, &current).is_ok());

        let mut taken = current.clone();
        taken[1] = Some(FieldValue::from("b@x"));
        assert!(matches!(
            handler.update(&current, &taken),
            Err(HandlerError::DuplicateKey { .. })
        ));

        let mut moved = current.clone();
        moved[1] = Some(FieldValue::from("c@x"));
        handler.update(&current, &moved).unwrap();
        assert!(handler.insert(&mut user(Some("a@x"))).is_ok());
    }

    #[test]
    fn delete_needs_a_current_row() {
        let mut handler = handler(HandlerOption::default());
        assert_eq!(handler.delete(), Err(HandlerError::NoCurrentRow));

        let id = handler.insert(&mut user(Some("a@x"))).unwrap();
        let mut row = HostRow::new();
        assert!(handler.lookup_by_identity(id, &mut row).unwrap());
        handler.delete().unwrap();
        assert_eq!(handler.row_count().unwrap(), 0);
        assert!(!handler.lookup_by_identity(id, &mut row).unwrap());
    }

    #[test]
    fn truncate_resets_counter() {
        let mut handler = handler(HandlerOption::default());
        handler.insert(&mut user(None)).unwrap();
        handler.insert(&mut user(None)).unwrap();
        handler.delete_all_rows().unwrap();
        assert_eq!(handler.auto_increment().unwrap(), 3);
        handler.truncate().unwrap();
        assert_eq!(handler.auto_increment().unwrap(), 1);
        assert_eq!(handler.row_count().unwrap(), 0);
    }
}
