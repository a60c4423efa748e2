use super::{HandlerError, TableHandler};
use crate::{
    backend::StorageBackend,
    codec::HostIndex,
    logging::bridge_log,
    schema::IndexSchema,
};

impl<B: StorageBackend> TableHandler<B> {
    /// Drop the table and hand the session back.
    pub fn drop_table(mut self) -> Result<B, HandlerError> {
        self.end_scan()?;
        self.call("close_table", |backend| backend.close_table())?;
        let name = self.name.clone();
        self.call("drop_table", |backend| backend.drop_table(&name))?;
        bridge_log!(
            log::Level::Info,
            ctx: self.option.log_context,
            "table_dropped",
            "table={}",
            name
        );
        Ok(self.backend)
    }

    /// Rename the table to `to`.
    pub fn rename(&mut self, to: &str) -> Result<(), HandlerError> {
        let from = self.name.clone();
        self.call("rename_table", |backend| backend.rename_table(&from, to))?;
        self.name = to.to_string();
        bridge_log!(
            log::Level::Info,
            ctx: self.option.log_context,
            "table_renamed",
            "from={} to={}",
            from,
            to
        );
        Ok(())
    }

    /// Add a secondary index, built over the existing rows.
    pub fn add_index(&mut self, index: &HostIndex) -> Result<(), HandlerError> {
        let descriptor = IndexSchema::new(index.columns.iter().cloned(), index.unique);
        let mut schema = self.schema.clone();
        schema.add_index(index.name.clone(), descriptor.clone())?;

        self.end_scan()?;
        let bytes = descriptor.serialize();
        self.call("add_index", |backend| backend.add_index(&index.name, &bytes))?;
        self.schema = schema;
        self.host.indices.push(index.clone());
        bridge_log!(
            log::Level::Info,
            ctx: self.option.log_context,
            "index_added",
            "table={} index={} unique={}",
            self.name,
            index.name,
            index.unique
        );
        Ok(())
    }

    /// Drop the secondary index `name`.
    pub fn drop_index(&mut self, name: &str) -> Result<(), HandlerError> {
        if self.schema.index(name).is_none() {
            return Err(HandlerError::UnknownIndex(name.to_string()));
        }
        self.end_scan()?;
        self.call("drop_index", |backend| backend.drop_index(name))?;
        self.schema.remove_index(name)?;
        self.host.indices.retain(|index| index.name != name);
        bridge_log!(
            log::Level::Info,
            ctx: self.option.log_context,
            "index_dropped",
            "table={} index={}",
            self.name,
            name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{BackendError, MemoryStore},
        codec::{FieldValue, HostField, HostTable, HostType},
        handler::{HostOutcome, HostRow},
        option::HandlerOption,
    };

    fn host() -> HostTable {
        HostTable::new(vec![
            HostField::new("id", HostType::Long).unsigned(),
            HostField::new("city", HostType::Varchar { max_length: 8, binary: false }),
        ])
    }

    fn row(id: u64, city: &str) -> HostRow {
        vec![Some(FieldValue::Unsigned(id)), Some(FieldValue::from(city))]
    }

    #[test]
    fn added_index_covers_existing_rows() {
        let store = MemoryStore::new();
        let mut handler =
            TableHandler::create(store.session(), "t", &host(), HandlerOption::default()).unwrap();
        handler.insert(&mut row(1, "oslo")).unwrap();
        handler.insert(&mut row(2, "oslo")).unwrap();

        let unique = HostIndex::new("by_city", ["city"], true);
        assert_eq!(
            handler.add_index(&unique).unwrap_err().outcome(),
            HostOutcome::DuplicateKey
        );
        assert!(handler.schema().index("by_city").is_none());

        handler
            .add_index(&HostIndex::new("by_city", ["city"], false))
            .unwrap();
        handler.begin_index_first("by_city").unwrap();
        let mut out = HostRow::new();
        let mut seen = 0;
        while handler.next(&mut out).unwrap().is_some() {
            seen += 1;
        }
        assert_eq!(seen, 2);

        handler.drop_index("by_city").unwrap();
        assert_eq!(
            handler.drop_index("by_city"),
            Err(HandlerError::UnknownIndex("by_city".to_string()))
        );
    }

    #[test]
    fn rename_and_drop() {
        let store = MemoryStore::new();
        let mut handler =
            TableHandler::create(store.session(), "t", &host(), HandlerOption::default()).unwrap();
        handler.rename("u").unwrap();
        assert_eq!(handler.name(), "u");
        assert_eq!(store.table_names(), ["u"]);

        let mut session = handler.drop_table().unwrap();
        assert!(store.table_names().is_empty());
        assert_eq!(
            session.open_table("u"),
            Err(BackendError::TableNotFound("u".to_string()))
        );
    }
}
