use bytes::Bytes;
use rowbridge::{
    codec::Decimal, id::RowId, BackendError, FieldValue, HandlerError, HandlerOption, HostField,
    HostIndex, HostKey, HostOutcome, HostRow, HostTable, HostType, MemoryBackend, MemoryStore,
    ReadFlag, ScanState, StorageBackend, TableHandler,
};

fn products() -> HostTable {
    HostTable::new(vec![
        HostField::new("id", HostType::LongLong)
            .unsigned()
            .auto_increment(),
        HostField::new("sku", HostType::Varchar { max_length: 12, binary: false }),
        HostField::new("price", HostType::NewDecimal { precision: 8, scale: 2 }).nullable(),
        HostField::new("stock", HostType::Long).nullable(),
    ])
    .with_index(HostIndex::new("by_sku", ["sku"], true))
    .with_index(HostIndex::new("by_stock", ["stock"], false))
}

fn product(sku: &str, price: &str, stock: Option<i64>) -> HostRow {
    vec![
        None,
        Some(FieldValue::from(sku)),
        Some(FieldValue::Decimal(price.parse::<Decimal>().unwrap())),
        stock.map(FieldValue::Signed),
    ]
}

fn sku_key(sku: &str) -> HostKey {
    let mut data = (sku.len() as u16).to_le_bytes().to_vec();
    data.extend_from_slice(sku.as_bytes());
    data.resize(2 + 12, 0);
    HostKey::new(data, 0b1)
}

fn stock_key(stock: i32) -> HostKey {
    let mut data = vec![0];
    data.extend_from_slice(&stock.to_le_bytes());
    HostKey::new(data, 0b1)
}

fn loaded<B: StorageBackend>(backend: B) -> TableHandler<B> {
    let mut handler =
        TableHandler::create(backend, "products", &products(), HandlerOption::default()).unwrap();
    for (sku, price, stock) in [
        ("A-100", "19.99", Some(5)),
        ("B-200", "5.00", Some(-2)),
        ("C-300", "120.50", None),
        ("D-400", "0.99", Some(5)),
    ] {
        handler.insert(&mut product(sku, price, stock)).unwrap();
    }
    handler
}

fn skus<B: StorageBackend>(handler: &mut TableHandler<B>) -> Vec<String> {
    let mut out = HostRow::new();
    let mut skus = Vec::new();
    while handler.next(&mut out).unwrap().is_some() {
        match &out[1] {
            Some(FieldValue::Text(sku)) => skus.push(sku.clone()),
            other => panic!("unexpected sku {other:?}"),
        }
    }
    skus
}

#[test]
fn exact_index_lookup() {
    let mut handler = loaded(MemoryStore::new().session());
    handler
        .begin_index_scan("by_sku", &sku_key("C-300"), ReadFlag::KeyExact)
        .unwrap();

    let mut out = HostRow::new();
    let id = handler.next(&mut out).unwrap().unwrap();
    assert_eq!(out[0], Some(FieldValue::Unsigned(3)));
    assert_eq!(out[1], Some(FieldValue::from("C-300")));
    assert_eq!(
        out[2],
        Some(FieldValue::Decimal("120.50".parse().unwrap()))
    );
    assert_eq!(out[3], None);
    assert_eq!(handler.position(), Some(id));

    assert_eq!(handler.next(&mut out).unwrap(), None);
    assert!(matches!(handler.state(), ScanState::IndexScanning { .. }));
    handler.end_scan().unwrap();
}

#[test]
fn signed_index_ranges_keep_numeric_order() {
    let mut handler = loaded(MemoryStore::new().session());

    handler
        .begin_index_scan("by_stock", &stock_key(0), ReadFlag::KeyOrNext)
        .unwrap();
    assert_eq!(skus(&mut handler), ["A-100", "D-400"]);

    handler
        .begin_index_scan("by_stock", &stock_key(5), ReadFlag::KeyOrPrev)
        .unwrap();
    assert_eq!(skus(&mut handler), ["D-400", "A-100", "B-200", "C-300"]);

    handler
        .begin_index_scan("by_stock", &stock_key(5), ReadFlag::AfterKey)
        .unwrap();
    assert!(skus(&mut handler).is_empty());
}

#[test]
fn duplicate_rejection() {
    let mut handler = loaded(MemoryStore::new().session());
    let err = handler
        .insert(&mut product("B-200", "1.00", Some(1)))
        .unwrap_err();
    assert_eq!(
        err,
        HandlerError::DuplicateKey {
            index: "by_sku".to_string()
        }
    );
    assert_eq!(err.outcome(), HostOutcome::DuplicateKey);
    assert_eq!(handler.failed_key(), Some("by_sku"));
    assert_eq!(handler.row_count().unwrap(), 4);
    handler
        .begin_index_scan("by_sku", &sku_key("B-200"), ReadFlag::KeyExact)
        .unwrap();
    assert_eq!(skus(&mut handler), ["B-200"]);
}

#[test]
fn table_scan_to_exhaustion() {
    let mut handler = loaded(MemoryStore::new().session());
    handler.begin_table_scan().unwrap();
    let mut out = HostRow::new();
    let mut ids = Vec::new();
    while let Some(id) = handler.next(&mut out).unwrap() {
        ids.push(id);
    }
    assert_eq!(ids.len(), 4);
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    // Exhaustion is sticky until the scan is ended.
    assert_eq!(handler.next(&mut out).unwrap(), None);
    handler.end_scan().unwrap();
    assert_eq!(handler.next(&mut out), Err(HandlerError::NoActiveScan));
}

#[test]
fn sessions_share_tables() {
    let store = MemoryStore::new();
    let writer = loaded(store.session());
    let mut reader =
        TableHandler::open(store.session(), "products", &products(), HandlerOption::default())
            .unwrap();
    assert_eq!(reader.row_count().unwrap(), 4);
    reader.begin_index_first("by_sku").unwrap();
    assert_eq!(skus(&mut reader), ["A-100", "B-200", "C-300", "D-400"]);
    reader.begin_index_last("by_sku").unwrap();
    assert_eq!(skus(&mut reader), ["D-400", "C-300", "B-200", "A-100"]);
    writer.close().unwrap();
}

/// Forwards to a [`MemoryBackend`] until armed, then fails the next call.
struct FlakyBackend {
    inner: MemoryBackend,
    armed: bool,
    calls_after_failure: usize,
}

impl FlakyBackend {
    fn gate(&mut self) -> Result<(), BackendError> {
        if self.armed {
            self.armed = false;
            return Err(BackendError::Transport("connection reset".to_string()));
        }
        self.calls_after_failure += 1;
        Ok(())
    }
}

impl StorageBackend for FlakyBackend {
    fn create_table(
        &mut self,
        name: &str,
        schema: &[u8],
        initial: u64,
    ) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.create_table(name, schema, initial)
    }

    fn open_table(&mut self, name: &str) -> Result<Bytes, BackendError> {
        self.gate()?;
        self.inner.open_table(name)
    }

    fn close_table(&mut self) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.close_table()
    }

    fn drop_table(&mut self, name: &str) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.drop_table(name)
    }

    fn rename_table(&mut self, from: &str, to: &str) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.rename_table(from, to)
    }

    fn add_index(&mut self, name: &str, index: &[u8]) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.add_index(name, index)
    }

    fn drop_index(&mut self, name: &str) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.drop_index(name)
    }

    fn insert_row(&mut self, row: &[u8]) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.insert_row(row)
    }

    fn update_row(&mut self, old: &[u8], new: &[u8]) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.update_row(old, new)
    }

    fn delete_row(&mut self, id: RowId) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.delete_row(id)
    }

    fn delete_all_rows(&mut self) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.delete_all_rows()
    }

    fn truncate(&mut self) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.truncate()
    }

    fn start_table_scan(&mut self) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.start_table_scan()
    }

    fn start_index_scan(&mut self, key: &[u8]) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.start_index_scan(key)
    }

    fn get_next_row(&mut self) -> Result<Option<Bytes>, BackendError> {
        self.gate()?;
        self.inner.get_next_row()
    }

    fn end_scan(&mut self) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.end_scan()
    }

    fn get_row_by_identity(&mut self, id: RowId) -> Result<Option<Bytes>, BackendError> {
        self.gate()?;
        self.inner.get_row_by_identity(id)
    }

    fn index_contains_duplicate(&mut self, index: &str, key: &[u8]) -> Result<bool, BackendError> {
        self.gate()?;
        self.inner.index_contains_duplicate(index, key)
    }

    fn get_row_count(&mut self) -> Result<u64, BackendError> {
        self.gate()?;
        self.inner.get_row_count()
    }

    fn get_autoincrement(&mut self) -> Result<u64, BackendError> {
        self.gate()?;
        self.inner.get_autoincrement()
    }

    fn set_autoincrement(&mut self, value: u64) -> Result<(), BackendError> {
        self.gate()?;
        self.inner.set_autoincrement(value)
    }

    fn increment_autoincrement(&mut self, amount: u64) -> Result<u64, BackendError> {
        self.gate()?;
        self.inner.increment_autoincrement(amount)
    }
}

#[test]
fn transport_failure_is_fatal_for_the_call_only() {
    let backend = FlakyBackend {
        inner: MemoryStore::new().session(),
        armed: false,
        calls_after_failure: 0,
    };
    let mut handler = loaded(backend);
    handler.begin_table_scan().unwrap();
    let mut out = HostRow::new();
    handler.next(&mut out).unwrap().unwrap();

    handler.backend_mut().armed = true;
    handler.backend_mut().calls_after_failure = 0;
    let err = handler.next(&mut out).unwrap_err();
    assert_eq!(err.outcome(), HostOutcome::Fatal);
    // Nothing is retried behind the caller's back.
    assert_eq!(handler.backend().calls_after_failure, 0);

    // The cursor survives, so the caller may keep reading.
    assert!(handler.next(&mut out).unwrap().is_some());
    handler.end_scan().unwrap();
}

#[test]
fn failed_end_scan_still_closes_the_scan() {
    let backend = FlakyBackend {
        inner: MemoryStore::new().session(),
        armed: false,
        calls_after_failure: 0,
    };
    let mut handler = loaded(backend);
    handler.begin_table_scan().unwrap();

    handler.backend_mut().armed = true;
    let err = handler.end_scan().unwrap_err();
    assert_eq!(err.outcome(), HostOutcome::Fatal);
    assert_eq!(handler.state(), &ScanState::Closed);

    let mut out = HostRow::new();
    assert_eq!(handler.next(&mut out), Err(HandlerError::NoActiveScan));
    // A later scan starts cleanly without another end_scan round trip.
    handler.begin_index_first("by_sku").unwrap();
    assert_eq!(skus(&mut handler), ["A-100", "B-200", "C-300", "D-400"]);
    handler.end_scan().unwrap();
}
