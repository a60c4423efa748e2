//! Host-facing table handler: translates host rows and keys into containers
//! and drives the scan protocol of a [`StorageBackend`].

mod ddl;
mod error;
mod key;
mod scan;
mod write;

use bytes::Bytes;

pub use error::{HandlerError, HostOutcome};
pub use key::{HostKey, ReadFlag};
pub use scan::ScanState;

use crate::{
    backend::{BackendError, StorageBackend},
    codec::{FieldCodec, FieldValue, HostTable},
    id::{RowId, RowIdGenerator},
    logging::bridge_log,
    option::HandlerOption,
    row::Row,
    schema::{ContainerError, TableSchema},
};

/// One host row: a value per column in table order, `None` for NULL.
pub type HostRow = Vec<Option<FieldValue>>;

/// An open table of a backend session.
///
/// Every operation goes through `&mut self`; a handler owns its backend
/// session and scan state and is used from one thread at a time.
#[derive(Debug)]
pub struct TableHandler<B: StorageBackend> {
    backend: B,
    name: String,
    host: HostTable,
    schema: TableSchema,
    codecs: Vec<FieldCodec>,
    option: HandlerOption,
    ids: RowIdGenerator,
    scratch: Row,
    state: ScanState,
    position: Option<RowId>,
    failed_key: Option<String>,
}

impl<B: StorageBackend> TableHandler<B> {
    /// Create table `name` described by `host` and open it.
    pub fn create(
        mut backend: B,
        name: &str,
        host: &HostTable,
        option: HandlerOption,
    ) -> Result<Self, HandlerError> {
        let schema = TableSchema::from_host(host)?;
        if let Err(err) =
            backend.create_table(name, &schema.serialize(), option.initial_auto_increment)
        {
            log_backend_failure(&option, name, "create_table", &err);
            return Err(err.into());
        }
        bridge_log!(
            log::Level::Info,
            ctx: option.log_context,
            "table_created",
            "table={} columns={} indices={}",
            name,
            schema.column_count(),
            schema.indices().len()
        );
        Self::open(backend, name, host, option)
    }

    /// Open the existing table `name`; `host` must describe the same columns.
    pub fn open(
        mut backend: B,
        name: &str,
        host: &HostTable,
        option: HandlerOption,
    ) -> Result<Self, HandlerError> {
        let bytes = match backend.open_table(name) {
            Ok(bytes) => bytes,
            Err(err) => {
                log_backend_failure(&option, name, "open_table", &err);
                return Err(err.into());
            }
        };
        let schema = TableSchema::deserialize(&bytes)?;
        if host.fields.len() != schema.column_count() {
            return Err(ContainerError::ColumnCount {
                expected: schema.column_count(),
                found: host.fields.len(),
            }
            .into());
        }
        let mut codecs = Vec::with_capacity(host.fields.len());
        for (field, (column, column_schema)) in host.fields.iter().zip(schema.columns()) {
            let codec = FieldCodec::for_host(field)?;
            if field.name != column || codec.column_type() != column_schema.column_type() {
                return Err(ContainerError::InvalidColumn {
                    column: column.to_string(),
                    reason: format!(
                        "host field `{}` of type {:?} does not match stored {:?}",
                        field.name,
                        codec.column_type(),
                        column_schema.column_type()
                    ),
                }
                .into());
            }
            codecs.push(codec);
        }
        bridge_log!(
            log::Level::Debug,
            ctx: option.log_context,
            "table_opened",
            "table={} version={}",
            name,
            schema.version()
        );
        Ok(Self {
            backend,
            name: name.to_string(),
            host: host.clone(),
            scratch: Row::with_capacity(schema.column_count()),
            schema,
            codecs,
            option,
            ids: RowIdGenerator::new(),
            state: ScanState::Closed,
            position: None,
            failed_key: None,
        })
    }

    /// End any scan, close the table and hand the session back.
    pub fn close(mut self) -> Result<B, HandlerError> {
        self.end_scan()?;
        self.call("close_table", |backend| backend.close_table())?;
        Ok(self.backend)
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor of the open table.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Identity of the row last read, the target of `update` and `delete`.
    pub fn position(&self) -> Option<RowId> {
        self.position
    }

    /// Unique index that rejected the last write.
    pub fn failed_key(&self) -> Option<&str> {
        self.failed_key.as_deref()
    }

    /// The backend session.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend session, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn call<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut B) -> Result<T, BackendError>,
    ) -> Result<T, HandlerError> {
        f(&mut self.backend).map_err(|err| {
            log_backend_failure(&self.option, &self.name, operation, &err);
            HandlerError::from(err)
        })
    }

    fn pack_row(&self, values: &HostRow, id: RowId) -> Result<Row, HandlerError> {
        if values.len() != self.codecs.len() {
            return Err(HandlerError::RowWidth {
                expected: self.codecs.len(),
                found: values.len(),
            });
        }
        let mut row = Row::with_capacity(values.len());
        row.set_id(id);
        for ((codec, value), (name, column)) in
            self.codecs.iter().zip(values).zip(self.schema.columns())
        {
            match value {
                Some(value) => row.push(Some(Bytes::from(codec.encode_for_storage(value)?))),
                None if column.is_nullable() => row.push(None),
                None => return Err(HandlerError::NotNullable(name.to_string())),
            }
        }
        Ok(row)
    }

    /// Decode the scratch row into `out`, which is left as it was on error.
    fn unpack_scratch(&self, out: &mut HostRow) -> Result<(), HandlerError> {
        self.scratch.check_columns(&self.schema)?;
        *out = self
            .codecs
            .iter()
            .zip(self.scratch.values())
            .map(|(codec, value)| {
                value
                    .as_ref()
                    .map(|bytes| codec.decode_into_field(bytes))
                    .transpose()
            })
            .collect::<Result<HostRow, _>>()?;
        Ok(())
    }
}

fn log_backend_failure(option: &HandlerOption, table: &str, operation: &str, err: &BackendError) {
    if let BackendError::Transport(reason) = err {
        bridge_log!(
            log::Level::Error,
            ctx: option.log_context,
            "transport_failure",
            "table={} operation={} reason={}",
            table,
            operation,
            reason
        );
    }
}
