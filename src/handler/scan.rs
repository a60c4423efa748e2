use super::{
    key::{build_query_key, HostKey, ReadFlag},
    HandlerError, HostRow, TableHandler,
};
use crate::{
    backend::StorageBackend,
    id::RowId,
    logging::bridge_log,
    query::{QueryKey, QueryType},
};

/// Scan state of a handler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    /// No scan is open.
    #[default]
    Closed,
    /// Rows are read in storage order.
    TableScanning,
    /// Rows are read through an index.
    IndexScanning {
        /// The index being read.
        index: String,
    },
}

impl<B: StorageBackend> TableHandler<B> {
    /// Current scan state.
    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Start reading every row. An open scan is ended first.
    pub fn begin_table_scan(&mut self) -> Result<(), HandlerError> {
        self.end_scan()?;
        self.call("start_table_scan", |backend| backend.start_table_scan())?;
        self.state = ScanState::TableScanning;
        bridge_log!(
            log::Level::Debug,
            ctx: self.option.log_context,
            "scan_begin",
            "table={} kind=table",
            self.name
        );
        Ok(())
    }

    /// Start reading `index` positioned by a host key image and read flag.
    pub fn begin_index_scan(
        &mut self,
        index: &str,
        key: &HostKey,
        flag: ReadFlag,
    ) -> Result<(), HandlerError> {
        let index_schema = self
            .schema
            .index(index)
            .ok_or_else(|| HandlerError::UnknownIndex(index.to_string()))?;
        let query = build_query_key(
            index,
            index_schema,
            &self.schema,
            &self.host.fields,
            &self.codecs,
            key,
            flag,
        )?;
        self.start_index_scan(query)
    }

    /// Start reading `index` from its first key.
    pub fn begin_index_first(&mut self, index: &str) -> Result<(), HandlerError> {
        self.begin_whole_index(index, QueryType::IndexFirst)
    }

    /// Start reading `index` backwards from its last key.
    pub fn begin_index_last(&mut self, index: &str) -> Result<(), HandlerError> {
        self.begin_whole_index(index, QueryType::IndexLast)
    }

    fn begin_whole_index(
        &mut self,
        index: &str,
        query_type: QueryType,
    ) -> Result<(), HandlerError> {
        let index_schema = self
            .schema
            .index(index)
            .ok_or_else(|| HandlerError::UnknownIndex(index.to_string()))?;
        let query = QueryKey::builder(index, index_schema, query_type).build()?;
        self.start_index_scan(query)
    }

    fn start_index_scan(&mut self, query: QueryKey) -> Result<(), HandlerError> {
        self.end_scan()?;
        let bytes = query.serialize();
        self.call("start_index_scan", |backend| backend.start_index_scan(&bytes))?;
        bridge_log!(
            log::Level::Debug,
            ctx: self.option.log_context,
            "scan_begin",
            "table={} kind=index index={} query_type={:?} parts={}",
            self.name,
            query.index_name(),
            query.query_type(),
            query.keys().len()
        );
        self.state = ScanState::IndexScanning {
            index: query.index_name().to_string(),
        };
        Ok(())
    }

    /// Read the next row of the open scan into `out`.
    ///
    /// Returns `None` at the end of the scan, leaving the scan open and `out`
    /// untouched.
    pub fn next(&mut self, out: &mut HostRow) -> Result<Option<RowId>, HandlerError> {
        if self.state == ScanState::Closed {
            return Err(HandlerError::NoActiveScan);
        }
        let Some(bytes) = self.call("get_next_row", |backend| backend.get_next_row())? else {
            return Ok(None);
        };
        self.scratch.deserialize_into(&bytes)?;
        self.unpack_scratch(out)?;
        let id = self.scratch.id();
        self.position = Some(id);
        Ok(Some(id))
    }

    /// Close the open scan, if any.
    ///
    /// The handler is `Closed` afterwards even when the backend call fails.
    pub fn end_scan(&mut self) -> Result<(), HandlerError> {
        if self.state == ScanState::Closed {
            return Ok(());
        }
        let state = std::mem::take(&mut self.state);
        self.call("end_scan", |backend| backend.end_scan())?;
        bridge_log!(
            log::Level::Debug,
            ctx: self.option.log_context,
            "scan_end",
            "table={} state={:?}",
            self.name,
            state
        );
        Ok(())
    }

    /// Read the row with identity `id` into `out`; `false` when it does not
    /// exist. Does not disturb an open scan.
    pub fn lookup_by_identity(
        &mut self,
        id: RowId,
        out: &mut HostRow,
    ) -> Result<bool, HandlerError> {
        let Some(bytes) = self.call("get_row_by_identity", |backend| {
            backend.get_row_by_identity(id)
        })?
        else {
            return Ok(false);
        };
        self.scratch.deserialize_into(&bytes)?;
        self.unpack_scratch(out)?;
        self.position = Some(id);
        Ok(true)
    }
}
