use crate::foundation::AccordError;
use crate::storage_err;
use rocksdb::{ColumnFamily, WriteBatch, DB};

/// Write batch committed atomically across column families.
pub(super) struct RocksBatch<'a> {
    db: &'a DB,
    batch: WriteBatch,
}

impl<'a> RocksBatch<'a> {
    pub(super) fn new(db: &'a DB) -> Self {
        Self { db, batch: WriteBatch::default() }
    }

    pub(super) fn put(&mut self, cf: &ColumnFamily, key: &[u8], value: &[u8]) {
        self.batch.put_cf(cf, key, value);
    }

    pub(super) fn delete(&mut self, cf: &ColumnFamily, key: &[u8]) {
        self.batch.delete_cf(cf, key);
    }

    pub(super) fn len(&self) -> usize {
        self.batch.len()
    }

    pub(super) fn commit(self) -> Result<(), AccordError> {
        self.db.write(self.batch).map_err(|err| storage_err!("rocksdb write_batch", err))
    }
}
