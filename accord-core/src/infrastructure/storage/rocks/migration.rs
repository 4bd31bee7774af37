use super::schema::*;
use crate::foundation::AccordError;
use rocksdb::{ColumnFamilyDescriptor, Options as RocksOptions, DB};
use std::path::Path;

pub fn open_db_with_cfs(path: impl AsRef<Path>) -> Result<DB, AccordError> {
    let mut options = RocksOptions::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options.set_use_fsync(true);
    options.set_manual_wal_flush(false);
    options.set_paranoid_checks(true);
    options.optimize_for_point_lookup(64);

    let cfs = vec![
        ColumnFamilyDescriptor::new(CF_DEFAULT, RocksOptions::default()),
        ColumnFamilyDescriptor::new(CF_METADATA, RocksOptions::default()),
        ColumnFamilyDescriptor::new(CF_CONTRACT, RocksOptions::default()),
        ColumnFamilyDescriptor::new(CF_CONTRACT_INDEX, RocksOptions::default()),
        ColumnFamilyDescriptor::new(CF_SIGNER, RocksOptions::default()),
        ColumnFamilyDescriptor::new(CF_USER, RocksOptions::default()),
        ColumnFamilyDescriptor::new(CF_USER_INDEX, RocksOptions::default()),
        ColumnFamilyDescriptor::new(CF_INTENT, RocksOptions::default()),
    ];

    DB::open_cf_descriptors(&options, path, cfs)
        .map_err(|err| AccordError::StorageError { operation: "rocksdb open_cf_descriptors".to_string(), details: err.to_string() })
}
