use super::{batch::Operation, Batch, DBKey, DBValue, Database};
use crate::error::DBError;
use rocksdb::{ColumnFamily, DBIterator, IteratorMode, Options, WriteBatch, DB};
use std::marker::PhantomData;
use std::path::PathBuf;

pub struct DiskDatabase {
    db: DB,
}

pub struct Iter<'a, V: DBValue> {
    iter: DBIterator<'a>,
    v: PhantomData<V>,
}

impl<'a, V: DBValue> Iterator for Iter<'a, V> {
    type Item = (Box<[u8]>, V);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.iter.next()?.ok()?;
        let value = V::decode(&value).ok()?;
        Some((key, value))
    }
}

impl DiskDatabase {
    pub fn open(path: PathBuf, columns: Vec<&'static str>) -> Result<Self, DBError> {
        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        db_options.create_missing_column_families(true);
        db_options.increase_parallelism(4);
        db_options.set_compression_type(rocksdb::DBCompressionType::Snappy);

        Ok(Self {
            db: DB::open_cf(&db_options, path, columns)?,
        })
    }

    fn col(&self, col: &'static str) -> Result<&ColumnFamily, DBError> {
        self.db.cf_handle(col).ok_or(DBError::Other("bad column"))
    }

    /// Forward scan of an entire column, skipping undecodable values
    pub fn iter_cf<V: DBValue>(&self, col: &'static str) -> Result<Iter<V>, DBError> {
        let col = self.col(col)?;
        Ok(Iter {
            iter: self.db.iterator_cf(col, IteratorMode::Start),
            v: PhantomData,
        })
    }
}

impl Database for DiskDatabase {
    fn get<K: DBKey, V: DBValue>(&self, key: K) -> Result<Option<V>, DBError> {
        let col = self.col(key.col())?;
        let raw = self.db.get_pinned_cf(col, key.encode()?)?;
        Ok(match raw {
            Some(raw) => Some(V::decode(&raw)?),
            None => None,
        })
    }

    fn write_batch<K: DBKey>(&self, batch: Batch<K>) -> Result<(), DBError> {
        let mut write_batch = WriteBatch::default();
        for operation in batch.operations {
            match operation {
                Operation::Insert(key, value) => {
                    let col = self.col(key.col())?;
                    write_batch.put_cf(col, key.encode()?, value);
                }
                Operation::Remove(key) => {
                    let col = self.col(key.col())?;
                    write_batch.delete_cf(col, key.encode()?);
                }
            }
        }
        self.db.write(write_batch)?;
        Ok(())
    }

    fn has<K: DBKey>(&self, key: K) -> Result<bool, DBError> {
        let col = self.col(key.col())?;
        let value = self.db.get_pinned_cf(col, key.encode()?)?;
        Ok(value.is_some())
    }
}
