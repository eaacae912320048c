//! Argument buckets and positional binding.
//!
//! Values are collected per clause type while a statement is being built and
//! flattened into the positional list only when the statement is compiled.
//! Flattening always visits the buckets in [`Bucket::PRIORITY`] order, which is
//! the order in which each clause type's placeholders appear in the final text.

use serde_json::Value;

/// The clause a bound value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Insert,
    Update,
    Join,
    Where,
    Order,
}

impl Bucket {
    pub const PRIORITY: [Bucket; 5] = [
        Bucket::Insert,
        Bucket::Update,
        Bucket::Join,
        Bucket::Where,
        Bucket::Order,
    ];

    const fn index(self) -> usize {
        match self {
            Bucket::Insert => 0,
            Bucket::Update => 1,
            Bucket::Join => 2,
            Bucket::Where => 3,
            Bucket::Order => 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentBuckets {
    buckets: [Vec<Value>; 5],
}

impl ArgumentBuckets {
    pub fn push(&mut self, bucket: Bucket, value: Value) {
        self.buckets[bucket.index()].push(value);
    }

    pub fn extend<I>(&mut self, bucket: Bucket, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.buckets[bucket.index()].extend(values);
    }

    pub fn get(&self, bucket: Bucket) -> &[Value] {
        &self.buckets[bucket.index()]
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Flattens the buckets into the positional argument list.
    pub fn bind(&self) -> Vec<Value> {
        let mut args = Vec::with_capacity(self.len());
        for bucket in Bucket::PRIORITY {
            args.extend(self.get(bucket).iter().cloned());
        }
        args
    }
}
