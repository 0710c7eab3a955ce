//! Per-namespace response cache.
//!
//! Entries live exactly as long as the smallest answer TTL and are never
//! served after that. TTLs handed back to clients are reduced by the time
//! the entry has spent in the cache.

use compact_str::CompactString;
use hickory_proto::op::{Message, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Record, RecordType};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: CompactString,
    record_type: RecordType,
    class: DNSClass,
}

impl CacheKey {
    pub fn new(name: &str, record_type: RecordType, class: DNSClass) -> Self {
        let mut lowered = CompactString::with_capacity(name.len());
        for c in name.chars() {
            lowered.push(c.to_ascii_lowercase());
        }
        Self {
            name: lowered,
            record_type,
            class,
        }
    }

    pub fn from_query(query: &Query) -> Self {
        Self::new(
            &query.name().to_ascii(),
            query.query_type(),
            query.query_class(),
        )
    }
}

struct CacheEntry {
    response: Message,
    inserted_at: Instant,
    expires_at: Instant,
}

pub struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached response with TTLs aged to `now`, or `None` on a miss or an
    /// expired entry.
    pub fn get(&self, key: &CacheKey, now: Instant) -> Option<Message> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;

        if now >= entry.expires_at {
            entries.pop(key);
            debug!(name = %key.name, "Expired cache entry dropped");
            return None;
        }

        let age = now.saturating_duration_since(entry.inserted_at).as_secs();
        let age = u32::try_from(age).unwrap_or(u32::MAX);
        Some(aged(&entry.response, age))
    }

    /// Stores `response` without its OPT record if it is cacheable. Returns
    /// whether it was stored.
    pub fn insert(&self, key: CacheKey, response: &Message, now: Instant) -> bool {
        let Some(ttl) = cacheable_ttl(response) else {
            return false;
        };

        let mut response = response.clone();
        *response.extensions_mut() = None;
        let entry = CacheEntry {
            response,
            inserted_at: now,
            expires_at: now + Duration::from_secs(u64::from(ttl)),
        };
        self.lock().put(key, entry);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Minimum answer TTL of a NOERROR response with answers, if above zero.
fn cacheable_ttl(response: &Message) -> Option<u32> {
    if response.response_code() != ResponseCode::NoError || response.truncated() {
        return None;
    }
    response
        .answers()
        .iter()
        .map(Record::ttl)
        .min()
        .filter(|ttl| *ttl > 0)
}

fn aged(response: &Message, age: u32) -> Message {
    let mut message = response.clone();
    if age == 0 {
        return message;
    }

    let age_records = |records: Vec<Record>| -> Vec<Record> {
        records
            .into_iter()
            .map(|mut record| {
                let ttl = record.ttl().saturating_sub(age);
                record.set_ttl(ttl);
                record
            })
            .collect()
    };

    let answers = age_records(message.take_answers());
    let name_servers = age_records(message.take_name_servers());
    let additionals = age_records(message.take_additionals());
    message.insert_answers(answers);
    message.insert_name_servers(name_servers);
    message.insert_additionals(additionals);
    message
}
