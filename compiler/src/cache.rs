use std::{
    hash::Hash,
    num::NonZeroUsize,
    sync::{
        mpsc::{self, RecvTimeoutError, Sender},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::trace;
use lru::LruCache;

struct Entry<V> {
    value: V,
    inserted: Instant,
}

/// Entries in insertion order. Lookups use `peek` so that reads never reorder them, which
/// keeps the least recently used entry equal to the oldest insertion.
struct Entries<K, V> {
    /// `None` when the capacity is zero.
    lru: Option<LruCache<K, Entry<V>>>,
    ttl: Duration,
}

impl<K: Hash + Eq, V> Entries<K, V> {
    /// Expired entries are always the oldest, so they sit at the least recently used end.
    fn purge_expired(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let Some(lru) = self.lru.as_mut() else {
            return 0;
        };
        let mut purged = 0;
        while lru
            .peek_lru()
            .is_some_and(|(_, entry)| now.duration_since(entry.inserted) >= ttl)
        {
            lru.pop_lru();
            purged += 1;
        }
        purged
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A size-bounded map whose entries expire `ttl` after insertion. A background thread drops
/// expired entries every `reap_interval` until the cache is closed.
pub struct QueryCache<K, V> {
    entries: Arc<Mutex<Entries<K, V>>>,
    stop: Mutex<Option<Sender<()>>>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new(capacity: usize, ttl: Duration, reap_interval: Duration) -> Self {
        let entries = Arc::new(Mutex::new(Entries {
            lru: NonZeroUsize::new(capacity).map(LruCache::new),
            ttl,
        }));
        let (stop, stopped) = mpsc::channel::<()>();
        let reaped = Arc::clone(&entries);
        let reaper = thread::spawn(move || loop {
            match stopped.recv_timeout(reap_interval) {
                Err(RecvTimeoutError::Timeout) => {
                    let purged = lock(&reaped).purge_expired(Instant::now());
                    if purged > 0 {
                        trace!("cache reaper dropped {purged} expired entries");
                    }
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Self {
            entries,
            stop: Mutex::new(Some(stop)),
            reaper: Mutex::new(Some(reaper)),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = lock(&self.entries);
        let ttl = entries.ttl;
        let lru = entries.lru.as_mut()?;
        let expired = Instant::now().duration_since(lru.peek(key)?.inserted) >= ttl;
        if expired {
            lru.pop(key);
            return None;
        }
        lru.peek(key).map(|e| e.value.clone())
    }

    /// Replacing a key counts as a fresh insertion. When the cache is full, expired entries go
    /// first and then the oldest insertion. A zero-capacity cache stores nothing.
    pub fn insert(&self, key: K, value: V) {
        let mut entries = lock(&self.entries);
        let full = entries
            .lru
            .as_ref()
            .is_some_and(|lru| !lru.contains(&key) && lru.len() == lru.cap().get());
        if full {
            entries.purge_expired(Instant::now());
        }
        if let Some(lru) = entries.lru.as_mut() {
            let entry = Entry {
                value,
                inserted: Instant::now(),
            };
            lru.push(key, entry);
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        lock(&self.entries)
            .lru
            .as_mut()
            .and_then(|lru| lru.pop(key))
            .map(|e| e.value)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).lru.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(lru) = lock(&self.entries).lru.as_mut() {
            lru.clear();
        }
    }

    pub fn purge_expired(&self) -> usize {
        lock(&self.entries).purge_expired(Instant::now())
    }

    /// Stops the reaper and waits for it. Later calls do nothing.
    pub fn close(&self) {
        if lock(&self.stop).take().is_none() {
            return;
        }
        if let Some(handle) = lock(&self.reaper).take() {
            if handle.join().is_err() {
                trace!("cache reaper panicked before shutdown");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.stop).is_none()
    }
}

impl<K, V> Drop for QueryCache<K, V> {
    fn drop(&mut self) {
        let stop = self.stop.get_mut().unwrap_or_else(PoisonError::into_inner);
        drop(stop.take());
        let reaper = self.reaper.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = reaper.take() {
            let _ = handle.join();
        }
    }
}
