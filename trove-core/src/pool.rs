use crate::{Connection, Entity, Error, Result};
use anyhow::Context;
use regex::Regex;
use std::{
    collections::HashMap,
    env, fs,
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
    sync::{
        LazyLock, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][\w+.-]*://").expect("valid url pattern"));

/// Pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Idle connections kept for each url, the others are closed when released.
    pub max_idle: usize,
    /// Properties file consulted by the [`ConnectionResolver`].
    pub properties: PathBuf,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: 4,
            properties: PathBuf::from("trove.properties"),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }
    pub fn properties(mut self, path: impl Into<PathBuf>) -> Self {
        self.properties = path.into();
        self
    }
}

/// Turns the connection string of a [`TableDef`](crate::TableDef) into a url.
///
/// The string is tried as a literal url (`scheme://...`), then as the name of an
/// environment variable, then as a key of the properties file. The first match wins.
#[derive(Debug, Clone)]
pub struct ConnectionResolver {
    properties: PathBuf,
}

impl ConnectionResolver {
    pub fn new(properties: impl Into<PathBuf>) -> Self {
        Self {
            properties: properties.into(),
        }
    }

    pub fn resolve(&self, connection: &str) -> Result<String> {
        let connection = connection.trim();
        if URL.is_match(connection) {
            return Ok(connection.to_string());
        }
        if connection.is_empty() {
            return Err(Error::Configuration(
                "The connection string is empty".into(),
            ));
        }
        if let Ok(url) = env::var(connection) {
            if !url.trim().is_empty() {
                log::trace!("Connection {} resolved from the environment", connection);
                return Ok(url.trim().to_string());
            }
        }
        if let Some(url) = self.property(connection)? {
            log::trace!(
                "Connection {} resolved from {}",
                connection,
                self.properties.display()
            );
            return Ok(url);
        }
        Err(Error::Configuration(format!(
            "Cannot resolve the connection {}: it is not a url, an environment variable or a key of {}",
            connection,
            self.properties.display()
        )))
    }

    fn property(&self, key: &str) -> Result<Option<String>> {
        if !Path::new(&self.properties).exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.properties)
            .with_context(|| format!("While reading {}", self.properties.display()))?;
        Ok(parse_properties(&content)
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string()))
    }
}

/// Entries of a properties file: `key=value` or `key: value`, lines starting with `#` or `!` are comments.
fn parse_properties(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let at = line.find(['=', ':'])?;
            Some((line[..at].trim(), line[at + 1..].trim()))
        })
        .collect()
}

/// Counters of the pool activity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections opened.
    pub created: u64,
    /// Idle connections handed out again.
    pub reused: u64,
    /// Connections returned to the idle list.
    pub recycled: u64,
    /// Connections closed because dead or in excess.
    pub discarded: u64,
}

/// Connections of one driver, grouped by url.
///
/// A connection is taken with [`ConnectionPool::acquire`] and goes back to the
/// idle list when the guard is dropped. Idle connections are checked before
/// being handed out, a dead one is closed and replaced.
pub struct ConnectionPool<C: Connection> {
    idle: Mutex<HashMap<String, Vec<C>>>,
    config: PoolConfig,
    resolver: ConnectionResolver,
    created: AtomicU64,
    reused: AtomicU64,
    recycled: AtomicU64,
    discarded: AtomicU64,
}

impl<C: Connection> Default for ConnectionPool<C> {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl<C: Connection> ConnectionPool<C> {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
            resolver: ConnectionResolver::new(&config.properties),
            config,
            created: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            recycled: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    pub fn resolver(&self) -> &ConnectionResolver {
        &self.resolver
    }

    /// A connection to the url `connection` resolves to.
    pub fn acquire(&self, connection: &str) -> Result<PoolGuard<'_, C>> {
        let url = self.resolver.resolve(connection)?;
        loop {
            let idle = self
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get_mut(&url)
                .and_then(Vec::pop);
            let Some(mut connection) = idle else {
                break;
            };
            if connection.is_alive() {
                self.reused.fetch_add(1, Ordering::Relaxed);
                log::trace!("Reusing a connection to {}", url);
                return Ok(PoolGuard::new(self, url, connection));
            }
            self.discarded.fetch_add(1, Ordering::Relaxed);
            log::debug!("Discarding a dead connection to {}", url);
        }
        let connection =
            C::connect(&url).with_context(|| format!("While connecting to {}", url))?;
        self.created.fetch_add(1, Ordering::Relaxed);
        log::debug!("Opened a connection to {}", url);
        Ok(PoolGuard::new(self, url, connection))
    }

    /// A connection to the database of `E`.
    pub fn acquire_for<E: Entity>(&self) -> Result<PoolGuard<'_, C>> {
        self.acquire(E::table().connection)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    /// Number of idle connections to `url`.
    pub fn idle(&self, url: &str) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .map_or(0, Vec::len)
    }

    /// Close every idle connection.
    pub fn clear(&self) {
        let idle = std::mem::take(&mut *self.idle.lock().unwrap_or_else(PoisonError::into_inner));
        let closed: u64 = idle.into_values().map(|v| v.len() as u64).sum();
        self.discarded.fetch_add(closed, Ordering::Relaxed);
    }

    fn release(&self, url: String, connection: C) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        let list = idle.entry(url).or_default();
        if list.len() < self.config.max_idle {
            list.push(connection);
            self.recycled.fetch_add(1, Ordering::Relaxed);
        } else {
            drop(idle);
            drop(connection);
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// A connection borrowed from a [`ConnectionPool`], returned when dropped.
pub struct PoolGuard<'p, C: Connection> {
    pool: &'p ConnectionPool<C>,
    url: String,
    connection: ManuallyDrop<C>,
}

impl<'p, C: Connection> PoolGuard<'p, C> {
    fn new(pool: &'p ConnectionPool<C>, url: String, connection: C) -> Self {
        Self {
            pool,
            url,
            connection: ManuallyDrop::new(connection),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<'p, C: Connection> Deref for PoolGuard<'p, C> {
    type Target = C;
    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl<'p, C: Connection> DerefMut for PoolGuard<'p, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}

impl<'p, C: Connection> Drop for PoolGuard<'p, C> {
    fn drop(&mut self) {
        // SAFETY: The connection is never used again after being taken
        let connection = unsafe { ManuallyDrop::take(&mut self.connection) };
        self.pool.release(std::mem::take(&mut self.url), connection);
    }
}
