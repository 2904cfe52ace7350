use crate::{model::Document, silent_logs};
use std::{env, fs, process};
use trove::{Connection, ConnectionPool, Entity, Error, PoolConfig, PoolStats};

pub fn pool<C: Connection>(url: &str) {
    let properties = env::temp_dir().join(format!("trove-tests-{}.properties", process::id()));
    fs::write(
        &properties,
        format!("# Written by the pool scenario\nTROVE_TESTS_DOCUMENTS = {}\n", url),
    )
    .expect("Failed to write the properties file");
    let pool = ConnectionPool::<C>::new(PoolConfig::new().max_idle(1).properties(&properties));
    {
        let mut first = pool
            .acquire("TROVE_TESTS_DOCUMENTS")
            .expect("Failed to acquire a connection");
        let mut second = pool.acquire(url).expect("Failed to acquire a connection");
        assert_eq!(first.url(), url);
        assert!(first.is_alive());
        let total = Document::find_all(&mut *first).unwrap().size().unwrap();
        let documents = Document::find_all(&mut *second).unwrap().list().unwrap().len();
        assert_eq!(total, documents as u64);
    }
    assert_eq!(
        pool.stats(),
        PoolStats {
            created: 2,
            reused: 0,
            recycled: 1,
            discarded: 1,
        }
    );
    assert_eq!(pool.idle(url), 1);
    {
        let mut again = pool.acquire(url).unwrap();
        assert!(again.is_alive());
        assert_eq!(pool.idle(url), 0);
    }
    assert_eq!(pool.stats().reused, 1);
    assert_eq!(pool.idle(url), 1);
    pool.clear();
    assert_eq!(pool.idle(url), 0);
    assert_eq!(pool.stats().discarded, 2);
    silent_logs! {
        assert!(matches!(
            pool.acquire("TROVE_TESTS_UNKNOWN"),
            Err(Error::Configuration(..))
        ));
    }
    let _ = fs::remove_file(&properties);
}
