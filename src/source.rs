//! Connection sources.
//!
//! A source pairs an acceptor, something that yields raw stream halves,
//! with the set of live connections accepted from it. The node drives the
//! accept loop; the source just tracks membership so notification fan-out
//! and shutdown can walk every open connection.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::connection::{BoxedReader, BoxedWriter, Connection};

/// Boxed future alias used at `dyn` trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Yields accepted streams, one pair of halves per client.
pub trait Accept: Send + 'static {
    /// Waits for the next client. `None` means the listener is finished
    /// and the accept loop should end.
    fn accept(&mut self) -> BoxFuture<'_, Option<(BoxedReader, BoxedWriter)>>;
}

/// One listener and its live connections.
pub struct Source {
    acceptor: Option<Box<dyn Accept>>,
    connections: Arc<Mutex<Vec<Arc<Connection>>>>,
}

impl Source {
    pub fn new(acceptor: impl Accept) -> Self {
        Self {
            acceptor: Some(Box::new(acceptor)),
            connections: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Open connections accepted from this source.
    pub fn connection_count(&self) -> usize {
        match self.connections.lock() {
            Ok(set) => set.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub(crate) fn take_acceptor(&mut self) -> Option<Box<dyn Accept>> {
        self.acceptor.take()
    }

    pub(crate) fn connections(&self) -> Arc<Mutex<Vec<Arc<Connection>>>> {
        Arc::clone(&self.connections)
    }
}

/// Snapshot of a connection set; taken under the lock, used outside it.
pub(crate) fn snapshot(set: &Mutex<Vec<Arc<Connection>>>) -> Vec<Arc<Connection>> {
    match set.lock() {
        Ok(connections) => connections.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

pub(crate) fn insert(set: &Mutex<Vec<Arc<Connection>>>, connection: Arc<Connection>) {
    match set.lock() {
        Ok(mut connections) => connections.push(connection),
        Err(poisoned) => poisoned.into_inner().push(connection),
    }
}

pub(crate) fn remove(set: &Mutex<Vec<Arc<Connection>>>, connection: &Arc<Connection>) {
    let retain = |connections: &mut Vec<Arc<Connection>>| {
        connections.retain(|c| !Arc::ptr_eq(c, connection));
    };
    match set.lock() {
        Ok(mut connections) => retain(&mut connections),
        Err(poisoned) => retain(&mut poisoned.into_inner()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;

    impl Accept for Empty {
        fn accept(&mut self) -> BoxFuture<'_, Option<(BoxedReader, BoxedWriter)>> {
            Box::pin(async { None })
        }
    }

    fn connection() -> Arc<Connection> {
        let (near, _far) = tokio::io::duplex(16);
        let (_read_half, write_half) = tokio::io::split(near);
        Arc::new(Connection::new(1, Box::new(write_half), 16))
    }

    #[tokio::test]
    async fn acceptor_is_taken_once() {
        let mut source = Source::new(Empty);
        assert!(source.take_acceptor().is_some());
        assert!(source.take_acceptor().is_none());
    }

    #[tokio::test]
    async fn membership_tracks_inserts_and_removals() {
        let source = Source::new(Empty);
        let set = source.connections();
        let a = connection();
        let b = connection();

        insert(&set, Arc::clone(&a));
        insert(&set, Arc::clone(&b));
        assert_eq!(source.connection_count(), 2);

        remove(&set, &a);
        assert_eq!(source.connection_count(), 1);
        assert!(Arc::ptr_eq(&snapshot(&set)[0], &b));
    }
}
