//! Cache-backed queries and one-shot tasks for views.
//!
//! A `Query<T>` pairs a fetcher (which writes the normalized cache) with a
//! reader (which projects the cache into what the view renders). The view
//! never holds response data of its own: whenever the cache generation moves,
//! the reader runs again, so a mutation reconciled elsewhere shows up on
//! every screen that reads the affected records.
//!
//! # Example
//!
//! ```ignore
//! let fetch_client = client.clone();
//! let read_client = client.clone();
//! let mut query = Query::new(
//!     FetchPolicy::CacheAndNetwork,
//!     client.cache().subscribe(),
//!     move |token| {
//!         let client = fetch_client.clone();
//!         async move { client.fetch_orders(token).await }
//!     },
//!     move || read_client.cached_orders(),
//! );
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // Data or status changed, re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, watch};

use crate::gateway::GatewayError;

/// How a query treats data already in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
  /// Show nothing until the network answer settles.
  NetworkOnly,
  /// Show cached data immediately while refetching.
  CacheAndNetwork,
}

/// Network status of a query. Data is tracked separately.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
  /// Query has not been started
  Idle,
  /// First page (or a refetch) in flight
  Loading,
  /// A further page is in flight; existing data stays visible
  LoadingMore,
  /// The last request completed
  Settled,
  /// The last request failed
  Error(GatewayError),
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Writes one page into the cache. `None` loads the first page.
type FetcherFn = Box<dyn Fn(Option<String>) -> BoxFuture<Result<(), GatewayError>> + Send + Sync>;

type ReaderFn<T> = Box<dyn Fn() -> Option<T> + Send + Sync>;

pub struct Query<T> {
  state: QueryState,
  policy: FetchPolicy,
  data: Option<T>,
  fetcher: FetcherFn,
  reader: ReaderFn<T>,
  generation: watch::Receiver<u64>,
  receiver: Option<mpsc::UnboundedReceiver<Result<(), GatewayError>>>,
  /// Whether cache data may be shown under the current policy.
  visible: bool,
  /// Failure not yet handed to the view for display.
  unreported: Option<GatewayError>,
}

impl<T: Send + 'static> Query<T> {
  pub fn new<F, Fut, R>(
    policy: FetchPolicy,
    generation: watch::Receiver<u64>,
    fetcher: F,
    reader: R,
  ) -> Self
  where
    F: Fn(Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), GatewayError>> + Send + 'static,
    R: Fn() -> Option<T> + Send + Sync + 'static,
  {
    Self {
      state: QueryState::Idle,
      policy,
      data: None,
      fetcher: Box::new(move |token| Box::pin(fetcher(token))),
      reader: Box::new(reader),
      generation,
      receiver: None,
      visible: false,
      unreported: None,
    }
  }

  pub fn state(&self) -> &QueryState {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.state, QueryState::Loading | QueryState::LoadingMore)
  }

  pub fn error(&self) -> Option<&GatewayError> {
    match &self.state {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// The latest failure, once. Views surface it in the message overlay.
  pub fn take_error(&mut self) -> Option<GatewayError> {
    self.unreported.take()
  }

  /// Start loading the first page unless a request is already in flight.
  pub fn fetch(&mut self) {
    if self.is_loading() {
      return;
    }
    self.start(None);
  }

  /// Reload the first page, dropping any pending answer.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start(None);
  }

  /// Load the page after `token`. Ignored while another request is in flight.
  pub fn fetch_more(&mut self, token: String) {
    if self.is_loading() {
      return;
    }
    self.receiver = Some(self.spawn(Some(token)));
    self.state = QueryState::LoadingMore;
  }

  /// Drain the pending answer and follow cache changes.
  ///
  /// Returns `true` if anything the view renders changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    if let Some(receiver) = &mut self.receiver {
      let outcome = match receiver.try_recv() {
        Ok(result) => Some(result),
        Err(mpsc::error::TryRecvError::Empty) => None,
        Err(mpsc::error::TryRecvError::Disconnected) => {
          Some(Err(GatewayError::Transport("Request was cancelled".to_string())))
        }
      };

      if let Some(result) = outcome {
        self.receiver = None;
        self.state = match result {
          Ok(()) => QueryState::Settled,
          Err(e) => {
            self.unreported = Some(e.clone());
            QueryState::Error(e)
          }
        };
        self.visible = true;
        self.reload();
        changed = true;
      }
    }

    if self.generation.has_changed().unwrap_or(false) {
      self.generation.borrow_and_update();
      if self.visible {
        self.reload();
        changed = true;
      }
    }

    changed
  }

  fn start(&mut self, token: Option<String>) {
    self.receiver = Some(self.spawn(token));
    self.state = QueryState::Loading;

    match self.policy {
      FetchPolicy::CacheAndNetwork => {
        self.visible = true;
        self.reload();
      }
      FetchPolicy::NetworkOnly => {
        self.visible = false;
        self.data = None;
      }
    }
  }

  fn spawn(&self, token: Option<String>) -> mpsc::UnboundedReceiver<Result<(), GatewayError>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let future = (self.fetcher)(token);
    tokio::spawn(async move {
      // Receiver may have been dropped by a refetch
      let _ = tx.send(future.await);
    });
    rx
  }

  fn reload(&mut self) {
    self.data = (self.reader)();
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("policy", &self.policy)
      .field("data", &self.data)
      .finish_non_exhaustive()
  }
}

/// A single in-flight operation whose result is consumed once.
///
/// Used for mutations and other actions; views disable their action keys
/// while `is_pending()`.
pub struct Task<T, E = GatewayError> {
  receiver: Option<mpsc::UnboundedReceiver<Result<T, E>>>,
}

impl<T: Send + 'static, E: Send + 'static> Default for Task<T, E> {
  fn default() -> Self {
    Self { receiver: None }
  }
}

impl<T: Send + 'static, E: Send + 'static> Task<T, E> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_pending(&self) -> bool {
    self.receiver.is_some()
  }

  /// Start `future` unless another run is pending. Returns whether it started.
  pub fn run<Fut>(&mut self, future: Fut) -> bool
  where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
    true
  }

  /// Take the result once it is ready.
  pub fn poll(&mut self) -> Option<Result<T, E>> {
    let receiver = self.receiver.as_mut()?;
    match receiver.try_recv() {
      Ok(result) => {
        self.receiver = None;
        Some(result)
      }
      Err(mpsc::error::TryRecvError::Empty) => None,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // The task panicked; nothing to report beyond clearing the pending flag.
        self.receiver = None;
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  /// A stand-in cache: a value plus a generation channel.
  #[derive(Clone)]
  struct Store {
    value: Arc<Mutex<Option<u32>>>,
    generation: Arc<watch::Sender<u64>>,
  }

  impl Store {
    fn new(initial: Option<u32>) -> Self {
      let (tx, _rx) = watch::channel(0);
      Self {
        value: Arc::new(Mutex::new(initial)),
        generation: Arc::new(tx),
      }
    }

    fn write(&self, value: u32) {
      *self.value.lock().unwrap() = Some(value);
      self.generation.send_modify(|g| *g += 1);
    }

    fn read(&self) -> Option<u32> {
      *self.value.lock().unwrap()
    }
  }

  fn query(store: &Store, policy: FetchPolicy, answer: Result<u32, GatewayError>) -> Query<u32> {
    let fetch_store = store.clone();
    let read_store = store.clone();
    Query::new(
      policy,
      store.generation.subscribe(),
      move |_token| {
        let store = fetch_store.clone();
        let answer = answer.clone();
        async move {
          tokio::time::sleep(Duration::from_millis(5)).await;
          answer.map(|v| store.write(v))
        }
      },
      move || read_store.read(),
    )
  }

  #[tokio::test]
  async fn test_cache_and_network_shows_cached_first() {
    let store = Store::new(Some(1));
    let mut q = query(&store, FetchPolicy::CacheAndNetwork, Ok(2));

    q.fetch();
    assert!(q.is_loading());
    assert_eq!(q.data(), Some(&1));

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(q.poll());
    assert_eq!(q.state(), &QueryState::Settled);
    assert_eq!(q.data(), Some(&2));
  }

  #[tokio::test]
  async fn test_network_only_hides_cache_until_settled() {
    let store = Store::new(Some(1));
    let mut q = query(&store, FetchPolicy::NetworkOnly, Ok(2));

    q.fetch();
    assert_eq!(q.data(), None);

    tokio::time::sleep(Duration::from_millis(30)).await;
    q.poll();
    assert_eq!(q.data(), Some(&2));
  }

  #[tokio::test]
  async fn test_error_keeps_cached_data() {
    let store = Store::new(Some(7));
    let mut q = query(
      &store,
      FetchPolicy::CacheAndNetwork,
      Err(GatewayError::Transport("down".into())),
    );

    q.fetch();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(q.poll());
    assert_eq!(q.error(), Some(&GatewayError::Transport("down".into())));
    assert_eq!(q.data(), Some(&7));
    assert_eq!(q.take_error(), Some(GatewayError::Transport("down".into())));
    assert_eq!(q.take_error(), None);
  }

  #[tokio::test]
  async fn test_follows_writes_made_elsewhere() {
    let store = Store::new(None);
    let mut q = query(&store, FetchPolicy::CacheAndNetwork, Ok(1));

    q.fetch();
    tokio::time::sleep(Duration::from_millis(30)).await;
    q.poll();
    assert_eq!(q.data(), Some(&1));

    store.write(5);
    assert!(q.poll());
    assert_eq!(q.data(), Some(&5));
    assert!(!q.poll());
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let store = Store::new(None);
    let mut q: Query<u32> = Query::new(
      FetchPolicy::NetworkOnly,
      store.generation.subscribe(),
      move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
      },
      || None,
    );

    q.fetch();
    q.fetch();
    q.fetch_more("t".into());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fetch_more_passes_token() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let store = Store::new(None);
    let mut q: Query<u32> = Query::new(
      FetchPolicy::CacheAndNetwork,
      store.generation.subscribe(),
      move |token| {
        log.lock().unwrap().push(token);
        async { Ok(()) }
      },
      || None,
    );

    q.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    q.poll();
    q.fetch_more("page-2".into());
    assert_eq!(q.state(), &QueryState::LoadingMore);

    assert_eq!(*seen.lock().unwrap(), vec![None, Some("page-2".to_string())]);
  }

  #[tokio::test]
  async fn test_task_runs_once_at_a_time() {
    let mut task: Task<u32> = Task::new();
    assert!(task.run(async {
      tokio::time::sleep(Duration::from_millis(5)).await;
      Ok(3)
    }));
    assert!(task.is_pending());
    assert!(!task.run(async { Ok(4) }));

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(task.poll(), Some(Ok(3)));
    assert!(!task.is_pending());
    assert_eq!(task.poll(), None);
  }
}
