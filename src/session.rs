//! Streaming session: the owner of every book and cache for one connection.
//!
//! A [`StreamSession`] takes parsed [`StreamMessage`]s one at a time and
//! routes them to the right book or cache. Each message is handled
//! synchronously and runs to completion; the only suspension point is the
//! wait for the next inbound message in [`StreamSession::run`].
//!
//! # Example
//!
//! ```rust
//! use orderbook_stream::session::StreamSession;
//! use orderbook_stream::types::{BookMessage, StreamMessage};
//! use orderbook_stream::Config;
//! use serde_json::json;
//!
//! let mut session = StreamSession::new(Config::new()).unwrap();
//! session.subscribe_order_book("BTC/USDT");
//!
//! let mut snapshot = BookMessage::new("BTC/USDT");
//! snapshot.bids = vec![json!(["100", "1"])];
//! snapshot.asks = vec![json!(["101", "2"])];
//! session.handle(StreamMessage::Snapshot(snapshot)).unwrap();
//!
//! let view = session.order_book("BTC/USDT", Some(5)).unwrap();
//! assert_eq!(view.bids.len(), 1);
//! ```

use rustc_hash::FxHashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{ArrayCache, ArrayCacheBySymbolById, ArrayCacheByTimestamp};
use crate::config::Config;
use crate::error::Error;
use crate::orderbook::{
    BookKind, BookRegistry, BookState, BookView, DeltaOutcome, GapPolicy, Permissive, UpdateReport,
};
use crate::types::messages::CandleMsg;
use crate::types::{Ohlcv, Order, StreamMessage, Trade};

/// What handling a message did
#[derive(Debug)]
pub enum SessionEvent {
    /// A book snapshot or delta batch was applied
    BookUpdated {
        /// Market symbol
        symbol: String,
        /// Applied and rejected deltas
        report: UpdateReport,
    },
    /// A trade was cached
    TradeStored {
        /// Market symbol
        symbol: String,
    },
    /// An order update was cached
    OrderStored {
        /// Market symbol
        symbol: String,
    },
    /// A candle was cached
    CandleStored {
        /// Market symbol
        symbol: String,
        /// Candle timeframe
        timeframe: String,
    },
    /// The message was dropped (untracked symbol, unsynchronized or stale
    /// book)
    Ignored,
}

/// Owner of the per-symbol books and caches of one stream connection
///
/// Books are created on subscribe (or on the first snapshot for a symbol)
/// and dropped on unsubscribe or disconnect. Trade and candle caches are
/// created on the first record for a symbol.
#[derive(Debug)]
pub struct StreamSession {
    config: Config,
    policy: Box<dyn GapPolicy>,
    books: BookRegistry,
    trades: FxHashMap<String, ArrayCache<Trade>>,
    orders: ArrayCacheBySymbolById<Order>,
    ohlcv: FxHashMap<(String, String), ArrayCacheByTimestamp<Ohlcv>>,
}

impl StreamSession {
    /// Create a session that applies every delta (no gap detection)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::with_policy(config, Permissive)
    }

    /// Create a session with a gap policy for delta batches
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_policy(config: Config, policy: impl GapPolicy + 'static) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            books: BookRegistry::new(config.require_snapshot()),
            orders: ArrayCacheBySymbolById::new(config.orders_limit()),
            trades: FxHashMap::default(),
            ohlcv: FxHashMap::default(),
            policy: Box::new(policy),
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start tracking a book with the configured kind and depth
    pub fn subscribe_order_book(&mut self, symbol: impl Into<String>) -> bool {
        let (kind, depth) = (self.config.book_kind(), self.config.book_depth());
        self.subscribe_order_book_with(symbol, kind, depth)
    }

    /// Start tracking a book with an explicit kind and depth
    ///
    /// Returns `false` if the symbol is already tracked.
    pub fn subscribe_order_book_with(
        &mut self,
        symbol: impl Into<String>,
        kind: BookKind,
        depth: Option<usize>,
    ) -> bool {
        self.books.add_market(symbol, kind, depth)
    }

    /// Stop tracking a symbol: drops its book, trades and candles
    pub fn unsubscribe(&mut self, symbol: &str) {
        self.books.remove_market(symbol);
        self.trades.remove(symbol);
        self.ohlcv.retain(|(s, _), _| s != symbol);
        info!(symbol = %symbol, "unsubscribed");
    }

    /// Drop a book's state until the next snapshot arrives
    ///
    /// For exchange layers that detect gaps themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSymbol`] if the book is not tracked.
    pub fn request_resync(&mut self, symbol: &str) -> Result<(), Error> {
        self.books.mark_needs_resync(symbol)
    }

    /// Drop every book and cache
    pub fn disconnect(&mut self) {
        self.books.clear();
        self.trades.clear();
        self.orders.clear();
        self.ohlcv.clear();
        info!("session disconnected");
    }

    /// Route one message
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequenceGap`] when the gap policy rejects a delta
    /// batch. The book is then waiting for a snapshot; the session itself
    /// stays usable.
    pub fn handle(&mut self, message: StreamMessage) -> Result<SessionEvent, Error> {
        match message {
            StreamMessage::Snapshot(snapshot) => {
                let report = self.books.apply_snapshot(
                    &snapshot,
                    self.config.book_kind(),
                    self.config.book_depth(),
                );
                Ok(SessionEvent::BookUpdated {
                    symbol: snapshot.symbol,
                    report,
                })
            }
            StreamMessage::Delta(delta) => {
                match self.books.apply_delta(&delta, self.policy.as_ref())? {
                    DeltaOutcome::Applied(report) => Ok(SessionEvent::BookUpdated {
                        symbol: delta.symbol,
                        report,
                    }),
                    DeltaOutcome::Untracked | DeltaOutcome::NotSynchronized | DeltaOutcome::Stale => {
                        Ok(SessionEvent::Ignored)
                    }
                }
            }
            StreamMessage::Trade(trade) => {
                let symbol = trade.symbol.clone();
                let limit = self.config.trades_limit();
                self.trades
                    .entry(symbol.clone())
                    .or_insert_with(|| ArrayCache::new(limit))
                    .append(trade);
                Ok(SessionEvent::TradeStored { symbol })
            }
            StreamMessage::Order(order) => {
                let symbol = order.symbol.clone();
                self.orders.append(order);
                Ok(SessionEvent::OrderStored { symbol })
            }
            StreamMessage::Ohlcv(CandleMsg { timeframe, candle }) => {
                let symbol = candle.symbol.clone();
                let limit = self.config.ohlcv_limit();
                self.ohlcv
                    .entry((symbol.clone(), timeframe.clone()))
                    .or_insert_with(|| ArrayCacheByTimestamp::new(limit))
                    .append(candle);
                Ok(SessionEvent::CandleStored { symbol, timeframe })
            }
        }
    }

    /// Top `limit` levels of a book
    pub fn order_book(&self, symbol: &str, limit: Option<usize>) -> Option<BookView> {
        self.books.view(symbol, limit)
    }

    /// Sync state of a book
    pub fn book_state(&self, symbol: &str) -> Option<BookState> {
        self.books.get_state(symbol)
    }

    /// Symbols whose books are waiting for a snapshot
    pub fn markets_needing_resync(&self) -> Vec<String> {
        self.books.markets_needing_resync()
    }

    /// Borrow the book registry
    pub fn books(&self) -> &BookRegistry {
        &self.books
    }

    /// Trades received for `symbol` since the last call, at most `limit`
    pub fn trades(&mut self, symbol: &str, limit: Option<usize>) -> Vec<Trade> {
        let Some(cache) = self.trades.get_mut(symbol) else {
            return Vec::new();
        };
        let n = cache.get_limit(Some(symbol), limit);
        cache.tail(Some(symbol), n).into_iter().cloned().collect()
    }

    /// Order updates since the last call, for one symbol or all
    pub fn orders(&mut self, symbol: Option<&str>, limit: Option<usize>) -> Vec<Order> {
        let n = self.orders.get_limit(symbol, limit);
        self.orders.tail(symbol, n).into_iter().cloned().collect()
    }

    /// Candles updated since the last call for a symbol and timeframe
    pub fn ohlcv(&mut self, symbol: &str, timeframe: &str, limit: Option<usize>) -> Vec<Ohlcv> {
        let key = (symbol.to_string(), timeframe.to_string());
        let Some(cache) = self.ohlcv.get_mut(&key) else {
            return Vec::new();
        };
        let n = cache.get_limit(Some(symbol), limit);
        cache.tail(n).into_iter().cloned().collect()
    }

    /// Drive the session from an inbound channel
    ///
    /// Handles messages until `inbound` closes and publishes the full view
    /// of every book that changed to `updates`. Sequence gaps and rejected
    /// deltas are logged and processing continues. Returns the session so
    /// the caller can inspect or reuse it.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<StreamMessage>,
        updates: broadcast::Sender<BookView>,
    ) -> Self {
        while let Some(message) = inbound.recv().await {
            match self.handle(message) {
                Ok(SessionEvent::BookUpdated { symbol, .. }) => {
                    if let Some(view) = self.books.view(&symbol, None) {
                        // no receivers is fine
                        let _ = updates.send(view);
                    }
                }
                Ok(_) => {}
                Err(Error::SequenceGap { expected, got }) => {
                    warn!(expected, got, "book needs resync");
                }
                Err(e) => warn!(error = %e, "failed to handle message"),
            }
        }
        debug!("inbound channel closed");
        self
    }

    /// Spawn [`StreamSession::run`] on the tokio runtime
    ///
    /// Returns the task handle and a receiver for book updates. Must be
    /// called from within a tokio runtime.
    pub fn spawn(
        self,
        inbound: mpsc::Receiver<StreamMessage>,
    ) -> (JoinHandle<StreamSession>, broadcast::Receiver<BookView>) {
        let (tx, rx) = broadcast::channel(self.config.update_channel_capacity());
        let handle = tokio::spawn(self.run(inbound, tx));
        (handle, rx)
    }
}
