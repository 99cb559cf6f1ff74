//! Streaming bar store with incremental indicators and zero-copy export.
//!
//! - [`store::ColumnStore`]: fixed-capacity columnar ring buffer of bars
//! - [`indicator`]: incremental indicators with exact amend of the newest bar
//! - [`host::IndicatorHost`]: named indicators fed by store events
//! - [`export::ZeroCopyExporter`]: per-column `(first, second)` views for bulk readers
//! - [`engine::BarEngine`] / [`shared::SharedEngine`]: single-writer runtime and
//!   its lock-protected, generation-counted handle
//! - [`ffi`]: C ABI, plus a Python module behind the `ffi-python` feature
//!
//! ```
//! use hquant_stream::engine::BarEngine;
//! use hquant_stream::indicator::IndicatorSpec;
//! use hquant_stream::{Bar, Field};
//!
//! let mut engine = BarEngine::new(3).unwrap();
//! let ma = engine
//!     .add_indicator("ma2", &IndicatorSpec::Sma { period: 2, field: Field::Close })
//!     .unwrap();
//! for (ts, close) in [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)] {
//!     engine.push(Bar::flat(ts, close, 1.0)).unwrap();
//! }
//! let closes = engine.store().close_ordered_slices();
//! assert_eq!((closes.first, closes.second), (&[20.0, 30.0][..], &[40.0][..]));
//! assert_eq!(engine.get_value(ma, 2).unwrap().value, 35.0);
//! ```

mod types;
pub use types::*;

pub mod circular;
pub mod error;
pub mod store;

pub mod indicator;
pub mod host;

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod export;
pub mod shared;

pub mod ffi;

pub use engine::BarEngine;
pub use error::{HqError, HqStatus};
pub use host::IndicatorId;
pub use shared::SharedEngine;
