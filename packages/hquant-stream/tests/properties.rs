use hquant_stream::indicator::{Band, IndicatorSpec, IndicatorValue, MacdLine};
use hquant_stream::store::ColumnStore;
use hquant_stream::{BarEngine, Bar, Column, Field, HqError};
use proptest::prelude::*;

fn bar(ts: i64, close: f64) -> Bar {
    Bar::new(ts, close, close + 1.0, close - 1.0, close, 10.0 + close.abs(), 1.0)
}

fn closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..1000.0, 0..64)
}

fn all_specs(period: usize) -> Vec<IndicatorSpec> {
    vec![
        IndicatorSpec::Sma {
            period,
            field: Field::Close,
        },
        IndicatorSpec::Ema {
            period,
            field: Field::Close,
        },
        IndicatorSpec::StdDev {
            period,
            field: Field::High,
        },
        IndicatorSpec::Rsi { period },
        IndicatorSpec::Atr { period },
        IndicatorSpec::Vri {
            period: period.max(2),
        },
        IndicatorSpec::Boll {
            period,
            k: 2.0,
            band: Band::Upper,
            field: Field::Close,
        },
        IndicatorSpec::Macd {
            fast: period,
            slow: period + 2,
            signal: period,
            line: MacdLine::Histogram,
            field: Field::Close,
        },
    ]
}

/// Prices mixing huge and ordinary magnitudes.
fn mixed_magnitudes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop_oneof![1e12f64..1e13, 0.5f64..10.0], 1..80)
}

/// Mean and population standard deviation, summed in window order.
fn mean_std(w: &[f64]) -> (f64, f64) {
    let n = w.len() as f64;
    let mean = w.iter().sum::<f64>() / n;
    let var = w.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn values(engine: &BarEngine) -> Vec<Vec<IndicatorValue>> {
    engine
        .indicators()
        .ids()
        .map(|id| {
            (0..engine.len())
                .map(|i| engine.get_value(id, i).unwrap())
                .collect()
        })
        .collect()
}

fn same_bits(a: &[Vec<IndicatorValue>], b: &[Vec<IndicatorValue>]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.len() == y.len()
                && x.iter().zip(y).all(|(p, q)| {
                    p.available == q.available && p.value.to_bits() == q.value.to_bits()
                })
        })
}

proptest! {
    /// Retained bars are always the last min(n, capacity) pushed, in order.
    #[test]
    fn retains_newest_bars_in_order(cap in 1usize..16, data in closes()) {
        let mut store = ColumnStore::new(cap).unwrap();
        for (i, c) in data.iter().enumerate() {
            store.push(bar(i as i64, *c)).unwrap();
        }
        let keep = data.len().min(cap);
        prop_assert_eq!(store.len(), keep);
        let expected = &data[data.len() - keep..];
        let got: Vec<f64> = store.iter().map(|b| b.close).collect();
        prop_assert_eq!(&got[..], expected);
        prop_assert_eq!(store.meta().generation, data.len() as u64);
    }

    /// Concatenated slices equal the logical sequence; they split only on wrap.
    #[test]
    fn slices_reproduce_logical_order(cap in 1usize..16, data in closes()) {
        let mut store = ColumnStore::new(cap).unwrap();
        for (i, c) in data.iter().enumerate() {
            store.push(bar(i as i64, *c)).unwrap();
        }
        let pair = store.close_ordered_slices();
        let logical: Vec<f64> = (0..store.len()).map(|i| store.get(i).unwrap().close).collect();
        prop_assert_eq!(pair.to_vec(), logical);
        prop_assert_eq!(pair.len(), store.len());
        let oldest = (store.head() + cap - store.len()) % cap;
        prop_assert_eq!(pair.is_contiguous(), oldest + store.len() <= cap);
        prop_assert_eq!(store.timestamp_slices().to_vec().len(), store.len());
    }

    /// Index errors past the end, never silent garbage.
    #[test]
    fn out_of_range_reads_fail(cap in 1usize..8, n in 0usize..20, extra in 0usize..5) {
        let mut store = ColumnStore::new(cap).unwrap();
        for i in 0..n {
            store.push(bar(i as i64, 1.0)).unwrap();
        }
        let i = store.len() + extra;
        let is_out_of_range = matches!(store.get(i), Err(HqError::IndexOutOfRange { .. }));
        prop_assert!(is_out_of_range);
    }

    /// Amending only touches the newest bar.
    #[test]
    fn amend_is_isolated(cap in 1usize..12, data in prop::collection::vec(1.0f64..100.0, 1..40), v in 1.0f64..100.0) {
        let mut store = ColumnStore::new(cap).unwrap();
        for (i, c) in data.iter().enumerate() {
            store.push(bar(i as i64, *c)).unwrap();
        }
        let before: Vec<Bar> = store.iter().collect();
        let meta = store.meta();
        let last_ts = before[before.len() - 1].timestamp;
        store.amend_last(bar(last_ts, v)).unwrap();
        let after: Vec<Bar> = store.iter().collect();
        prop_assert_eq!(&after[..after.len() - 1], &before[..before.len() - 1]);
        prop_assert_eq!(after[after.len() - 1].close, v);
        prop_assert_eq!((store.len(), store.head()), (meta.count, meta.head));
    }

    /// Amending to other values and back restores every indicator bit for bit.
    #[test]
    fn amend_round_trip_is_exact(
        period in 1usize..6,
        data in prop::collection::vec(1.0f64..500.0, 1..40),
        detours in prop::collection::vec(1.0f64..500.0, 1..6),
    ) {
        let mut engine = BarEngine::new(16).unwrap();
        for (k, spec) in all_specs(period).iter().enumerate() {
            engine.add_indicator(&format!("ind{k}"), spec).unwrap();
        }
        for (i, c) in data.iter().enumerate() {
            engine.push(bar(i as i64, *c)).unwrap();
        }
        let original = engine.last().unwrap();
        let before = values(&engine);
        for d in &detours {
            engine.amend_last(bar(original.timestamp, *d)).unwrap();
        }
        engine.amend_last(original).unwrap();
        prop_assert!(same_bits(&before, &values(&engine)));
    }

    /// An amended stream matches a stream that pushed the final bar directly.
    #[test]
    fn amend_matches_direct_push(
        period in 1usize..6,
        data in prop::collection::vec(1.0f64..500.0, 2..40),
        first in 1.0f64..500.0,
    ) {
        let specs = all_specs(period);
        let mut amended = BarEngine::new(16).unwrap();
        let mut direct = BarEngine::new(16).unwrap();
        for (k, spec) in specs.iter().enumerate() {
            amended.add_indicator(&format!("ind{k}"), spec).unwrap();
            direct.add_indicator(&format!("ind{k}"), spec).unwrap();
        }
        let n = data.len();
        for (i, c) in data[..n - 1].iter().enumerate() {
            amended.push(bar(i as i64, *c)).unwrap();
            direct.push(bar(i as i64, *c)).unwrap();
        }
        let ts = (n - 1) as i64;
        amended.push(bar(ts, first)).unwrap();
        amended.amend_last(bar(ts, data[n - 1])).unwrap();
        direct.push(bar(ts, data[n - 1])).unwrap();
        prop_assert!(same_bits(&values(&amended), &values(&direct)));
    }

    /// Warm-up: value k is available exactly when enough bars preceded it.
    #[test]
    fn availability_follows_warmup(period in 1usize..8, data in prop::collection::vec(1.0f64..100.0, 0..30)) {
        let mut engine = BarEngine::new(64).unwrap();
        let sma = engine.add_indicator("sma", &IndicatorSpec::Sma { period, field: Field::Close }).unwrap();
        let rsi = engine.add_indicator("rsi", &IndicatorSpec::Rsi { period }).unwrap();
        for (i, c) in data.iter().enumerate() {
            engine.push(bar(i as i64, *c)).unwrap();
        }
        for k in 0..engine.len() {
            let v = engine.get_value(sma, k).unwrap();
            prop_assert_eq!(v.available, k + 1 >= period);
            prop_assert_eq!(v.value.is_nan(), !v.available);
            prop_assert_eq!(engine.get_value(rsi, k).unwrap().available, k + 1 > period);
        }
    }

    /// Exported descriptors rebuild exactly the store's chronological columns.
    #[test]
    fn export_matches_store(cap in 1usize..12, data in closes()) {
        let mut engine = BarEngine::new(cap).unwrap();
        for (i, c) in data.iter().enumerate() {
            engine.push(bar(i as i64, *c)).unwrap();
        }
        let layout = engine.exporter().export();
        prop_assert_eq!(layout.meta, engine.meta());
        let closes = unsafe { layout.column(Column::Close).as_f64_slices() };
        prop_assert_eq!(closes.to_vec(), engine.store().to_vec_ordered(Field::Close));
        let ts = unsafe { layout.column(Column::Timestamp).as_i64_slices() };
        prop_assert_eq!(ts.to_vec(), engine.store().timestamp_slices().to_vec());
    }

    /// SMA, StdDev and BOLL at every retained index equal a from-scratch
    /// computation over the bars `[pos - period + 1, pos]`, also long after
    /// huge values have left the window and old bars have been evicted.
    #[test]
    fn window_indicators_match_brute_force(
        cap in 1usize..24,
        period in 1usize..8,
        data in mixed_magnitudes(),
    ) {
        let mut engine = BarEngine::new(cap).unwrap();
        let sma = engine.add_indicator("sma", &IndicatorSpec::Sma { period, field: Field::Close }).unwrap();
        let sd = engine.add_indicator("sd", &IndicatorSpec::StdDev { period, field: Field::Close }).unwrap();
        let up = engine
            .add_indicator("up", &IndicatorSpec::Boll { period, k: 2.0, band: Band::Upper, field: Field::Close })
            .unwrap();
        for (i, c) in data.iter().enumerate() {
            engine.push(bar(i as i64, *c)).unwrap();
        }
        let n = data.len();
        let len = engine.len();
        for i in 0..len {
            let pos = n - len + i;
            let got = [sma, sd, up].map(|id| engine.get_value(id, i).unwrap());
            if pos + 1 < period {
                prop_assert!(got.iter().all(|v| !v.available));
                continue;
            }
            let w = &data[pos + 1 - period..=pos];
            let (mean, std) = mean_std(w);
            let tol = 1e-9 * (1.0 + w.iter().fold(0.0f64, |m, x| m.max(x.abs())));
            for (v, want) in got.iter().zip([mean, std, mean + 2.0 * std]) {
                prop_assert!(v.available);
                prop_assert!((v.value - want).abs() <= tol, "index {}: {} vs {}", i, v.value, want);
            }
        }
    }
}
