use hquant_stream::config::EngineConfig;
use hquant_stream::indicator::IndicatorSpec;
use hquant_stream::{BarEngine, Bar, Column, Field};
use tracing_subscriber::EnvFilter;

// RUST_LOG=hquant_stream=debug cargo run --example basic

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = EngineConfig::from_env()?
        .with_indicator("rsi14", IndicatorSpec::Rsi { period: 14 })
        .with_indicator(
            "ema20",
            IndicatorSpec::Ema {
                period: 20,
                field: Field::Close,
            },
        )
        .with_indicator("atr14", IndicatorSpec::Atr { period: 14 });
    let mut engine = BarEngine::from_config(&cfg)?;

    for i in 0..200i64 {
        let close = 100.0 + (i as f64 * 0.1).sin() * 5.0;
        engine.push(Bar::new(
            i * 60_000,
            close - 0.2,
            close + 0.5,
            close - 0.5,
            close,
            1000.0 + (i % 10) as f64 * 50.0,
            500.0,
        ))?;
    }

    // The newest bar is still forming: revise it a few times.
    let mut last = engine.last().ok_or("empty engine")?;
    for tick in [0.3, -0.1, 0.25] {
        last.close += tick;
        last.high = last.high.max(last.close);
        last.low = last.low.min(last.close);
        engine.amend_last(last)?;
    }

    for (name, value) in engine.indicators().snapshot() {
        match value.and_then(|v| v.get()) {
            Some(v) => println!("{name:>6} = {v:.4}"),
            None => println!("{name:>6} = (warming up)"),
        }
    }

    let layout = engine.exporter().export();
    let close = layout.column(Column::Close);
    println!(
        "close column: {} + {} values, generation {}",
        close.first.len, close.second.len, layout.meta.generation
    );
    Ok(())
}
