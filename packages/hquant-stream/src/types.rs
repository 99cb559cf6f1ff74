use serde::{Deserialize, Serialize};

/// One OHLCV(+buy_volume) observation. `timestamp` is in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub buy_volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        buy_volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            buy_volume,
        }
    }

    /// Flat bar where open/high/low/close are all `price`.
    pub fn flat(timestamp: i64, price: f64, volume: f64) -> Self {
        Self::new(timestamp, price, price, price, price, volume, 0.0)
    }

    #[inline]
    pub fn field(&self, field: Field) -> f64 {
        match field {
            Field::Open => self.open,
            Field::High => self.high,
            Field::Low => self.low,
            Field::Close => self.close,
            Field::Volume => self.volume,
            Field::BuyVolume => self.buy_volume,
        }
    }

    /// First numeric field that is NaN or infinite.
    pub fn first_non_finite(&self) -> Option<Field> {
        Field::ALL.into_iter().find(|f| !self.field(*f).is_finite())
    }
}

/// Numeric bar fields (indicator inputs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Field {
    Open = 0,
    High = 1,
    Low = 2,
    #[default]
    Close = 3,
    Volume = 4,
    BuyVolume = 5,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
        Field::BuyVolume,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
            Field::BuyVolume => "buy_volume",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl core::fmt::Display for Field {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored columns in storage order: the timestamp column followed by the six fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Column {
    Timestamp = 0,
    Open = 1,
    High = 2,
    Low = 3,
    Close = 4,
    Volume = 5,
    BuyVolume = 6,
}

impl Column {
    pub const COUNT: usize = 7;

    pub const ALL: [Column; Column::COUNT] = [
        Column::Timestamp,
        Column::Open,
        Column::High,
        Column::Low,
        Column::Close,
        Column::Volume,
        Column::BuyVolume,
    ];

    /// The numeric field behind this column (`None` for timestamps).
    pub fn field(&self) -> Option<Field> {
        match self {
            Column::Timestamp => None,
            Column::Open => Some(Field::Open),
            Column::High => Some(Field::High),
            Column::Low => Some(Field::Low),
            Column::Close => Some(Field::Close),
            Column::Volume => Some(Field::Volume),
            Column::BuyVolume => Some(Field::BuyVolume),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("timestamp") {
            return Some(Column::Timestamp);
        }
        Field::parse(s).map(Column::from)
    }
}

impl From<Field> for Column {
    fn from(f: Field) -> Self {
        match f {
            Field::Open => Column::Open,
            Field::High => Column::High,
            Field::Low => Column::Low,
            Field::Close => Column::Close,
            Field::Volume => Column::Volume,
            Field::BuyVolume => Column::BuyVolume,
        }
    }
}

/// Imports bars from a JSON array. Numeric fields may be numbers or numeric strings
/// (exchange REST payloads often quote prices); unparsable values become NaN and are
/// rejected later by store validation.
pub fn parse_bars_json(json: &str) -> Result<Vec<Bar>, serde_json::Error> {
    #[derive(Deserialize)]
    struct BarIn {
        timestamp: i64,
        open: serde_json::Value,
        high: serde_json::Value,
        low: serde_json::Value,
        close: serde_json::Value,
        volume: serde_json::Value,
        #[serde(default)]
        buy_volume: Option<serde_json::Value>,
    }

    fn to_f64(v: &serde_json::Value) -> f64 {
        match v {
            serde_json::Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
            serde_json::Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    let raw: Vec<BarIn> = serde_json::from_str(json)?;
    Ok(raw
        .iter()
        .map(|b| Bar {
            timestamp: b.timestamp,
            open: to_f64(&b.open),
            high: to_f64(&b.high),
            low: to_f64(&b.low),
            close: to_f64(&b.close),
            volume: to_f64(&b.volume),
            buy_volume: b.buy_volume.as_ref().map(to_f64).unwrap_or(0.0),
        })
        .collect())
}
