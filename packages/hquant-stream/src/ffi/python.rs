use crate::engine::BarEngine;
use crate::error::HqError;
use crate::export::Segment;
use crate::host::IndicatorId;
use crate::indicator::{Band, IndicatorSpec, MacdLine};
use crate::shared::SharedEngine;
use crate::{Bar, Column, Field};
use numpy::ndarray::ArrayView1;
use numpy::PyArray1;
use pyo3::exceptions::{PyImportError, PyIndexError, PyKeyError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn to_py_err(e: HqError) -> PyErr {
    match e {
        HqError::IndexOutOfRange { .. } => PyIndexError::new_err(e.to_string()),
        HqError::UnknownIndicatorId(_) | HqError::UnknownIndicatorName(_) => {
            PyKeyError::new_err(e.to_string())
        }
        _ => PyValueError::new_err(e.to_string()),
    }
}

fn parse_field(field: Option<&str>) -> PyResult<Field> {
    match field {
        None => Ok(Field::Close),
        Some(s) => Field::parse(s)
            .ok_or_else(|| PyValueError::new_err(format!("unknown field: {s}"))),
    }
}

fn parse_band(band: &str) -> PyResult<Band> {
    match band {
        "upper" => Ok(Band::Upper),
        "middle" => Ok(Band::Middle),
        "lower" => Ok(Band::Lower),
        _ => Err(PyValueError::new_err(format!("unknown band: {band}"))),
    }
}

fn parse_macd_line(line: &str) -> PyResult<MacdLine> {
    match line {
        "macd" => Ok(MacdLine::Macd),
        "signal" => Ok(MacdLine::Signal),
        "histogram" => Ok(MacdLine::Histogram),
        _ => Err(PyValueError::new_err(format!("unknown MACD line: {line}"))),
    }
}

fn index(i: i64, len: usize) -> PyResult<usize> {
    usize::try_from(i).map_err(|_| to_py_err(HqError::IndexOutOfRange { index: i, len }))
}

/// Bar series with incremental indicators.
///
/// Arrays returned by `column_slices` borrow the series' memory and are read-only.
/// They are only meaningful until the next `push_bar` / `amend_last_bar`; compare
/// `generation()` to detect a mutation.
#[pyclass(unsendable)]
pub struct BarSeries {
    inner: SharedEngine,
}

impl BarSeries {
    fn add(&self, name: &str, spec: IndicatorSpec) -> PyResult<u32> {
        self.inner
            .add_indicator(name, &spec)
            .map(|id| id.0)
            .map_err(to_py_err)
    }
}

#[pymethods]
impl BarSeries {
    #[new]
    fn new(capacity: usize) -> PyResult<Self> {
        let engine = BarEngine::new(capacity).map_err(to_py_err)?;
        Ok(Self {
            inner: SharedEngine::new(engine),
        })
    }

    #[pyo3(signature = (timestamp, open, high, low, close, volume, buy_volume=None))]
    fn push_bar(
        &self,
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        buy_volume: Option<f64>,
    ) -> PyResult<()> {
        let bar = Bar::new(timestamp, open, high, low, close, volume, buy_volume.unwrap_or(0.0));
        self.inner.push(bar).map_err(to_py_err)
    }

    #[pyo3(signature = (timestamp, open, high, low, close, volume, buy_volume=None))]
    fn amend_last_bar(
        &self,
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        buy_volume: Option<f64>,
    ) -> PyResult<()> {
        let bar = Bar::new(timestamp, open, high, low, close, volume, buy_volume.unwrap_or(0.0));
        self.inner.amend_last(bar).map(|_| ()).map_err(to_py_err)
    }

    #[pyo3(signature = (name, period, field=None))]
    fn add_sma(&self, name: &str, period: usize, field: Option<&str>) -> PyResult<u32> {
        let field = parse_field(field)?;
        self.add(name, IndicatorSpec::Sma { period, field })
    }

    #[pyo3(signature = (name, period, field=None))]
    fn add_ema(&self, name: &str, period: usize, field: Option<&str>) -> PyResult<u32> {
        let field = parse_field(field)?;
        self.add(name, IndicatorSpec::Ema { period, field })
    }

    #[pyo3(signature = (name, period, field=None))]
    fn add_stddev(&self, name: &str, period: usize, field: Option<&str>) -> PyResult<u32> {
        let field = parse_field(field)?;
        self.add(name, IndicatorSpec::StdDev { period, field })
    }

    fn add_rsi(&self, name: &str, period: usize) -> PyResult<u32> {
        self.add(name, IndicatorSpec::Rsi { period })
    }

    fn add_atr(&self, name: &str, period: usize) -> PyResult<u32> {
        self.add(name, IndicatorSpec::Atr { period })
    }

    fn add_vri(&self, name: &str, period: usize) -> PyResult<u32> {
        self.add(name, IndicatorSpec::Vri { period })
    }

    #[pyo3(signature = (name, period, k=2.0, band="middle", field=None))]
    fn add_boll(
        &self,
        name: &str,
        period: usize,
        k: f64,
        band: &str,
        field: Option<&str>,
    ) -> PyResult<u32> {
        let spec = IndicatorSpec::Boll {
            period,
            k,
            band: parse_band(band)?,
            field: parse_field(field)?,
        };
        self.add(name, spec)
    }

    #[pyo3(signature = (name, fast=12, slow=26, signal=9, line="macd", field=None))]
    fn add_macd(
        &self,
        name: &str,
        fast: usize,
        slow: usize,
        signal: usize,
        line: &str,
        field: Option<&str>,
    ) -> PyResult<u32> {
        let spec = IndicatorSpec::Macd {
            fast,
            slow,
            signal,
            line: parse_macd_line(line)?,
            field: parse_field(field)?,
        };
        self.add(name, spec)
    }

    /// Returns `(value, available)`.
    fn get_value(&self, id: u32, i: i64) -> PyResult<(f64, bool)> {
        self.inner.read(|e| {
            let ind = e.indicators().indicator(IndicatorId(id)).map_err(to_py_err)?;
            let v = ind.get_value(index(i, ind.len())?).map_err(to_py_err)?;
            Ok((v.value, v.available))
        })
    }

    fn get_bar<'py>(&self, py: Python<'py>, i: i64) -> PyResult<Bound<'py, PyDict>> {
        let bar = self.inner.read(|e| {
            let i = index(i, e.len())?;
            e.get(i).map_err(to_py_err)
        })?;
        let d = PyDict::new_bound(py);
        d.set_item("timestamp", bar.timestamp)?;
        for f in Field::ALL {
            d.set_item(f.as_str(), bar.field(f))?;
        }
        Ok(d)
    }

    fn __len__(&self) -> usize {
        self.inner.read(|e| e.len())
    }

    fn generation(&self) -> u64 {
        self.inner.generation()
    }

    fn metadata<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let m = self.inner.meta();
        let d = PyDict::new_bound(py);
        d.set_item("capacity", m.capacity)?;
        d.set_item("head", m.head)?;
        d.set_item("count", m.count)?;
        d.set_item("generation", m.generation)?;
        Ok(d)
    }

    /// Zero-copy `(first, second)` views of one column; `first` then `second`
    /// is chronological order.
    fn column_slices<'py>(
        slf: PyRef<'py, Self>,
        py: Python<'py>,
        name: &str,
    ) -> PyResult<(Bound<'py, PyAny>, Bound<'py, PyAny>)> {
        // The `numpy` crate needs the Python `numpy` package; fail with an exception
        // rather than a panic inside its C-API init.
        py.import_bound("numpy")
            .map_err(|e| PyImportError::new_err(format!("numpy is required for column_slices(): {e}")))?;

        let column = Column::parse(name)
            .ok_or_else(|| PyValueError::new_err(format!("unknown column: {name}")))?;
        let desc = slf.inner.read(|e| e.exporter().column(column));
        let base = slf.into_py(py).into_bound(py);

        let readonly = PyDict::new_bound(py);
        readonly.set_item("write", false)?;
        let view = |seg: Segment| -> PyResult<Bound<'py, PyAny>> {
            // SAFETY: the store's column arrays are allocated once and never move;
            // `base` keeps the owning object alive for the array's lifetime.
            let arr = unsafe {
                if column == Column::Timestamp {
                    let v = ArrayView1::from_shape_ptr(seg.len, seg.ptr.cast::<i64>());
                    PyArray1::borrow_from_array_bound(&v, base.clone()).into_any()
                } else {
                    let v = ArrayView1::from_shape_ptr(seg.len, seg.ptr.cast::<f64>());
                    PyArray1::borrow_from_array_bound(&v, base.clone()).into_any()
                }
            };
            arr.call_method("setflags", (), Some(&readonly))?;
            Ok(arr)
        };
        Ok((view(desc.first)?, view(desc.second)?))
    }
}

#[pymodule]
fn hquant_stream(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<BarSeries>()?;
    Ok(())
}
