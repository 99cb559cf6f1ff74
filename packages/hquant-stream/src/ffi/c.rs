//! C ABI.
//!
//! Every entry point returns an [`HqStatus`] and writes results through
//! out-pointers. Panics never cross the boundary: they are caught and reported
//! as `HqStatus::Panic`. The message of the most recent failure on a handle is
//! available through [`hqs_last_error`].
//!
//! Pointers handed out by [`hqs_export`] point into the store and are valid
//! until the next `hqs_push_bar` / `hqs_amend_last_bar` on the same handle.
//! Compare [`hqs_generation`] before and after reading to detect a mutation.

use crate::engine::BarEngine;
use crate::error::{HqError, HqStatus};
use crate::export::ExportLayout;
use crate::host::IndicatorId;
use crate::indicator::{Band, IndicatorSpec, IndicatorValue, MacdLine};
use crate::shared::SharedEngine;
use crate::store::StoreMeta;
use crate::{Bar, Field};
use core::ffi::{c_char, CStr};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Opaque engine handle.
pub struct HqsHandle {
    engine: SharedEngine,
    last_error: Mutex<String>,
}

enum Failure {
    Core(HqError),
    Status(HqStatus),
}

impl From<HqError> for Failure {
    fn from(e: HqError) -> Self {
        Failure::Core(e)
    }
}

type CallResult = Result<(), Failure>;

/// Runs `f` against a live handle, catching panics and recording the failure
/// message on the handle.
unsafe fn call<F>(handle: *const HqsHandle, f: F) -> HqStatus
where
    F: FnOnce(&HqsHandle) -> CallResult,
{
    let Some(h) = handle.as_ref() else {
        return HqStatus::NullPointer;
    };
    let (status, message) = match panic::catch_unwind(AssertUnwindSafe(|| f(h))) {
        Ok(Ok(())) => return HqStatus::Ok,
        Ok(Err(Failure::Core(e))) => (e.status(), e.to_string()),
        Ok(Err(Failure::Status(s))) => (s, s.message().to_string()),
        Err(_) => {
            warn!("panic caught at the C boundary");
            (HqStatus::Panic, HqStatus::Panic.message().to_string())
        }
    };
    *h.last_error.lock() = message;
    status
}

unsafe fn write_out<T>(out: *mut T, value: T) -> CallResult {
    if out.is_null() {
        return Err(Failure::Status(HqStatus::NullPointer));
    }
    out.write(value);
    Ok(())
}

unsafe fn read_name<'a>(name: *const c_char) -> Result<&'a str, Failure> {
    if name.is_null() {
        return Err(Failure::Status(HqStatus::NullPointer));
    }
    CStr::from_ptr(name)
        .to_str()
        .map_err(|_| Failure::Status(HqStatus::InvalidUtf8))
}

fn logical_index(index: i64, len: usize) -> Result<usize, HqError> {
    usize::try_from(index).map_err(|_| HqError::IndexOutOfRange { index, len })
}

fn field_from_code(code: u8) -> Result<Field, HqError> {
    Field::from_u8(code)
        .ok_or_else(|| HqError::InvalidParameter(format!("unknown field code {code}")))
}

/// Creates an engine with room for `capacity` bars.
#[no_mangle]
pub unsafe extern "C" fn hqs_new(capacity: i64, out: *mut *mut HqsHandle) -> HqStatus {
    if out.is_null() {
        return HqStatus::NullPointer;
    }
    let created = panic::catch_unwind(|| {
        let capacity = usize::try_from(capacity).map_err(|_| HqError::CapacityInvalid)?;
        BarEngine::new(capacity)
    });
    match created {
        Ok(Ok(engine)) => {
            let handle = HqsHandle {
                engine: SharedEngine::new(engine),
                last_error: Mutex::new(String::new()),
            };
            out.write(Box::into_raw(Box::new(handle)));
            HqStatus::Ok
        }
        Ok(Err(e)) => e.status(),
        Err(_) => HqStatus::Panic,
    }
}

#[no_mangle]
pub unsafe extern "C" fn hqs_free(handle: *mut HqsHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Registers only once every argument has been checked, so a failed call
/// leaves the engine untouched.
unsafe fn add_indicator(
    handle: *const HqsHandle,
    name: *const c_char,
    out_id: *mut u32,
    spec: impl FnOnce() -> Result<IndicatorSpec, HqError>,
) -> HqStatus {
    call(handle, |h| {
        if out_id.is_null() {
            return Err(Failure::Status(HqStatus::NullPointer));
        }
        let name = read_name(name)?;
        let spec = spec()?;
        let id = h.engine.add_indicator(name, &spec)?;
        write_out(out_id, id.0)
    })
}

#[no_mangle]
pub unsafe extern "C" fn hqs_add_sma(
    handle: *const HqsHandle,
    name: *const c_char,
    field: u8,
    period: usize,
    out_id: *mut u32,
) -> HqStatus {
    add_indicator(handle, name, out_id, || {
        Ok(IndicatorSpec::Sma {
            period,
            field: field_from_code(field)?,
        })
    })
}

#[no_mangle]
pub unsafe extern "C" fn hqs_add_ema(
    handle: *const HqsHandle,
    name: *const c_char,
    field: u8,
    period: usize,
    out_id: *mut u32,
) -> HqStatus {
    add_indicator(handle, name, out_id, || {
        Ok(IndicatorSpec::Ema {
            period,
            field: field_from_code(field)?,
        })
    })
}

#[no_mangle]
pub unsafe extern "C" fn hqs_add_stddev(
    handle: *const HqsHandle,
    name: *const c_char,
    field: u8,
    period: usize,
    out_id: *mut u32,
) -> HqStatus {
    add_indicator(handle, name, out_id, || {
        Ok(IndicatorSpec::StdDev {
            period,
            field: field_from_code(field)?,
        })
    })
}

#[no_mangle]
pub unsafe extern "C" fn hqs_add_rsi(
    handle: *const HqsHandle,
    name: *const c_char,
    period: usize,
    out_id: *mut u32,
) -> HqStatus {
    add_indicator(handle, name, out_id, || Ok(IndicatorSpec::Rsi { period }))
}

#[no_mangle]
pub unsafe extern "C" fn hqs_add_atr(
    handle: *const HqsHandle,
    name: *const c_char,
    period: usize,
    out_id: *mut u32,
) -> HqStatus {
    add_indicator(handle, name, out_id, || Ok(IndicatorSpec::Atr { period }))
}

#[no_mangle]
pub unsafe extern "C" fn hqs_add_vri(
    handle: *const HqsHandle,
    name: *const c_char,
    period: usize,
    out_id: *mut u32,
) -> HqStatus {
    add_indicator(handle, name, out_id, || Ok(IndicatorSpec::Vri { period }))
}

/// `band`: 0 upper, 1 middle, 2 lower.
#[no_mangle]
pub unsafe extern "C" fn hqs_add_boll(
    handle: *const HqsHandle,
    name: *const c_char,
    field: u8,
    period: usize,
    k: f64,
    band: u8,
    out_id: *mut u32,
) -> HqStatus {
    add_indicator(handle, name, out_id, || {
        Ok(IndicatorSpec::Boll {
            period,
            k,
            band: Band::from_u8(band)
                .ok_or_else(|| HqError::InvalidParameter(format!("unknown band code {band}")))?,
            field: field_from_code(field)?,
        })
    })
}

/// `line`: 0 MACD line, 1 signal, 2 histogram. Computed on the close.
#[no_mangle]
pub unsafe extern "C" fn hqs_add_macd(
    handle: *const HqsHandle,
    name: *const c_char,
    fast: usize,
    slow: usize,
    signal: usize,
    line: u8,
    out_id: *mut u32,
) -> HqStatus {
    add_indicator(handle, name, out_id, || {
        Ok(IndicatorSpec::Macd {
            fast,
            slow,
            signal,
            line: MacdLine::from_u8(line)
                .ok_or_else(|| HqError::InvalidParameter(format!("unknown MACD line code {line}")))?,
            field: Field::Close,
        })
    })
}

/// Looks up an indicator id by its registered name.
#[no_mangle]
pub unsafe extern "C" fn hqs_indicator_id(
    handle: *const HqsHandle,
    name: *const c_char,
    out_id: *mut u32,
) -> HqStatus {
    call(handle, |h| {
        let name = read_name(name)?;
        let id = h
            .engine
            .read(|e| e.indicators().id_of(name))
            .ok_or_else(|| HqError::UnknownIndicatorName(name.to_string()))?;
        write_out(out_id, id.0)
    })
}

#[no_mangle]
pub unsafe extern "C" fn hqs_push_bar(handle: *const HqsHandle, bar: Bar) -> HqStatus {
    call(handle, |h| Ok(h.engine.push(bar)?))
}

#[no_mangle]
pub unsafe extern "C" fn hqs_amend_last_bar(handle: *const HqsHandle, bar: Bar) -> HqStatus {
    call(handle, |h| {
        h.engine.amend_last(bar)?;
        Ok(())
    })
}

#[no_mangle]
pub unsafe extern "C" fn hqs_get_bar(handle: *const HqsHandle, index: i64, out: *mut Bar) -> HqStatus {
    call(handle, |h| {
        let bar = h.engine.read(|e| {
            let i = logical_index(index, e.len())?;
            e.get(i)
        })?;
        write_out(out, bar)
    })
}

#[no_mangle]
pub unsafe extern "C" fn hqs_get_value(
    handle: *const HqsHandle,
    id: u32,
    index: i64,
    out: *mut IndicatorValue,
) -> HqStatus {
    call(handle, |h| {
        let value = h.engine.read(|e| {
            let indicator = e.indicators().indicator(IndicatorId(id))?;
            let i = logical_index(index, indicator.len())?;
            indicator.get_value(i)
        })?;
        write_out(out, value)
    })
}

#[no_mangle]
pub unsafe extern "C" fn hqs_metadata(handle: *const HqsHandle, out: *mut StoreMeta) -> HqStatus {
    call(handle, |h| write_out(out, h.engine.meta()))
}

/// Store generation; 0 for a null handle.
#[no_mangle]
pub unsafe extern "C" fn hqs_generation(handle: *const HqsHandle) -> u64 {
    handle.as_ref().map_or(0, |h| h.engine.generation())
}

/// Fills `out` with two descriptors per column.
#[no_mangle]
pub unsafe extern "C" fn hqs_export(handle: *const HqsHandle, out: *mut ExportLayout) -> HqStatus {
    call(handle, |h| {
        let layout = h.engine.read(|e| e.exporter().export());
        write_out(out, layout)
    })
}

/// Copies the last failure message of `handle` into `buf` (NUL-terminated,
/// truncated to `cap - 1` bytes) and returns the full message length.
#[no_mangle]
pub unsafe extern "C" fn hqs_last_error(handle: *const HqsHandle, buf: *mut c_char, cap: usize) -> usize {
    let Some(h) = handle.as_ref() else {
        return 0;
    };
    let message = h.last_error.lock();
    let bytes = message.as_bytes();
    if !buf.is_null() && cap > 0 {
        let n = bytes.len().min(cap - 1);
        core::ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), n);
        buf.add(n).write(0);
    }
    bytes.len()
}

/// Static description of a status code.
#[no_mangle]
pub extern "C" fn hqs_status_message(status: i32) -> *const c_char {
    match HqStatus::from_code(status) {
        Some(s) => s.message_with_nul().as_ptr().cast(),
        None => "unknown status\0".as_ptr().cast(),
    }
}
