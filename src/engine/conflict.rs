use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Validate a raw (start, end) pair before a Span is ever constructed.
/// The inverted/empty checks are caller mistakes; the range caps are
/// operational limits.
pub(crate) fn validate_window(start: Ms, end: Ms) -> Result<Span, EngineError> {
    use crate::limits::*;
    if start > end {
        return Err(EngineError::WindowInverted { start, end });
    }
    if start == end {
        return Err(EngineError::WindowEmpty(start));
    }
    if start < MIN_VALID_TIMESTAMP_MS || end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if end - start > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("booking window too wide"));
    }
    Ok(Span::new(start, end))
}

/// The overlap guard: a window may not overlap any APPROVED booking on the
/// item. WAITING bookings never block each other — only an approval claims
/// the window. `exclude` skips the booking being decided itself.
pub(crate) fn check_no_conflict(
    item: &ItemState,
    span: &Span,
    exclude: Option<ulid::Ulid>,
) -> Result<(), EngineError> {
    for booking in item.overlapping(span) {
        if booking.status != BookingStatus::Approved {
            continue;
        }
        if exclude == Some(booking.id) {
            continue;
        }
        return Err(EngineError::Conflict(booking.id));
    }
    Ok(())
}
