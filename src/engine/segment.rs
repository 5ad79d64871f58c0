use crate::model::*;

use super::EngineError;

/// The six listing views. Time views (Current/Past/Future) partition
/// bookings by their window against a single captured "now"; status views
/// (Waiting/Rejected) ignore time entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingState {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl ListingState {
    /// Map a query token onto a variant. Tokens are exact — `ALL`, not
    /// `all`. Anything else is the dedicated unknown-state failure, not a
    /// generic validation error.
    pub fn parse(token: &str) -> Result<Self, EngineError> {
        match token {
            "ALL" => Ok(ListingState::All),
            "CURRENT" => Ok(ListingState::Current),
            "PAST" => Ok(ListingState::Past),
            "FUTURE" => Ok(ListingState::Future),
            "WAITING" => Ok(ListingState::Waiting),
            "REJECTED" => Ok(ListingState::Rejected),
            other => Err(EngineError::UnknownState(other.to_string())),
        }
    }

    /// Whether a booking belongs to this view at instant `now`.
    /// The time comparisons are strict on both sides: a window straddling
    /// `now` is Current, a window touching it is in no time partition.
    pub fn matches(&self, booking: &Booking, now: Ms) -> bool {
        match self {
            ListingState::All => true,
            ListingState::Current => booking.span.start < now && now < booking.span.end,
            ListingState::Past => booking.span.end < now,
            ListingState::Future => booking.span.start > now,
            ListingState::Waiting => booking.status == BookingStatus::Waiting,
            ListingState::Rejected => booking.status == BookingStatus::Rejected,
        }
    }
}

/// Check offset/size and narrow them to usize. An offset past the end of
/// the result set is fine (empty page); a non-positive size is not.
pub(crate) fn validate_page(from: i64, size: i64) -> Result<(usize, usize), EngineError> {
    if from < 0 || size <= 0 {
        return Err(EngineError::InvalidPage { from, size });
    }
    if size > crate::limits::MAX_PAGE_SIZE {
        return Err(EngineError::LimitExceeded("page size too large"));
    }
    Ok((from as usize, size as usize))
}

/// Order a partition newest-start-first and slice the requested page.
/// The id tiebreak keeps pagination stable when two windows share a start.
pub(crate) fn order_and_page(
    mut views: Vec<BookingView>,
    from: usize,
    size: usize,
) -> Vec<BookingView> {
    views.sort_by(|a, b| b.start.cmp(&a.start).then(b.id.cmp(&a.id)));
    views.into_iter().skip(from).take(size).collect()
}
