use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    #[allow(dead_code)]
    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// Lifecycle of a booking. WAITING is the only initial state; the single
/// transition out of it is owner approval or rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Waiting,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Waiting => "WAITING",
            BookingStatus::Approved => "APPROVED",
            BookingStatus::Rejected => "REJECTED",
        }
    }
}

/// A single reservation of an item by a booker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub booker_id: Ulid,
    pub span: Span,
    pub status: BookingStatus,
}

/// A comment left on an item after a completed rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Ulid,
    pub author_id: Ulid,
    pub text: String,
    pub created_at: Ms,
}

/// Flat user record. Users carry no interior mutable state beyond their
/// profile fields, so they live directly in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Ulid,
    pub name: String,
    pub email: String,
}

/// Per-item state: the item's catalog fields plus every booking and comment
/// attached to it. Bookings are kept sorted by `span.start`.
#[derive(Debug, Clone)]
pub struct ItemState {
    pub id: Ulid,
    pub owner_id: Ulid,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub bookings: Vec<Booking>,
    pub comments: Vec<Comment>,
}

impl ItemState {
    pub fn new(id: Ulid, owner_id: Ulid, name: String, description: String, available: bool) -> Self {
        Self {
            id,
            owner_id,
            name,
            description,
            available,
            bookings: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Insert booking maintaining sort order by span.start.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.span.start, |b| b.span.start)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn booking(&self, id: Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn booking_mut(&mut self, id: Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// Return only bookings whose span overlaps the query window.
    /// Uses binary search to skip bookings starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        // Everything at index >= right_bound starts at or after query.end → can't overlap.
        let right_bound = self
            .bookings
            .partition_point(|b| b.span.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span.end > query.start)
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    UserCreated {
        id: Ulid,
        name: String,
        email: String,
    },
    UserUpdated {
        id: Ulid,
        name: String,
        email: String,
    },
    ItemCreated {
        id: Ulid,
        owner_id: Ulid,
        name: String,
        description: String,
        available: bool,
    },
    ItemUpdated {
        id: Ulid,
        name: String,
        description: String,
        available: bool,
    },
    BookingCreated {
        id: Ulid,
        item_id: Ulid,
        booker_id: Ulid,
        span: Span,
    },
    BookingDecided {
        id: Ulid,
        item_id: Ulid,
        approved: bool,
    },
    CommentAdded {
        id: Ulid,
        item_id: Ulid,
        author_id: Ulid,
        text: String,
        created_at: Ms,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: Ulid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfo {
    pub id: Ulid,
    pub owner_id: Ulid,
    pub name: String,
    pub description: String,
    pub available: bool,
    /// Latest non-rejected booking window starting before the query instant.
    pub last: Option<Span>,
    /// Earliest non-rejected booking window starting after the query instant.
    pub next: Option<Span>,
}

/// A booking together with its booker and item summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingView {
    pub id: Ulid,
    pub start: Ms,
    pub end: Ms,
    pub status: BookingStatus,
    pub booker_id: Ulid,
    pub booker_name: String,
    pub item_id: Ulid,
    pub item_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub id: Ulid,
    pub item_id: Ulid,
    pub author_id: Ulid,
    pub author_name: String,
    pub text: String,
    pub created_at: Ms,
}
