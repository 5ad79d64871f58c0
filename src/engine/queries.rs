use ulid::Ulid;

use crate::model::*;

use super::conflict::now_ms;
use super::segment::{ListingState, order_and_page, validate_page};
use super::{Engine, EngineError};

impl Engine {
    pub(super) fn booking_view(&self, item: &ItemState, booking: &Booking) -> BookingView {
        let booker_name = self
            .users
            .get(&booking.booker_id)
            .map(|u| u.name.clone())
            .unwrap_or_default();
        BookingView {
            id: booking.id,
            start: booking.span.start,
            end: booking.span.end,
            status: booking.status,
            booker_id: booking.booker_id,
            booker_name,
            item_id: item.id,
            item_name: item.name.clone(),
        }
    }

    pub fn get_user(&self, id: Ulid) -> Result<UserInfo, EngineError> {
        self.users
            .get(&id)
            .map(|u| {
                let u = u.value();
                UserInfo {
                    id: u.id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                }
            })
            .ok_or(EngineError::NotFound(id))
    }

    /// Single-booking read behind the authorization guard: only the booker
    /// and the item's owner see the booking; everyone else sees "not found".
    pub async fn get_booking(
        &self,
        caller_id: Ulid,
        booking_id: Ulid,
    ) -> Result<BookingView, EngineError> {
        let item_id = self
            .item_for_booking(&booking_id)
            .ok_or(EngineError::NotFound(booking_id))?;
        let state = self
            .get_item_state(&item_id)
            .ok_or(EngineError::NotFound(booking_id))?;
        let guard = state.read().await;
        let booking = guard
            .booking(booking_id)
            .ok_or(EngineError::NotFound(booking_id))?;
        if booking.booker_id != caller_id && guard.owner_id != caller_id {
            return Err(EngineError::NotFound(booking_id));
        }
        Ok(self.booking_view(&guard, booking))
    }

    /// The booker-side temporal view: every booking the user requested,
    /// segmented by `state_token`, newest start first.
    pub async fn list_as_booker(
        &self,
        booker_id: Ulid,
        state_token: &str,
        from: i64,
        size: i64,
    ) -> Result<Vec<BookingView>, EngineError> {
        let state = ListingState::parse(state_token)?;
        let (from, size) = validate_page(from, size)?;
        if !self.users.contains_key(&booker_id) {
            return Err(EngineError::NotFound(booker_id));
        }

        // One clock read per call — every partition comparison uses it.
        let now = now_ms();
        let mut views = Vec::new();
        let item_ids: Vec<Ulid> = self.items.iter().map(|e| *e.key()).collect();
        for item_id in item_ids {
            let Some(item) = self.get_item_state(&item_id) else {
                continue;
            };
            let guard = item.read().await;
            for booking in &guard.bookings {
                if booking.booker_id == booker_id && state.matches(booking, now) {
                    views.push(self.booking_view(&guard, booking));
                }
            }
        }

        Ok(order_and_page(views, from, size))
    }

    /// The owner-side temporal view: every booking on the user's items.
    pub async fn list_as_owner(
        &self,
        owner_id: Ulid,
        state_token: &str,
        from: i64,
        size: i64,
    ) -> Result<Vec<BookingView>, EngineError> {
        let state = ListingState::parse(state_token)?;
        let (from, size) = validate_page(from, size)?;
        if !self.users.contains_key(&owner_id) {
            return Err(EngineError::NotFound(owner_id));
        }

        let now = now_ms();
        let mut views = Vec::new();
        let item_ids = self
            .owner_items
            .get(&owner_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        for item_id in item_ids {
            let Some(item) = self.get_item_state(&item_id) else {
                continue;
            };
            let guard = item.read().await;
            for booking in &guard.bookings {
                if state.matches(booking, now) {
                    views.push(self.booking_view(&guard, booking));
                }
            }
        }

        Ok(order_and_page(views, from, size))
    }

    pub async fn get_item(&self, id: Ulid) -> Result<ItemInfo, EngineError> {
        let state = self
            .get_item_state(&id)
            .ok_or(EngineError::NotFound(id))?;
        let guard = state.read().await;
        let now = now_ms();
        Ok(item_info(&guard, now))
    }

    pub async fn list_items_by_owner(
        &self,
        owner_id: Ulid,
        from: i64,
        size: i64,
    ) -> Result<Vec<ItemInfo>, EngineError> {
        let (from, size) = validate_page(from, size)?;
        if !self.users.contains_key(&owner_id) {
            return Err(EngineError::NotFound(owner_id));
        }

        let now = now_ms();
        let mut infos = Vec::new();
        let item_ids = self
            .owner_items
            .get(&owner_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        for item_id in item_ids {
            let Some(item) = self.get_item_state(&item_id) else {
                continue;
            };
            let guard = item.read().await;
            infos.push(item_info(&guard, now));
        }

        infos.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(infos.into_iter().skip(from).take(size).collect())
    }

    /// Comments on an item, newest first.
    pub async fn list_comments(&self, item_id: Ulid) -> Result<Vec<CommentView>, EngineError> {
        let state = self
            .get_item_state(&item_id)
            .ok_or(EngineError::NotFound(item_id))?;
        let guard = state.read().await;
        let mut views: Vec<CommentView> = guard
            .comments
            .iter()
            .map(|c| {
                let author_name = self
                    .users
                    .get(&c.author_id)
                    .map(|u| u.name.clone())
                    .unwrap_or_default();
                CommentView {
                    id: c.id,
                    item_id: guard.id,
                    author_id: c.author_id,
                    author_name,
                    text: c.text.clone(),
                    created_at: c.created_at,
                }
            })
            .collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(views)
    }
}

/// Build the catalog view, including the schedule summary: the latest
/// non-rejected window starting before `now` and the earliest starting after.
fn item_info(item: &ItemState, now: Ms) -> ItemInfo {
    let last = item
        .bookings
        .iter()
        .filter(|b| b.status != BookingStatus::Rejected && b.span.start < now)
        .max_by_key(|b| b.span.start)
        .map(|b| b.span);
    let next = item
        .bookings
        .iter()
        .filter(|b| b.status != BookingStatus::Rejected && b.span.start > now)
        .min_by_key(|b| b.span.start)
        .map(|b| b.span);
    ItemInfo {
        id: item.id,
        owner_id: item.owner_id,
        name: item.name.clone(),
        description: item.description.clone(),
        available: item.available,
        last,
        next,
    }
}
