use std::sync::Arc;

use tokio::sync::{RwLock, oneshot};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, now_ms, validate_window};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    pub async fn create_user(
        &self,
        id: Ulid,
        name: String,
        email: String,
    ) -> Result<UserInfo, EngineError> {
        if self.users.len() >= MAX_USERS_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many users"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("user name too long"));
        }
        if email.len() > MAX_EMAIL_LEN {
            return Err(EngineError::LimitExceeded("email too long"));
        }
        if self.users.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let event = Event::UserCreated {
            id,
            name: name.clone(),
            email: email.clone(),
        };
        self.wal_append(&event).await?;
        self.users.insert(id, UserRecord { id, name, email });
        Ok(self.get_user(id)?)
    }

    pub async fn update_user(
        &self,
        id: Ulid,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<UserInfo, EngineError> {
        let current = self
            .users
            .get(&id)
            .map(|u| u.value().clone())
            .ok_or(EngineError::NotFound(id))?;
        let name = name.unwrap_or(current.name);
        let email = email.unwrap_or(current.email);
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("user name too long"));
        }
        if email.len() > MAX_EMAIL_LEN {
            return Err(EngineError::LimitExceeded("email too long"));
        }

        let event = Event::UserUpdated {
            id,
            name: name.clone(),
            email: email.clone(),
        };
        self.wal_append(&event).await?;
        self.users.insert(id, UserRecord { id, name, email });
        Ok(self.get_user(id)?)
    }

    pub async fn create_item(
        &self,
        id: Ulid,
        owner_id: Ulid,
        name: String,
        description: String,
        available: bool,
    ) -> Result<(), EngineError> {
        if self.items.len() >= MAX_ITEMS_PER_TENANT {
            return Err(EngineError::LimitExceeded("too many items"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("item name too long"));
        }
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(EngineError::LimitExceeded("item description too long"));
        }
        if !self.users.contains_key(&owner_id) {
            return Err(EngineError::NotFound(owner_id));
        }
        if self.items.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let event = Event::ItemCreated {
            id,
            owner_id,
            name: name.clone(),
            description: description.clone(),
            available,
        };
        self.wal_append(&event).await?;
        let state = ItemState::new(id, owner_id, name, description, available);
        self.items.insert(id, Arc::new(RwLock::new(state)));
        self.owner_items.entry(owner_id).or_default().push(id);
        self.notify.send(id, &event);
        Ok(())
    }

    /// Owner-only item update. A non-owner caller gets NotFound on the item,
    /// the same disguise every other authorization failure wears.
    pub async fn update_item(
        &self,
        id: Ulid,
        caller_id: Ulid,
        name: Option<String>,
        description: Option<String>,
        available: Option<bool>,
    ) -> Result<(), EngineError> {
        let state = self
            .get_item_state(&id)
            .ok_or(EngineError::NotFound(id))?;
        let mut guard = state.write().await;
        if guard.owner_id != caller_id {
            return Err(EngineError::NotFound(id));
        }
        let name = name.unwrap_or_else(|| guard.name.clone());
        let description = description.unwrap_or_else(|| guard.description.clone());
        let available = available.unwrap_or(guard.available);
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("item name too long"));
        }
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(EngineError::LimitExceeded("item description too long"));
        }

        let event = Event::ItemUpdated {
            id,
            name,
            description,
            available,
        };
        self.persist_and_apply(id, &mut guard, &event).await
    }

    /// The creation validator. Window sanity, item existence and
    /// availability, booker existence, the self-booking disguise and the
    /// overlap guard all run under the item's write lock; only then is the
    /// booking persisted, always WAITING.
    pub async fn create_booking(
        &self,
        id: Ulid,
        item_id: Ulid,
        booker_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<BookingView, EngineError> {
        let span = validate_window(start, end)?;

        let state = self
            .get_item_state(&item_id)
            .ok_or(EngineError::NotFound(item_id))?;
        let mut guard = state.write().await;
        if guard.bookings.len() >= MAX_BOOKINGS_PER_ITEM {
            return Err(EngineError::LimitExceeded("too many bookings on item"));
        }
        if !guard.available {
            return Err(EngineError::ItemUnavailable(item_id));
        }
        if !self.users.contains_key(&booker_id) {
            return Err(EngineError::NotFound(booker_id));
        }
        if guard.owner_id == booker_id {
            // Booking your own listing reads as a missing item.
            return Err(EngineError::NotFound(item_id));
        }
        if self.booking_to_item.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        check_no_conflict(&guard, &span, None)?;

        let event = Event::BookingCreated {
            id,
            item_id,
            booker_id,
            span,
        };
        self.persist_and_apply(item_id, &mut guard, &event).await?;

        metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);
        let booking = guard.booking(id).expect("booking just applied");
        Ok(self.booking_view(&guard, booking))
    }

    /// The state machine edge. Re-reads status and ownership under the
    /// item's write lock, so two concurrent decides cannot both observe
    /// WAITING.
    pub async fn decide_booking(
        &self,
        booking_id: Ulid,
        caller_id: Ulid,
        approve: bool,
    ) -> Result<BookingView, EngineError> {
        let (item_id, mut guard) = self.resolve_booking_write(&booking_id).await?;
        let (status, span) = {
            let booking = guard
                .booking(booking_id)
                .ok_or(EngineError::NotFound(booking_id))?;
            (booking.status, booking.span)
        };

        // An approved booking is terminal — rejections bounce off it too.
        if status == BookingStatus::Approved {
            return Err(EngineError::AlreadyBooked(item_id));
        }
        if guard.owner_id != caller_id {
            return Err(EngineError::NotFound(booking_id));
        }
        if approve {
            check_no_conflict(&guard, &span, Some(booking_id))?;
        }

        let event = Event::BookingDecided {
            id: booking_id,
            item_id,
            approved: approve,
        };
        self.persist_and_apply(item_id, &mut guard, &event).await?;

        let decision = if approve { "approved" } else { "rejected" };
        metrics::counter!(crate::observability::BOOKINGS_DECIDED_TOTAL, "decision" => decision)
            .increment(1);
        let booking = guard.booking(booking_id).expect("booking just decided");
        Ok(self.booking_view(&guard, booking))
    }

    /// Comment submission, gated on a completed approved rental.
    pub async fn add_comment(
        &self,
        id: Ulid,
        item_id: Ulid,
        author_id: Ulid,
        text: String,
    ) -> Result<CommentView, EngineError> {
        if text.len() > MAX_COMMENT_LEN {
            return Err(EngineError::LimitExceeded("comment too long"));
        }
        let author = self
            .users
            .get(&author_id)
            .map(|u| u.value().clone())
            .ok_or(EngineError::NotFound(author_id))?;
        let state = self
            .get_item_state(&item_id)
            .ok_or(EngineError::NotFound(item_id))?;
        let mut guard = state.write().await;
        if guard.comments.len() >= MAX_COMMENTS_PER_ITEM {
            return Err(EngineError::LimitExceeded("too many comments on item"));
        }

        let now = now_ms();
        let rented = guard.bookings.iter().any(|b| {
            b.booker_id == author_id && b.status == BookingStatus::Approved && b.span.end < now
        });
        if !rented {
            return Err(EngineError::NotRented {
                user_id: author_id,
                item_id,
            });
        }

        let event = Event::CommentAdded {
            id,
            item_id,
            author_id,
            text: text.clone(),
            created_at: now,
        };
        self.persist_and_apply(item_id, &mut guard, &event).await?;

        Ok(CommentView {
            id,
            item_id,
            author_id,
            author_name: author.name,
            text,
            created_at: now,
        })
    }

    /// Compact the WAL by rewriting it with only the events needed to
    /// recreate the current state. Users first, then items, then each item's
    /// bookings (created + decided) and comments.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();

        for entry in self.users.iter() {
            let u = entry.value();
            events.push(Event::UserCreated {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
            });
        }

        let item_ids: Vec<Ulid> = self.items.iter().map(|e| *e.key()).collect();
        for id in item_ids {
            let Some(state) = self.get_item_state(&id) else {
                continue;
            };
            let guard = state.try_read().expect("compact: uncontended read");
            events.push(Event::ItemCreated {
                id: guard.id,
                owner_id: guard.owner_id,
                name: guard.name.clone(),
                description: guard.description.clone(),
                available: guard.available,
            });
            for booking in &guard.bookings {
                events.push(Event::BookingCreated {
                    id: booking.id,
                    item_id: guard.id,
                    booker_id: booking.booker_id,
                    span: booking.span,
                });
                match booking.status {
                    BookingStatus::Waiting => {}
                    BookingStatus::Approved => events.push(Event::BookingDecided {
                        id: booking.id,
                        item_id: guard.id,
                        approved: true,
                    }),
                    BookingStatus::Rejected => events.push(Event::BookingDecided {
                        id: booking.id,
                        item_id: guard.id,
                        approved: false,
                    }),
                }
            }
            for comment in &guard.comments {
                events.push(Event::CommentAdded {
                    id: comment.id,
                    item_id: guard.id,
                    author_id: comment.author_id,
                    text: comment.text.clone(),
                    created_at: comment.created_at,
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
