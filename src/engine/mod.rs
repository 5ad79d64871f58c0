mod conflict;
mod error;
mod mutations;
mod queries;
mod segment;

pub use error::{EngineError, ErrorClass};
pub use segment::ListingState;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedItemState = Arc<RwLock<ItemState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(
    wal: &mut Wal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

pub struct Engine {
    /// Flat user registry.
    pub(super) users: DashMap<Ulid, UserRecord>,
    /// Item registry; each item carries its bookings and comments.
    pub(super) items: DashMap<Ulid, SharedItemState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    /// Reverse lookup: booking id → item id.
    pub(super) booking_to_item: DashMap<Ulid, Ulid>,
    /// Owner → items index for O(1) catalog walks.
    pub(super) owner_items: DashMap<Ulid, Vec<Ulid>>,
}

/// Apply an event directly to an ItemState (no locking — caller holds the lock).
fn apply_to_item(item: &mut ItemState, event: &Event, booking_map: &DashMap<Ulid, Ulid>) {
    match event {
        Event::BookingCreated {
            id,
            item_id,
            booker_id,
            span,
        } => {
            // Status is always WAITING at creation; the event does not carry one.
            item.insert_booking(Booking {
                id: *id,
                booker_id: *booker_id,
                span: *span,
                status: BookingStatus::Waiting,
            });
            booking_map.insert(*id, *item_id);
        }
        Event::BookingDecided { id, approved, .. } => {
            if let Some(booking) = item.booking_mut(*id) {
                booking.status = if *approved {
                    BookingStatus::Approved
                } else {
                    BookingStatus::Rejected
                };
            }
        }
        Event::CommentAdded {
            id,
            author_id,
            text,
            created_at,
            ..
        } => {
            item.comments.push(Comment {
                id: *id,
                author_id: *author_id,
                text: text.clone(),
                created_at: *created_at,
            });
        }
        Event::ItemUpdated {
            name,
            description,
            available,
            ..
        } => {
            item.name = name.clone();
            item.description = description.clone();
            item.available = *available;
        }
        // User events and item creation are handled at the registry level, not here
        Event::UserCreated { .. } | Event::UserUpdated { .. } | Event::ItemCreated { .. } => {}
    }
}

impl Engine {
    pub fn new(wal_path: PathBuf, notify: Arc<NotifyHub>) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            users: DashMap::new(),
            items: DashMap::new(),
            wal_tx,
            notify,
            booking_to_item: DashMap::new(),
            owner_items: DashMap::new(),
        };

        // Replay events — we're the sole owner of these Arcs, so try_write
        // always succeeds instantly (no contention). Never use blocking_write
        // here because this may run inside an async context (e.g. lazy tenant
        // creation).
        for event in &events {
            match event {
                Event::UserCreated { id, name, email } | Event::UserUpdated { id, name, email } => {
                    engine.users.insert(
                        *id,
                        UserRecord {
                            id: *id,
                            name: name.clone(),
                            email: email.clone(),
                        },
                    );
                }
                Event::ItemCreated {
                    id,
                    owner_id,
                    name,
                    description,
                    available,
                } => {
                    let state = ItemState::new(
                        *id,
                        *owner_id,
                        name.clone(),
                        description.clone(),
                        *available,
                    );
                    engine.items.insert(*id, Arc::new(RwLock::new(state)));
                    engine.owner_items.entry(*owner_id).or_default().push(*id);
                }
                other => {
                    if let Some(item_id) = event_item_id(other)
                        && let Some(entry) = engine.items.get(&item_id)
                    {
                        let state = entry.clone();
                        let mut guard = state.try_write().expect("replay: uncontended write");
                        apply_to_item(&mut guard, other, &engine.booking_to_item);
                    }
                }
            }
        }

        Ok(engine)
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_item_state(&self, id: &Ulid) -> Option<SharedItemState> {
        self.items.get(id).map(|e| e.value().clone())
    }

    pub fn item_for_booking(&self, booking_id: &Ulid) -> Option<Ulid> {
        self.booking_to_item.get(booking_id).map(|e| *e.value())
    }

    /// WAL-append + apply + notify in one call.
    pub(super) async fn persist_and_apply(
        &self,
        item_id: Ulid,
        item: &mut ItemState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_item(item, event, &self.booking_to_item);
        self.notify.send(item_id, event);
        Ok(())
    }

    /// Lookup booking → item, get item, acquire write lock. Everything a
    /// decide needs to run as one critical section.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<ItemState>), EngineError> {
        let item_id = self
            .item_for_booking(booking_id)
            .ok_or(EngineError::NotFound(*booking_id))?;
        let state = self
            .get_item_state(&item_id)
            .ok_or(EngineError::NotFound(item_id))?;
        let guard = state.write_owned().await;
        Ok((item_id, guard))
    }
}

/// Extract the item id from an event (for events applied to item state).
fn event_item_id(event: &Event) -> Option<Ulid> {
    match event {
        Event::BookingCreated { item_id, .. }
        | Event::BookingDecided { item_id, .. }
        | Event::CommentAdded { item_id, .. } => Some(*item_id),
        Event::ItemUpdated { id, .. } => Some(*id),
        Event::UserCreated { .. } | Event::UserUpdated { .. } | Event::ItemCreated { .. } => None,
    }
}
