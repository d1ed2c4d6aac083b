//! The one create/update/delete law shared by every entity family.
//!
//! Every persisted id starts out as a deletion candidate. Each incoming
//! record that resolves to an id re-affirms it, gets merged onto the existing
//! entity (or a fresh one) and is saved before the next record is looked at.
//! Whatever is left unaffirmed at the end is deleted.

use std::collections::{ BTreeSet, HashMap, HashSet };

use crate::db::Store;
use crate::error::Result;
use crate::models::Record;

/// How an incoming record maps onto the persisted collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Known(String),
    /// Not resolvable this run. The record is skipped; the id it resolved to
    /// last time, if any, is left exactly as persisted.
    Pending(Option<String>),
}

/// Handed to the upsert closure alongside the record.
pub struct UpsertContext<'a> {
    pub id: &'a str,
    /// Ids already saved or preserved earlier in this pass. These are
    /// guaranteed to survive it.
    pub kept: &'a HashSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// In the order records were processed.
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    pub skipped: usize,
}

impl ReconcileOutcome {
    pub fn absorb(&mut self, other: ReconcileOutcome) {
        self.kept.extend(other.kept);
        self.deleted.extend(other.deleted);
        self.skipped += other.skipped;
    }
}

/// Merge `incoming` into `existing`, persisting through `store`.
///
/// `upsert` must return an entity whose id is `ctx.id`.
pub async fn reconcile<E, S, R, I, U>(
    store: &S,
    existing: Vec<E>,
    incoming: &[R],
    identify: I,
    mut upsert: U
) -> Result<ReconcileOutcome>
    where
        E: Record,
        S: Store<E> + ?Sized,
        I: Fn(&R) -> Identity,
        U: FnMut(Option<E>, &R, &UpsertContext<'_>) -> E
{
    let mut current: HashMap<String, E> = existing
        .into_iter()
        .map(|entity| (entity.id().to_string(), entity))
        .collect();
    let mut to_delete: BTreeSet<String> = current.keys().cloned().collect();

    let mut kept = HashSet::new();
    let mut outcome = ReconcileOutcome::default();

    for record in incoming {
        let id = match identify(record) {
            Identity::Known(id) => id,
            Identity::Pending(previous) => {
                if let Some(previous) = previous {
                    to_delete.remove(&previous);
                    if kept.insert(previous.clone()) {
                        outcome.kept.push(previous);
                    }
                }
                outcome.skipped += 1;
                continue;
            }
        };

        to_delete.remove(&id);

        let entity = {
            let ctx = UpsertContext { id: &id, kept: &kept };
            upsert(current.remove(&id), record, &ctx)
        };
        store.save(std::slice::from_ref(&entity)).await?;
        current.insert(id.clone(), entity);

        if kept.insert(id.clone()) {
            outcome.kept.push(id);
        }
    }

    outcome.deleted = to_delete.into_iter().collect();
    store.delete(&outcome.deleted).await?;

    Ok(outcome)
}
