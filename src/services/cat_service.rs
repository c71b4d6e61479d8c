use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use validator::Validate;

use super::error::CatError;
use crate::api::{Cat, CatPatch, NewCat};
use crate::database::{CatDraft, CatStore};
use crate::types::{CatId, UserId};

/// Inclusive `[start, end]` bounds of one calendar day in a fixed timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate, offset: FixedOffset) -> Self {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let start = Utc.from_utc_datetime(
            &(local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))),
        );
        let end = start + Duration::days(1) - Duration::nanoseconds(1);
        Self { start, end }
    }

    /// The day containing `now`, as seen in `offset`.
    pub fn containing(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::for_date(now.with_timezone(&offset).date_naive(), offset)
    }
}

/// Resource layer for cat records.
///
/// Every operation takes the authenticated caller explicitly. Get, update and
/// delete resolve the record first (404), then check ownership (403), and only
/// then touch the store.
#[derive(Clone)]
pub struct CatService {
    store: Arc<dyn CatStore>,
    reference_offset: FixedOffset,
}

impl CatService {
    pub fn new(store: Arc<dyn CatStore>, reference_offset: FixedOffset) -> Self {
        Self {
            store,
            reference_offset,
        }
    }

    pub fn store(&self) -> &Arc<dyn CatStore> {
        &self.store
    }

    /// The caller's records created within `[start, end]`. Missing bounds
    /// default to the edges of the current day in the reference timezone.
    pub async fn list(
        &self,
        user_id: UserId,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<Cat>, CatError> {
        self.list_at(user_id, start_date, end_date, Utc::now()).await
    }

    pub async fn list_at(
        &self,
        user_id: UserId,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Cat>, CatError> {
        let today = DayWindow::containing(now, self.reference_offset);
        let start = start_date.unwrap_or(today.start);
        let end = end_date.unwrap_or(today.end);

        tracing::debug!(user_id = %user_id, %start, %end, "Listing cats");
        Ok(self.store.find_by_owner(user_id, start, end).await?)
    }

    pub async fn create(&self, user_id: UserId, input: NewCat) -> Result<Cat, CatError> {
        input.validate()?;

        let cat = self
            .store
            .insert(CatDraft {
                name: input.name,
                description: input.description,
                owner_id: user_id,
                created_on: input.created_on,
            })
            .await?;

        tracing::info!(user_id = %user_id, cat_id = %cat.id, "Created cat");
        Ok(cat)
    }

    pub async fn get(&self, user_id: UserId, id: CatId) -> Result<Cat, CatError> {
        self.owned(user_id, id).await
    }

    /// Merge the non-null fields of `patch` onto the caller's record.
    pub async fn update(
        &self,
        user_id: UserId,
        id: CatId,
        patch: CatPatch,
    ) -> Result<Cat, CatError> {
        let existing = self.owned(user_id, id).await?;
        patch.validate()?;

        if patch.is_empty() {
            return Ok(existing);
        }

        let updated = self
            .store
            .update(id, &patch)
            .await?
            .ok_or(CatError::NotFound(id))?;

        tracing::info!(
            user_id = %user_id,
            cat_id = %id,
            fields = ?patch.field_names(),
            "Updated cat"
        );
        Ok(updated)
    }

    pub async fn delete(&self, user_id: UserId, id: CatId) -> Result<(), CatError> {
        self.owned(user_id, id).await?;

        if !self.store.delete(id).await? {
            return Err(CatError::NotFound(id));
        }

        tracing::info!(user_id = %user_id, cat_id = %id, "Deleted cat");
        Ok(())
    }

    async fn owned(&self, user_id: UserId, id: CatId) -> Result<Cat, CatError> {
        let cat = self.store.get(id).await?.ok_or(CatError::NotFound(id))?;

        if cat.owner_id != user_id {
            tracing::warn!(
                user_id = %user_id,
                cat_id = %id,
                "Rejected access to cat owned by another user"
            );
            return Err(CatError::Forbidden(id));
        }

        Ok(cat)
    }
}
