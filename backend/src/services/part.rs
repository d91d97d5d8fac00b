//! Parts catalog service
//!
//! Part identity is the uppercase code: normalized before every storage or
//! comparison, unique, and immutable after creation. Parts with ledger
//! history are never hard-deleted; archiving keeps the history intact.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::stock;
use shared::{
    normalize_part_code, validate_markup_percent, validate_min_stock_override,
    validate_part_code, PaginatedResponse, Pagination, PaginationMeta, Part,
};

/// Parts catalog service
#[derive(Clone)]
pub struct PartService {
    db: PgPool,
    /// Markup applied when a new part does not specify one
    default_markup_percent: Decimal,
}

/// Database row for a part
#[derive(Debug, FromRow)]
struct PartRow {
    id: Uuid,
    code: String,
    description: String,
    category: Option<String>,
    brand: Option<String>,
    markup_percent: Decimal,
    min_stock: i32,
    min_stock_override: Option<i32>,
    min_stock_override_reason: Option<String>,
    auto_replenish: bool,
    archived: bool,
    stock: Decimal,
    avg_cost: Option<Decimal>,
    sell_price: Option<Decimal>,
    times_used: i32,
    first_used_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PartRow> for Part {
    fn from(row: PartRow) -> Self {
        Part {
            id: row.id,
            code: row.code,
            description: row.description,
            category: row.category,
            brand: row.brand,
            markup_percent: row.markup_percent,
            min_stock: row.min_stock,
            min_stock_override: row.min_stock_override,
            min_stock_override_reason: row.min_stock_override_reason,
            auto_replenish: row.auto_replenish,
            archived: row.archived,
            stock: row.stock,
            avg_cost: row.avg_cost,
            sell_price: row.sell_price,
            times_used: row.times_used,
            first_used_at: row.first_used_at,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a part
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePartInput {
    #[validate(length(min = 2, max = 32, message = "Part code must be 2-32 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 500, message = "Description cannot be empty"))]
    pub description: String,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub markup_percent: Option<Decimal>,
    pub min_stock_override: Option<i32>,
    pub min_stock_override_reason: Option<String>,
    pub auto_replenish: Option<bool>,
}

/// Distinguishes an absent field (leave unchanged) from an explicit null
/// (clear the value)
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Input for updating a part (code is immutable and absent here).
/// Nullable fields use explicit null to clear; omitting them keeps the
/// stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePartInput {
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub brand: Option<Option<String>>,
    pub markup_percent: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub min_stock_override: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub min_stock_override_reason: Option<Option<String>>,
    pub auto_replenish: Option<bool>,
}

/// Search parameters for the catalog
#[derive(Debug, Default, Deserialize)]
pub struct PartSearch {
    /// Substring match against code, description and brand
    pub q: Option<String>,
    pub include_archived: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

const PART_COLUMNS: &str = "id, code, description, category, brand, markup_percent, min_stock, \
     min_stock_override, min_stock_override_reason, auto_replenish, archived, \
     stock, avg_cost, sell_price, times_used, first_used_at, last_used_at, \
     created_at, updated_at";

impl PartService {
    /// Create a new PartService instance
    pub fn new(db: PgPool, default_markup_percent: Decimal) -> Self {
        Self {
            db,
            default_markup_percent,
        }
    }

    /// Create a part. The code is case-normalized and must be unique;
    /// uniqueness is enforced by the database constraint, so concurrent
    /// creates of the same code both get a typed rejection.
    pub async fn create(&self, input: CreatePartInput) -> AppResult<Part> {
        input.validate()?;
        let code = normalize_part_code(&input.code);
        validate_part_code(&code).map_err(|msg| AppError::validation("code", msg))?;

        let markup = input.markup_percent.unwrap_or(self.default_markup_percent);
        validate_markup_percent(markup)
            .map_err(|msg| AppError::validation("markup_percent", msg))?;
        validate_min_stock_override(
            input.min_stock_override,
            input.min_stock_override_reason.as_deref(),
        )
        .map_err(|msg| AppError::validation("min_stock_override", msg))?;

        let row: PartRow = sqlx::query_as(&format!(
            "INSERT INTO parts ( \
                 code, description, category, brand, markup_percent, \
                 min_stock_override, min_stock_override_reason, auto_replenish \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PART_COLUMNS}"
        ))
        .bind(&code)
        .bind(&input.description)
        .bind(&input.category)
        .bind(&input.brand)
        .bind(markup)
        .bind(input.min_stock_override)
        .bind(&input.min_stock_override_reason)
        .bind(input.auto_replenish.unwrap_or(false))
        .fetch_one(&self.db)
        .await
        .map_err(duplicate_code_error)?;

        tracing::info!(part = %code, "part created");
        Ok(row.into())
    }

    /// Fetch a part by code
    pub async fn get(&self, part_code: &str) -> AppResult<Part> {
        let code = normalize_part_code(part_code);
        let row: Option<PartRow> =
            sqlx::query_as(&format!("SELECT {PART_COLUMNS} FROM parts WHERE code = $1"))
                .bind(&code)
                .fetch_optional(&self.db)
                .await?;
        row.map(Part::from)
            .ok_or_else(|| AppError::NotFound("Part".to_string()))
    }

    /// Search the catalog by code/description/brand substring. Archived
    /// parts are excluded unless asked for.
    pub async fn search(&self, search: PartSearch) -> AppResult<PaginatedResponse<Part>> {
        let defaults = Pagination::default();
        let pagination = Pagination {
            page: search.page.unwrap_or(defaults.page).max(1),
            per_page: search.per_page.unwrap_or(defaults.per_page).clamp(1, 100),
        };
        let include_archived = search.include_archived.unwrap_or(false);
        let pattern = format!("%{}%", search.q.unwrap_or_default().trim());

        let total_items: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM parts \
             WHERE (archived = FALSE OR $1) \
             AND (code ILIKE $2 OR description ILIKE $2 OR COALESCE(brand, '') ILIKE $2)",
        )
        .bind(include_archived)
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let rows: Vec<PartRow> = sqlx::query_as(&format!(
            "SELECT {PART_COLUMNS} FROM parts \
             WHERE (archived = FALSE OR $1) \
             AND (code ILIKE $2 OR description ILIKE $2 OR COALESCE(brand, '') ILIKE $2) \
             ORDER BY code ASC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(include_archived)
        .bind(&pattern)
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        let total_pages = if pagination.per_page == 0 {
            0
        } else {
            (total_items as u64).div_ceil(pagination.per_page as u64) as u32
        };

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Part::from).collect(),
            pagination: PaginationMeta {
                page: pagination.page,
                per_page: pagination.per_page,
                total_items: total_items as u64,
                total_pages,
            },
        })
    }

    /// Update a part's mutable fields. The code never changes.
    pub async fn update(&self, part_code: &str, input: UpdatePartInput) -> AppResult<Part> {
        let code = normalize_part_code(part_code);
        let existing = self.get(&code).await?;

        let markup = input.markup_percent.unwrap_or(existing.markup_percent);
        validate_markup_percent(markup)
            .map_err(|msg| AppError::validation("markup_percent", msg))?;

        // Absent field keeps the stored value; explicit null clears it
        let category = input.category.unwrap_or(existing.category);
        let brand = input.brand.unwrap_or(existing.brand);
        let min_stock_override = input
            .min_stock_override
            .unwrap_or(existing.min_stock_override);
        let min_stock_override_reason = input
            .min_stock_override_reason
            .unwrap_or(existing.min_stock_override_reason);
        validate_min_stock_override(min_stock_override, min_stock_override_reason.as_deref())
            .map_err(|msg| AppError::validation("min_stock_override", msg))?;

        let row: PartRow = sqlx::query_as(&format!(
            "UPDATE parts \
             SET description = $1, category = $2, brand = $3, markup_percent = $4, \
                 min_stock_override = $5, min_stock_override_reason = $6, \
                 auto_replenish = $7, updated_at = NOW() \
             WHERE code = $8 \
             RETURNING {PART_COLUMNS}"
        ))
        .bind(input.description.unwrap_or(existing.description))
        .bind(category)
        .bind(brand)
        .bind(markup)
        .bind(min_stock_override)
        .bind(min_stock_override_reason)
        .bind(input.auto_replenish.unwrap_or(existing.auto_replenish))
        .bind(&code)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Archive a part: hidden from search, ledger history kept
    pub async fn archive(&self, part_code: &str) -> AppResult<Part> {
        let code = normalize_part_code(part_code);
        let row: Option<PartRow> = sqlx::query_as(&format!(
            "UPDATE parts SET archived = TRUE, updated_at = NOW() \
             WHERE code = $1 RETURNING {PART_COLUMNS}"
        ))
        .bind(&code)
        .fetch_optional(&self.db)
        .await?;
        row.map(Part::from)
            .ok_or_else(|| AppError::NotFound("Part".to_string()))
    }

    /// Delete a part. Rejected whenever ledger history or allocations
    /// reference it; archiving is the supported path for retired parts.
    pub async fn delete(&self, part_code: &str) -> AppResult<()> {
        let code = normalize_part_code(part_code);

        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM part_transactions WHERE part_code = $1) \
             OR EXISTS(SELECT 1 FROM job_part_allocations WHERE part_code = $1)",
        )
        .bind(&code)
        .fetch_one(&self.db)
        .await?;
        if referenced {
            return Err(AppError::ReferentialIntegrity(format!(
                "part {} has ledger history; archive it instead",
                code
            )));
        }

        let result = sqlx::query("DELETE FROM parts WHERE code = $1")
            .bind(&code)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Part".to_string()));
        }
        Ok(())
    }

    /// Recompute every cached field on the part row from the ledger.
    /// Recovery path for cache drift; tests use it to assert cache/ledger
    /// agreement.
    pub async fn rebuild_usage_cache(&self, part_code: &str) -> AppResult<Part> {
        let code = normalize_part_code(part_code);
        let mut tx = self.db.begin().await?;
        stock::refresh_part_caches(&mut tx, &code).await?;
        tx.commit().await?;
        self.get(&code).await
    }
}

/// Map a unique-constraint violation on the part code to the typed
/// duplicate rejection; everything else stays a database error
fn duplicate_code_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            AppError::DuplicateEntry("part code".to_string())
        }
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::ErrorKind;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct FakeDbError(ErrorKind);

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    impl std::error::Error for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "constraint violation"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            match self.0 {
                ErrorKind::UniqueViolation => Some("23505".into()),
                _ => None,
            }
        }

        fn kind(&self) -> ErrorKind {
            // ErrorKind is neither Copy nor Clone in sqlx 0.7, so rebuild it
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                ErrorKind::NotNullViolation => ErrorKind::NotNullViolation,
                ErrorKind::CheckViolation => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn db_error(kind: ErrorKind) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError(kind)))
    }

    /// A code collision on insert is a typed duplicate rejection, never a
    /// bare database error (concurrent creates both reach the insert)
    #[test]
    fn test_unique_violation_is_duplicate_entry() {
        let mapped = duplicate_code_error(db_error(ErrorKind::UniqueViolation));
        assert!(matches!(mapped, AppError::DuplicateEntry(_)));
    }

    /// Other database failures stay database errors
    #[test]
    fn test_other_db_errors_pass_through() {
        let mapped = duplicate_code_error(db_error(ErrorKind::ForeignKeyViolation));
        assert!(matches!(mapped, AppError::Database(_)));

        let mapped = duplicate_code_error(sqlx::Error::RowNotFound);
        assert!(matches!(mapped, AppError::Database(_)));
    }

    /// Absent fields keep stored values; explicit null clears them
    #[test]
    fn test_update_input_null_clears() {
        let input: UpdatePartInput =
            serde_json::from_str(r#"{"min_stock_override": null, "category": null}"#).unwrap();
        assert_eq!(input.min_stock_override, Some(None));
        assert_eq!(input.category, Some(None));
        assert_eq!(input.brand, None);
        assert_eq!(input.min_stock_override_reason, None);

        let input: UpdatePartInput =
            serde_json::from_str(r#"{"min_stock_override": 5, "brand": "Acme"}"#).unwrap();
        assert_eq!(input.min_stock_override, Some(Some(5)));
        assert_eq!(input.brand, Some(Some("Acme".to_string())));
    }

    /// Input-shape rules reject before any query runs
    #[test]
    fn test_create_input_shape() {
        let input = CreatePartInput {
            code: "A".to_string(),
            description: "a belt".to_string(),
            category: None,
            brand: None,
            markup_percent: None,
            min_stock_override: None,
            min_stock_override_reason: None,
            auto_replenish: None,
        };
        assert!(input.validate().is_err());

        let input = CreatePartInput {
            code: "BELT-V42".to_string(),
            description: String::new(),
            category: None,
            brand: None,
            markup_percent: None,
            min_stock_override: None,
            min_stock_override_reason: None,
            auto_replenish: None,
        };
        assert!(input.validate().is_err());
    }
}
