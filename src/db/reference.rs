use sea_orm::prelude::Expr;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::models::sequences;

/// Render a reference number, e.g. `CTR-2026-00042`.
pub fn format_reference(prefix: &str, year: i32, sequence: i64) -> String {
    format!("{prefix}-{year}-{sequence:05}")
}

/// Allocate the next reference number for `year`.
///
/// The counter is bumped with a single upsert, so inside a transaction two
/// creations never see the same value.
pub async fn next_reference<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
    year: i32,
) -> Result<String, DbErr> {
    let seed = sequences::ActiveModel {
        year: Set(year),
        last_value: Set(1),
    };

    sequences::Entity::insert(seed)
        .on_conflict(
            OnConflict::column(sequences::Column::Year)
                .value(
                    sequences::Column::LastValue,
                    Expr::col((sequences::Entity, sequences::Column::LastValue)).add(1),
                )
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    let counter = sequences::Entity::find_by_id(year)
        .one(conn)
        .await?
        .ok_or(DbErr::RecordNotFound("Reference sequence not found".to_string()))?;

    Ok(format_reference(prefix, year, counter.last_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_is_zero_padded() {
        assert_eq!(format_reference("CTR", 2026, 42), "CTR-2026-00042");
    }

    #[test]
    fn wide_sequences_are_not_truncated() {
        assert_eq!(format_reference("CTR", 2026, 1_234_567), "CTR-2026-1234567");
    }
}
