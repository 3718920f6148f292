use sqlx::{Column, Row};
use study_core::model::{RESPONSE_COLUMNS, ResponseRow, ResponseTable};

use super::{
    SqliteRepository,
    mapping::{classify, row_cells},
};
use crate::repository::{ResponseSink, ResponseSource, StorageError};

const SELECT_RESPONSES: &str = r"
    SELECT participant_id, email, statement, answer, feedback, timestamp, completion_status
    FROM responses
    ORDER BY id ASC
";

fn standard_headers() -> Vec<String> {
    RESPONSE_COLUMNS.iter().map(|c| (*c).to_owned()).collect()
}

#[async_trait::async_trait]
impl ResponseSink for SqliteRepository {
    async fn append_row(&self, row: &ResponseRow) -> Result<(), StorageError> {
        let mut query = sqlx::query(
            r"
                INSERT INTO responses (
                    participant_id, email, statement, answer, feedback, timestamp,
                    completion_status
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        );
        for cell in row.cells() {
            query = query.bind(cell.as_str());
        }
        query.execute(&self.pool).await.map_err(classify)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResponseSource for SqliteRepository {
    async fn read_table(&self) -> Result<ResponseTable, StorageError> {
        let rows = sqlx::query(SELECT_RESPONSES)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(row_cells(row)?);
        }
        Ok(ResponseTable::new(standard_headers(), out)?)
    }

    async fn read_raw_rows(&self) -> Result<Vec<Vec<String>>, StorageError> {
        let rows = sqlx::query(SELECT_RESPONSES)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;

        let headers = rows.first().map_or_else(standard_headers, |row| {
            row.columns().iter().map(|c| c.name().to_owned()).collect()
        });

        let mut raw = Vec::with_capacity(rows.len() + 1);
        raw.push(headers);
        for row in &rows {
            raw.push(row_cells(row)?);
        }
        Ok(raw)
    }
}
