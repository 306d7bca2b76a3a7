use crate::errors::StoreError;
use crate::models::hiscore::{timestamp_format, PlayerHiscoreData};
use crate::store::executor::{Pagination, QueryExecutor, Statement};
use crate::store::params::Params;
use crate::store::result::ResultSet;

const SKILLS: [&str; 8] = [
    "total",
    "attack",
    "defence",
    "strength",
    "hitpoints",
    "ranged",
    "prayer",
    "magic",
];

/// Reads and writes player hiscore snapshots.
#[derive(Clone)]
pub struct HiscoreRepository {
    executor: QueryExecutor,
}

impl HiscoreRepository {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Snapshots for one player, newest first.
    pub async fn read(
        &self,
        player_name: &str,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<PlayerHiscoreData>, StoreError> {
        let sql = format!(
            "SELECT {} FROM player_hiscore_data phd \
             JOIN players pl ON pl.id = phd.player_id \
             WHERE pl.name = :player_name \
             ORDER BY phd.scraped_at DESC",
            select_list("phd")
        );
        let rows = self
            .executor
            .execute_paged(
                &sql,
                Params::new().with("player_name", player_name),
                Pagination::new(page_size, page),
            )
            .await?;
        decode(rows)
    }

    /// Latest snapshot of every player with `player_id >= gte_player_id`,
    /// ordered by player id.
    pub async fn read_latest(
        &self,
        gte_player_id: i64,
        page: Option<i64>,
        page_size: i64,
    ) -> Result<Vec<PlayerHiscoreData>, StoreError> {
        let sql = format!(
            "SELECT {} FROM player_hiscore_data_latest phl \
             WHERE phl.player_id >= :gte_player_id \
             ORDER BY phl.player_id ASC",
            select_list("phl")
        );
        let rows = self
            .executor
            .execute_paged(
                &sql,
                Params::new().with("gte_player_id", gte_player_id),
                Pagination::new(page_size, page.unwrap_or(1)),
            )
            .await?;
        decode(rows)
    }

    /// Store snapshots and refresh each player's latest row, all in one
    /// transaction. An older snapshot never replaces a newer latest row.
    pub async fn create(&self, data: &[PlayerHiscoreData]) -> Result<(), StoreError> {
        if data.is_empty() {
            return Ok(());
        }

        let insert_history = format!(
            "INSERT INTO player_hiscore_data (player_id, scraped_at, {}) VALUES (:player_id, :scraped_at, {})",
            SKILLS.join(", "),
            markers()
        );
        let drop_stale_latest = "DELETE FROM player_hiscore_data_latest \
                                 WHERE player_id = :player_id AND scraped_at <= :scraped_at";
        let insert_latest = format!(
            "INSERT INTO player_hiscore_data_latest (player_id, scraped_at, {}) \
             SELECT :player_id, :scraped_at, {} FROM (SELECT 1 AS seed) AS s \
             WHERE NOT EXISTS (SELECT 1 FROM player_hiscore_data_latest WHERE player_id = :player_id)",
            SKILLS.join(", "),
            markers()
        );

        let statements: Vec<Statement> = data
            .iter()
            .flat_map(|row| {
                let params = row_params(row);
                [
                    Statement::new(insert_history.as_str(), params.clone()),
                    Statement::new(drop_stale_latest, params.clone()),
                    Statement::new(insert_latest.as_str(), params),
                ]
            })
            .collect();

        self.executor.execute_batch(&statements).await?;
        tracing::info!(rows = data.len(), "stored hiscore snapshots");
        Ok(())
    }
}

fn select_list(alias: &str) -> String {
    let mut columns = vec![
        format!("{}.player_id", alias),
        format!("{}.scraped_at AS timestamp", alias),
    ];
    columns.extend(SKILLS.iter().map(|s| format!("{}.{}", alias, s)));
    columns.join(", ")
}

fn markers() -> String {
    SKILLS
        .iter()
        .map(|s| format!(":{}", s))
        .collect::<Vec<_>>()
        .join(", ")
}

fn row_params(row: &PlayerHiscoreData) -> Params {
    Params::new()
        .with("player_id", row.player_id)
        .with("scraped_at", timestamp_format::to_string(&row.timestamp))
        .with("total", row.total)
        .with("attack", row.attack)
        .with("defence", row.defence)
        .with("strength", row.strength)
        .with("hitpoints", row.hitpoints)
        .with("ranged", row.ranged)
        .with("prayer", row.prayer)
        .with("magic", row.magic)
}

fn decode(rows: Option<ResultSet>) -> Result<Vec<PlayerHiscoreData>, StoreError> {
    rows.map_or_else(|| Ok(Vec::new()), |rows| rows.deserialize())
}
