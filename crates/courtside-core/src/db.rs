// SQLite row store for games, player box scores, rosters and lineup stints.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::aggregate::{LineupStint, PlayerId, SeasonId, StintSide, TeamId, BOX_COLUMNS};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// One scheduled or played game. Scores are `None` until the game is final.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: i64,
    pub season_id: SeasonId,
    pub game_date: NaiveDate,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

/// One player's box-score line for one game. Stat columns are nullable;
/// missing values count as zero when summed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameRecord {
    pub game_id: i64,
    pub team_id: TeamId,
    pub player_id: PlayerId,
    pub minutes: Option<f64>,
    pub pts: Option<f64>,
    pub fgm: Option<f64>,
    pub fga: Option<f64>,
    pub tpm: Option<f64>,
    pub tpa: Option<f64>,
    pub ftm: Option<f64>,
    pub fta: Option<f64>,
    pub oreb: Option<f64>,
    pub dreb: Option<f64>,
    pub ast: Option<f64>,
    pub stl: Option<f64>,
    pub blk: Option<f64>,
    pub tov: Option<f64>,
    pub pf: Option<f64>,
}

impl PlayerGameRecord {
    /// Stat values in `BOX_COLUMNS` order.
    pub fn stat_columns(&self) -> [Option<f64>; 15] {
        [
            self.minutes,
            self.pts,
            self.fgm,
            self.fga,
            self.tpm,
            self.tpa,
            self.ftm,
            self.fta,
            self.oreb,
            self.dreb,
            self.ast,
            self.stl,
            self.blk,
            self.tov,
            self.pf,
        ]
    }
}

/// Roster presence for a season, independent of games played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub season_id: SeasonId,
    pub team_id: TeamId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// SQLite-backed storage for the season's raw rows. The aggregate builder
/// reads from it; nothing else writes to it after import.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS games (
                game_id      INTEGER PRIMARY KEY,
                season_id    INTEGER NOT NULL,
                game_date    TEXT NOT NULL,
                home_team_id INTEGER NOT NULL,
                away_team_id INTEGER NOT NULL,
                home_score   INTEGER,
                away_score   INTEGER
            );

            CREATE TABLE IF NOT EXISTS player_games (
                game_id   INTEGER NOT NULL,
                team_id   INTEGER NOT NULL,
                player_id INTEGER NOT NULL,
                minutes   REAL,
                pts       REAL,
                fgm       REAL,
                fga       REAL,
                tpm       REAL,
                tpa       REAL,
                ftm       REAL,
                fta       REAL,
                oreb      REAL,
                dreb      REAL,
                ast       REAL,
                stl       REAL,
                blk       REAL,
                tov       REAL,
                pf        REAL,
                PRIMARY KEY (game_id, player_id)
            );

            CREATE TABLE IF NOT EXISTS roster (
                player_id INTEGER NOT NULL,
                season_id INTEGER NOT NULL,
                team_id   INTEGER NOT NULL,
                name      TEXT NOT NULL,
                PRIMARY KEY (player_id, season_id)
            );

            CREATE TABLE IF NOT EXISTS lineup_stints (
                stint_id     INTEGER PRIMARY KEY,
                game_id      INTEGER NOT NULL,
                seconds      REAL NOT NULL,
                home_team_id INTEGER NOT NULL,
                away_team_id INTEGER NOT NULL,
                home_pts     REAL NOT NULL,
                away_pts     REAL NOT NULL,
                h1 INTEGER NOT NULL, h2 INTEGER NOT NULL, h3 INTEGER NOT NULL,
                h4 INTEGER NOT NULL, h5 INTEGER NOT NULL,
                a1 INTEGER NOT NULL, a2 INTEGER NOT NULL, a3 INTEGER NOT NULL,
                a4 INTEGER NOT NULL, a5 INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_season ON games(season_id);
            CREATE INDEX IF NOT EXISTS idx_stints_game ON lineup_stints(game_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    // ------------------------------------------------------------------
    // Single-row inserts
    // ------------------------------------------------------------------

    /// Insert a game, replacing any existing row with the same id.
    pub fn insert_game(&self, game: &GameRecord) -> Result<()> {
        let conn = self.conn()?;
        insert_game_on(&conn, game).context("failed to insert game")?;
        Ok(())
    }

    /// Insert a box-score line, replacing any existing `(game_id, player_id)` row.
    pub fn insert_player_game(&self, line: &PlayerGameRecord) -> Result<()> {
        let conn = self.conn()?;
        insert_player_game_on(&conn, line).context("failed to insert player game")?;
        Ok(())
    }

    /// Insert a roster entry, replacing any existing `(player_id, season_id)` row.
    pub fn insert_roster_entry(&self, entry: &RosterEntry) -> Result<()> {
        let conn = self.conn()?;
        insert_roster_entry_on(&conn, entry).context("failed to insert roster entry")?;
        Ok(())
    }

    /// Insert a lineup stint, replacing any existing row with the same id.
    pub fn insert_stint(&self, stint: &LineupStint) -> Result<()> {
        let conn = self.conn()?;
        insert_stint_on(&conn, stint).context("failed to insert lineup stint")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Bulk imports (one transaction each)
    // ------------------------------------------------------------------

    pub fn import_games(&self, games: &[GameRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin games import")?;
        for game in games {
            insert_game_on(&tx, game)
                .with_context(|| format!("failed to insert game {}", game.game_id))?;
        }
        tx.commit().context("failed to commit games import")?;
        Ok(games.len())
    }

    pub fn import_player_games(&self, lines: &[PlayerGameRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .context("failed to begin box score import")?;
        for line in lines {
            insert_player_game_on(&tx, line).with_context(|| {
                format!(
                    "failed to insert box score for player {} in game {}",
                    line.player_id, line.game_id
                )
            })?;
        }
        tx.commit().context("failed to commit box score import")?;
        Ok(lines.len())
    }

    pub fn import_roster(&self, entries: &[RosterEntry]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin roster import")?;
        for entry in entries {
            insert_roster_entry_on(&tx, entry)
                .with_context(|| format!("failed to insert roster entry for player {}", entry.player_id))?;
        }
        tx.commit().context("failed to commit roster import")?;
        Ok(entries.len())
    }

    pub fn import_stints(&self, stints: &[LineupStint]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin stint import")?;
        for stint in stints {
            insert_stint_on(&tx, stint)
                .with_context(|| format!("failed to insert stint {}", stint.stint_id))?;
        }
        tx.commit().context("failed to commit stint import")?;
        Ok(stints.len())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The highest season id with at least one game, if any.
    pub fn latest_season(&self) -> Result<Option<SeasonId>> {
        let conn = self.conn()?;
        let season: Option<SeasonId> = conn
            .query_row("SELECT MAX(season_id) FROM games", [], |row| row.get(0))
            .context("failed to query latest season")?;
        Ok(season)
    }

    /// Lineup stints for every game of the season, in stint id order.
    pub fn load_stints(&self, season_id: SeasonId) -> Result<Vec<LineupStint>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT s.stint_id, s.game_id, s.seconds,
                        s.home_team_id, s.home_pts, s.h1, s.h2, s.h3, s.h4, s.h5,
                        s.away_team_id, s.away_pts, s.a1, s.a2, s.a3, s.a4, s.a5
                 FROM lineup_stints s
                 JOIN games g ON g.game_id = s.game_id
                 WHERE g.season_id = ?1
                 ORDER BY s.stint_id",
            )
            .context("failed to prepare load_stints query")?;

        let stints = stmt
            .query_map(params![season_id], |row| {
                Ok(LineupStint {
                    stint_id: row.get(0)?,
                    game_id: row.get(1)?,
                    seconds: row.get(2)?,
                    home: stint_side(row, 3)?,
                    away: stint_side(row, 10)?,
                })
            })
            .context("failed to query lineup stints")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map lineup stint rows")?;

        Ok(stints)
    }
}

// ---------------------------------------------------------------------------
// Statement helpers shared by single inserts and transactions
// ---------------------------------------------------------------------------

fn insert_game_on(conn: &Connection, game: &GameRecord) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO games
            (game_id, season_id, game_date, home_team_id, away_team_id, home_score, away_score)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            game.game_id,
            game.season_id,
            game.game_date.format("%Y-%m-%d").to_string(),
            game.home_team_id,
            game.away_team_id,
            game.home_score,
            game.away_score,
        ],
    )
}

fn insert_player_game_on(conn: &Connection, line: &PlayerGameRecord) -> rusqlite::Result<usize> {
    let sql = format!(
        "INSERT OR REPLACE INTO player_games (game_id, team_id, player_id, {}) VALUES ({})",
        BOX_COLUMNS.join(", "),
        (1..=BOX_COLUMNS.len() + 3)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", "),
    );
    let s = line.stat_columns();
    conn.execute(
        &sql,
        params![
            line.game_id,
            line.team_id,
            line.player_id,
            s[0],
            s[1],
            s[2],
            s[3],
            s[4],
            s[5],
            s[6],
            s[7],
            s[8],
            s[9],
            s[10],
            s[11],
            s[12],
            s[13],
            s[14],
        ],
    )
}

fn insert_roster_entry_on(conn: &Connection, entry: &RosterEntry) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO roster (player_id, season_id, team_id, name)
         VALUES (?1, ?2, ?3, ?4)",
        params![entry.player_id, entry.season_id, entry.team_id, entry.name],
    )
}

fn insert_stint_on(conn: &Connection, stint: &LineupStint) -> rusqlite::Result<usize> {
    let h = &stint.home.players;
    let a = &stint.away.players;
    conn.execute(
        "INSERT OR REPLACE INTO lineup_stints
            (stint_id, game_id, seconds, home_team_id, away_team_id, home_pts, away_pts,
             h1, h2, h3, h4, h5, a1, a2, a3, a4, a5)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            stint.stint_id,
            stint.game_id,
            stint.seconds,
            stint.home.team_id,
            stint.away.team_id,
            stint.home.points,
            stint.away.points,
            h[0],
            h[1],
            h[2],
            h[3],
            h[4],
            a[0],
            a[1],
            a[2],
            a[3],
            a[4],
        ],
    )
}

/// Read `team_id, points, p1..p5` starting at column `start`.
fn stint_side(row: &Row<'_>, start: usize) -> rusqlite::Result<StintSide> {
    Ok(StintSide {
        team_id: row.get(start)?,
        points: row.get(start + 1)?,
        players: [
            row.get(start + 2)?,
            row.get(start + 3)?,
            row.get(start + 4)?,
            row.get(start + 5)?,
            row.get(start + 6)?,
        ],
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
