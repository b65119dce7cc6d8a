//! SQL schema for the planner SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS seasons (
    season_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT    NOT NULL,
    order_num        INTEGER NOT NULL,
    start_date       TEXT    NOT NULL,   -- YYYY-MM-DD
    end_date         TEXT    NOT NULL,
    color            TEXT,
    is_collaboration INTEGER NOT NULL DEFAULT 0
);

-- The same collectible may appear as several rows (reruns); `name` is not
-- unique on purpose.
CREATE TABLE IF NOT EXISTS souls (
    soul_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    season_id       INTEGER NOT NULL REFERENCES seasons(season_id),
    name            TEXT    NOT NULL,
    order_num       INTEGER NOT NULL,
    start_date      TEXT    NOT NULL,
    end_date        TEXT    NOT NULL,
    keywords        TEXT    NOT NULL DEFAULT '[]',   -- JSON array
    creator         TEXT,
    description     TEXT,
    is_season_guide INTEGER NOT NULL DEFAULT 0
);

-- NULL visit_number marks a season-only appearance; NULLs never collide in
-- the UNIQUE constraint.
CREATE TABLE IF NOT EXISTS visits (
    visit_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    soul_id      INTEGER NOT NULL REFERENCES souls(soul_id) ON DELETE CASCADE,
    visit_number INTEGER,
    global_order INTEGER,
    start_date   TEXT    NOT NULL,
    end_date     TEXT    NOT NULL,
    is_warband   INTEGER NOT NULL DEFAULT 0,
    notes        TEXT,
    UNIQUE (soul_id, visit_number),
    CHECK  (end_date >= start_date)
);

-- Exactly one owner per image.
CREATE TABLE IF NOT EXISTS images (
    image_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    soul_id     INTEGER REFERENCES souls(soul_id)   ON DELETE CASCADE,
    visit_id    INTEGER REFERENCES visits(visit_id) ON DELETE CASCADE,
    image_type  TEXT    NOT NULL,
    file_name   TEXT    NOT NULL UNIQUE,
    url         TEXT    NOT NULL,
    file_size   INTEGER,
    uploaded_at TEXT    NOT NULL,           -- RFC 3339 UTC
    CHECK ((soul_id IS NULL) != (visit_id IS NULL))
);

CREATE INDEX IF NOT EXISTS souls_season_idx  ON souls(season_id);
CREATE INDEX IF NOT EXISTS souls_name_idx    ON souls(name);
CREATE INDEX IF NOT EXISTS visits_soul_idx   ON visits(soul_id);
CREATE INDEX IF NOT EXISTS visits_dates_idx  ON visits(start_date, end_date);
CREATE INDEX IF NOT EXISTS images_soul_idx   ON images(soul_id);
CREATE INDEX IF NOT EXISTS images_visit_idx  ON images(visit_id);

PRAGMA user_version = 1;
";
