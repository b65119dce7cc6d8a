//! [`SqliteStore`]: the SQLite implementation of [`CatalogStore`].

use std::{
  collections::{HashMap, HashSet},
  path::Path,
};

use chrono::{NaiveDate, Utc};
use rusqlite::{
  OptionalExtension as _, ffi::SQLITE_CONSTRAINT_UNIQUE, params, params_from_iter,
  types::Value,
};
use uuid::Uuid;

use planner_core::{
  SoulId, VisitId,
  image::{Image, ImageOwner, NewImage},
  season::{NewSeason, Season},
  soul::{NewSoul, Soul},
  store::CatalogStore,
  visit::{NewVisit, Visit, VisitPatch, VisitWithSoul},
};

use crate::{
  Error, Result,
  encode::{
    ImageIndex, RawImage, RawSoul, RawVisit, decode_souls, decode_visits, encode_date,
    encode_dt, encode_image_type, encode_keywords,
  },
  schema::SCHEMA,
};

// ─── Row readers ─────────────────────────────────────────────────────────────

const SOUL_SELECT: &str = "
  SELECT s.soul_id, s.season_id, se.name, se.color, s.name, s.order_num,
         s.start_date, s.end_date, s.keywords, s.creator, s.description,
         s.is_season_guide
    FROM souls s
    JOIN seasons se ON se.season_id = s.season_id";

const VISIT_SELECT: &str = "
  SELECT visit_id, soul_id, visit_number, global_order, start_date, end_date,
         is_warband, notes
    FROM visits";

const IMAGE_SELECT: &str = "
  SELECT image_id, soul_id, visit_id, image_type, file_name, url, file_size,
         uploaded_at
    FROM images";

fn select_souls(
  conn: &rusqlite::Connection,
  tail: &str,
  args: &[Value],
) -> rusqlite::Result<Vec<RawSoul>> {
  let mut stmt = conn.prepare(&format!("{SOUL_SELECT} {tail}"))?;
  let rows = stmt
    .query_map(params_from_iter(args), |r| {
      Ok(RawSoul {
        soul_id:         r.get(0)?,
        season_id:       r.get(1)?,
        season_name:     r.get(2)?,
        season_color:    r.get(3)?,
        name:            r.get(4)?,
        order_num:       r.get(5)?,
        start_date:      r.get(6)?,
        end_date:        r.get(7)?,
        keywords:        r.get(8)?,
        creator:         r.get(9)?,
        description:     r.get(10)?,
        is_season_guide: r.get(11)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn select_visits(
  conn: &rusqlite::Connection,
  tail: &str,
  args: &[Value],
) -> rusqlite::Result<Vec<RawVisit>> {
  let mut stmt = conn.prepare(&format!("{VISIT_SELECT} {tail}"))?;
  let rows = stmt
    .query_map(params_from_iter(args), |r| {
      Ok(RawVisit {
        visit_id:     r.get(0)?,
        soul_id:      r.get(1)?,
        visit_number: r.get(2)?,
        global_order: r.get(3)?,
        start_date:   r.get(4)?,
        end_date:     r.get(5)?,
        is_warband:   r.get(6)?,
        notes:        r.get(7)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn select_images(
  conn: &rusqlite::Connection,
  tail: &str,
  args: &[Value],
) -> rusqlite::Result<Vec<RawImage>> {
  let mut stmt = conn.prepare(&format!("{IMAGE_SELECT} {tail} ORDER BY image_id"))?;
  let rows = stmt
    .query_map(params_from_iter(args), |r| {
      Ok(RawImage {
        image_id:    r.get(0)?,
        soul_id:     r.get(1)?,
        visit_id:    r.get(2)?,
        image_type:  r.get(3)?,
        file_name:   r.get(4)?,
        url:         r.get(5)?,
        file_size:   r.get(6)?,
        uploaded_at: r.get(7)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Every soul, visit and image in one pass.
struct RawCatalog {
  souls:  Vec<RawSoul>,
  visits: Vec<RawVisit>,
  images: Vec<RawImage>,
}

impl RawCatalog {
  fn load(conn: &rusqlite::Connection) -> rusqlite::Result<Self> {
    Ok(Self {
      souls:  select_souls(conn, "ORDER BY s.order_num, s.soul_id", &[])?,
      // Latest-ending first; the aggregation layer reorders as needed.
      visits: select_visits(conn, "ORDER BY end_date DESC, visit_id", &[])?,
      images: select_images(conn, "", &[])?,
    })
  }

  /// Decode and join every visit with its (fully loaded) soul, keeping the
  /// visit query's order.
  fn into_joined(self) -> Result<Vec<VisitWithSoul>> {
    let mut images = ImageIndex::build(self.images)?;
    let visits = decode_visits(self.visits, &mut images)?;
    let souls: HashMap<SoulId, Soul> = decode_souls(self.souls, &visits, &mut images)?
      .into_iter()
      .map(|s| (s.soul_id, s))
      .collect();

    Ok(
      visits
        .into_iter()
        .filter_map(|visit| {
          let soul = souls.get(&visit.soul_id)?.clone();
          Some(VisitWithSoul { visit, soul })
        })
        .collect(),
    )
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A planner catalog store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load visits matching `filter` (a `WHERE` clause over `visits`) along
  /// with their images, in `order`.
  async fn load_visits(
    &self,
    filter: &'static str,
    order: &'static str,
    args: Vec<Value>,
  ) -> Result<Vec<Visit>> {
    let (raw_visits, raw_images) = self
      .conn
      .call(move |conn| {
        let visits = select_visits(conn, &format!("{filter} {order}"), &args)?;
        let images = select_images(
          conn,
          &format!("WHERE visit_id IN (SELECT visit_id FROM visits {filter})"),
          &args,
        )?;
        Ok((visits, images))
      })
      .await?;

    let mut images = ImageIndex::build(raw_images)?;
    decode_visits(raw_visits, &mut images)
  }

  async fn load_visit(&self, filter: &'static str, args: Vec<Value>) -> Result<Option<Visit>> {
    Ok(self.load_visits(filter, "", args).await?.into_iter().next())
  }
}

/// Translate a failed visit insert/update, recognising the
/// `UNIQUE (soul_id, visit_number)` index.
fn visit_write_error(err: tokio_rusqlite::Error, visit_number: Option<u32>) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, Some(msg))) = &err
    && code.extended_code == SQLITE_CONSTRAINT_UNIQUE
    && msg.contains("visits.visit_number")
    && let Some(visit_number) = visit_number
  {
    return Error::VisitNumberTaken(visit_number);
  }
  Error::Database(err)
}

fn owner_columns(owner: ImageOwner) -> (Option<SoulId>, Option<VisitId>) {
  match owner {
    ImageOwner::Soul(id) => (Some(id), None),
    ImageOwner::Visit(id) => (None, Some(id)),
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Seed data ─────────────────────────────────────────────────────────

  async fn add_season(&self, input: NewSeason) -> Result<Season> {
    let name      = input.name.clone();
    let color     = input.color.clone();
    let start_str = encode_date(input.start_date);
    let end_str   = encode_date(input.end_date);
    let order_num = input.order_num;
    let collab    = input.is_collaboration;

    let season_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO seasons
             (name, order_num, start_date, end_date, color, is_collaboration)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![name, order_num, start_str, end_str, color, collab],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Season {
      season_id,
      name: input.name,
      order_num: input.order_num,
      start_date: input.start_date,
      end_date: input.end_date,
      color: input.color,
      is_collaboration: input.is_collaboration,
    })
  }

  async fn add_soul(&self, input: NewSoul) -> Result<Soul> {
    let season_id    = input.season_id;
    let keywords_str = encode_keywords(&input.keywords)?;
    let start_str    = encode_date(input.start_date);
    let end_str      = encode_date(input.end_date);

    let inserted: Option<SoulId> = self
      .conn
      .call(move |conn| {
        let season_exists = conn
          .query_row(
            "SELECT 1 FROM seasons WHERE season_id = ?1",
            params![season_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !season_exists {
          return Ok(None);
        }

        conn.execute(
          "INSERT INTO souls
             (season_id, name, order_num, start_date, end_date, keywords,
              creator, description, is_season_guide)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          params![
            season_id,
            input.name,
            input.order_num,
            start_str,
            end_str,
            keywords_str,
            input.creator,
            input.description,
            input.is_season_guide,
          ],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let soul_id = inserted.ok_or(Error::SeasonNotFound(season_id))?;
    self
      .get_soul(soul_id)
      .await?
      .ok_or(Error::MissingAfterInsert("soul"))
  }

  async fn add_image(&self, input: NewImage) -> Result<Image> {
    let extension   = input.extension.trim_start_matches('.');
    let file_name   = format!("{}.{}", Uuid::new_v4(), extension);
    let uploaded_at = Utc::now();

    let (soul_id, visit_id) = owner_columns(input.owner);
    let type_str            = encode_image_type(input.image_type);
    let uploaded_str        = encode_dt(uploaded_at);
    let file_name_db        = file_name.clone();
    let url                 = input.url.clone();
    let file_size           = input.file_size;

    let image_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO images
             (soul_id, visit_id, image_type, file_name, url, file_size, uploaded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![soul_id, visit_id, type_str, file_name_db, url, file_size, uploaded_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Image {
      image_id,
      image_type: input.image_type,
      url: input.url,
      file_name,
      file_size: input.file_size,
      uploaded_at,
    })
  }

  // ── Souls ─────────────────────────────────────────────────────────────

  async fn get_soul(&self, id: SoulId) -> Result<Option<Soul>> {
    let (raw_souls, raw_visits, raw_images) = self
      .conn
      .call(move |conn| {
        let args = [Value::Integer(id)];
        let souls = select_souls(conn, "WHERE s.soul_id = ?1", &args)?;
        let visits = select_visits(conn, "WHERE soul_id = ?1", &args)?;
        let images = select_images(
          conn,
          "WHERE soul_id = ?1
              OR visit_id IN (SELECT visit_id FROM visits WHERE soul_id = ?1)",
          &args,
        )?;
        Ok((souls, visits, images))
      })
      .await?;

    let mut images = ImageIndex::build(raw_images)?;
    let visits = decode_visits(raw_visits, &mut images)?;
    Ok(decode_souls(raw_souls, &visits, &mut images)?.into_iter().next())
  }

  // ── Visit writes ──────────────────────────────────────────────────────

  async fn record_visit(&self, input: NewVisit) -> Result<Visit> {
    let start_str = encode_date(input.start_date);
    let end_str   = encode_date(input.end_date);
    let soul_id   = input.soul_id;
    let number    = input.visit_number;

    let inserted: Option<VisitId> = self
      .conn
      .call(move |conn| {
        let soul_exists = conn
          .query_row("SELECT 1 FROM souls WHERE soul_id = ?1", params![soul_id], |_| Ok(()))
          .optional()?
          .is_some();
        if !soul_exists {
          return Ok(None);
        }

        conn.execute(
          "INSERT INTO visits
             (soul_id, visit_number, global_order, start_date, end_date,
              is_warband, notes)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![
            soul_id,
            input.visit_number,
            input.global_order,
            start_str,
            end_str,
            input.is_warband,
            input.notes,
          ],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await
      .map_err(|e| visit_write_error(e, number))?;

    let visit_id = inserted.ok_or(Error::SoulNotFound(soul_id))?;
    self
      .get_visit(visit_id)
      .await?
      .ok_or(Error::MissingAfterInsert("visit"))
  }

  async fn update_visit(&self, id: VisitId, patch: VisitPatch) -> Result<Option<Visit>> {
    let start_str = patch.start_date.map(encode_date);
    let end_str   = patch.end_date.map(encode_date);
    let number    = patch.visit_number;

    // Unset fields keep their stored value. Write and read-back share a call.
    let updated = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE visits
              SET visit_number = COALESCE(?2, visit_number),
                  global_order = COALESCE(?3, global_order),
                  start_date   = COALESCE(?4, start_date),
                  end_date     = COALESCE(?5, end_date),
                  is_warband   = COALESCE(?6, is_warband),
                  notes        = COALESCE(?7, notes)
            WHERE visit_id = ?1",
          params![
            id,
            patch.visit_number,
            patch.global_order,
            start_str,
            end_str,
            patch.is_warband,
            patch.notes,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }

        let args = [Value::Integer(id)];
        let visits = select_visits(conn, "WHERE visit_id = ?1", &args)?;
        let images = select_images(conn, "WHERE visit_id = ?1", &args)?;
        Ok(Some((visits, images)))
      })
      .await
      .map_err(|e| visit_write_error(e, number))?;

    let Some((raw_visits, raw_images)) = updated else {
      return Ok(None);
    };

    let mut images = ImageIndex::build(raw_images)?;
    Ok(decode_visits(raw_visits, &mut images)?.into_iter().next())
  }

  async fn delete_visit(&self, id: VisitId) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM visits WHERE visit_id = ?1", params![id])?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Visit reads ───────────────────────────────────────────────────────

  async fn get_visit(&self, id: VisitId) -> Result<Option<Visit>> {
    self
      .load_visit("WHERE visit_id = ?1", vec![Value::Integer(id)])
      .await
  }

  async fn find_visit_by_number(
    &self,
    soul_id: SoulId,
    visit_number: u32,
  ) -> Result<Option<Visit>> {
    self
      .load_visit(
        "WHERE soul_id = ?1 AND visit_number = ?2",
        vec![Value::Integer(soul_id), Value::Integer(i64::from(visit_number))],
      )
      .await
  }

  async fn visit_number_exists(&self, soul_id: SoulId, visit_number: u32) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM visits WHERE soul_id = ?1 AND visit_number = ?2",
              params![soul_id, visit_number],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn visits_for_soul(&self, soul_id: SoulId) -> Result<Vec<Visit>> {
    self
      .load_visits(
        "WHERE soul_id = ?1",
        "ORDER BY visit_number, visit_id",
        vec![Value::Integer(soul_id)],
      )
      .await
  }

  async fn visits_with_soul(&self) -> Result<Vec<VisitWithSoul>> {
    let raw = self.conn.call(|conn| Ok(RawCatalog::load(conn)?)).await?;
    raw.into_joined()
  }

  async fn visits_active_on(&self, date: NaiveDate) -> Result<Vec<VisitWithSoul>> {
    let date_str = encode_date(date);
    let (raw, active_ids) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare("SELECT visit_id FROM visits WHERE ?1 BETWEEN start_date AND end_date")?;
        let ids = stmt
          .query_map(params![date_str], |r| r.get::<_, VisitId>(0))?
          .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok((RawCatalog::load(conn)?, ids))
      })
      .await?;

    let mut joined = raw.into_joined()?;
    joined.retain(|row| active_ids.contains(&row.visit.visit_id));
    Ok(joined)
  }
}
