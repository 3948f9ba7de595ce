//! [`SqliteStore`] — the SQLite implementation of [`MedStore`].

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use medbuddy_core::{
  adherence::{NewTakenRecord, TakeOutcome, TakenRecord},
  clock::TimeSpan,
  medication::{Medication, NewMedication},
  store::MedStore,
  user::{NewUser, Session, User, UserCredentials},
  vitals::{NewVitals, Vitals},
};

use crate::{
  Error, Result,
  encode::{
    RawMedication, RawTaken, RawUser, RawVitals, assemble_medications, decode_uuid,
    encode_date, encode_dt, encode_time, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A MedBuddy store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// statements run on the connection's single worker thread, so each
/// `call` closure executes atomically with respect to the others.
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

  /// Open an in-memory store — useful for testing.
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
}

/// Insert one `schedule_times` row per dose time.
fn insert_times(
  tx: &rusqlite::Transaction<'_>,
  medication_id: &str,
  times: &[String],
) -> rusqlite::Result<()> {
  let mut stmt =
    tx.prepare("INSERT INTO schedule_times (medication_id, time) VALUES (?1, ?2)")?;
  for time in times {
    stmt.execute(rusqlite::params![medication_id, time])?;
  }
  Ok(())
}

/// Read a single medication row plus its times.
fn select_medication(
  conn: &rusqlite::Connection,
  medication_id: &str,
) -> rusqlite::Result<Option<(RawMedication, Vec<String>)>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {} FROM medications WHERE medication_id = ?1",
        RawMedication::COLUMNS
      ),
      rusqlite::params![medication_id],
      RawMedication::from_row,
    )
    .optional()?;

  let Some(raw) = raw else { return Ok(None) };

  let mut stmt = conn.prepare(
    "SELECT time FROM schedule_times WHERE medication_id = ?1 ORDER BY time",
  )?;
  let times = stmt
    .query_map(rusqlite::params![medication_id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;

  Ok(Some((raw, times)))
}

fn select_taken(
  conn: &rusqlite::Connection,
  medication_id: &str,
  scheduled_for: &str,
) -> rusqlite::Result<Option<RawTaken>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM taken_records WHERE medication_id = ?1 AND scheduled_for = ?2",
        RawTaken::COLUMNS
      ),
      rusqlite::params![medication_id, scheduled_for],
      RawTaken::from_row,
    )
    .optional()
}

// ─── MedStore impl ───────────────────────────────────────────────────────────

impl MedStore for SqliteStore {
  type Error = Error;

  // ── Users & sessions ──────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<Option<User>> {
    let user = User {
      user_id:    Uuid::new_v4(),
      email:      input.email,
      timezone:   input.timezone,
      created_at: Utc::now().trunc_subsecs(0),
    };

    let id_str    = encode_uuid(user.user_id);
    let email     = user.email.clone();
    let timezone  = user.timezone.clone();
    let at_str    = encode_dt(user.created_at);
    let hash      = input.password_hash;

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO users (user_id, email, password_hash, timezone, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (email) DO NOTHING",
          rusqlite::params![id_str, email, hash, timezone, at_str],
        )?;
        Ok(n == 1)
      })
      .await?;

    Ok(inserted.then_some(user))
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS),
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn get_credentials(&self, email: &str) -> Result<Option<UserCredentials>> {
    let email = email.to_owned();

    let row: Option<(RawUser, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {}, password_hash FROM users WHERE email = ?1",
                RawUser::COLUMNS
              ),
              rusqlite::params![email],
              |row| Ok((RawUser::from_row(row)?, row.get(4)?)),
            )
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(raw, password_hash)| {
        Ok(UserCredentials { user: raw.into_user()?, password_hash })
      })
      .transpose()
  }

  async fn add_session(&self, session: Session) -> Result<()> {
    let user_str = encode_uuid(session.user_id);
    let exp_str  = encode_dt(session.expires_at);
    let hash     = session.token_hash;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![hash, user_str, exp_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session_user(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<User>> {
    let hash    = token_hash.to_owned();
    let now_str = encode_dt(now);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT u.user_id, u.email, u.timezone, u.created_at
               FROM sessions s
               JOIN users u ON u.user_id = s.user_id
               WHERE s.token_hash = ?1 AND s.expires_at > ?2",
              rusqlite::params![hash, now_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Medications ───────────────────────────────────────────────────────────

  async fn add_medication(&self, user_id: Uuid, input: NewMedication) -> Result<Medication> {
    let med = Medication {
      medication_id: Uuid::new_v4(),
      user_id,
      name:          input.name,
      dose:          input.dose,
      times:         input.times,
      active:        input.active,
      quantity:      input.quantity,
      created_at:    Utc::now().trunc_subsecs(0),
    };

    let id_str    = encode_uuid(med.medication_id);
    let user_str  = encode_uuid(user_id);
    let name      = med.name.clone();
    let dose      = med.dose.clone();
    let from_str  = encode_date(med.active.from);
    let until_str = med.active.until.map(encode_date);
    let quantity  = med.quantity.map(i64::from);
    let at_str    = encode_dt(med.created_at);
    let times: Vec<String> = med.times.iter().copied().map(encode_time).collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO medications (
             medication_id, user_id, name, dose,
             active_from, active_until, quantity, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, user_str, name, dose, from_str, until_str, quantity, at_str,
          ],
        )?;
        insert_times(&tx, &id_str, &times)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(med)
  }

  async fn get_medication(&self, medication_id: Uuid) -> Result<Option<Medication>> {
    let id_str = encode_uuid(medication_id);

    let row = self
      .conn
      .call(move |conn| Ok(select_medication(conn, &id_str)?))
      .await?;

    row
      .map(|(raw, times)| raw.into_medication(&times))
      .transpose()
  }

  async fn list_medications(&self, user_id: Uuid) -> Result<Vec<Medication>> {
    let user_str = encode_uuid(user_id);

    let (raws, time_rows) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM medications WHERE user_id = ?1",
          RawMedication::COLUMNS
        ))?;
        let raws = stmt
          .query_map(rusqlite::params![user_str], RawMedication::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT t.medication_id, t.time
           FROM schedule_times t
           JOIN medications m ON m.medication_id = t.medication_id
           WHERE m.user_id = ?1",
        )?;
        let time_rows = stmt
          .query_map(rusqlite::params![user_str], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<(String, String)>>>()?;

        Ok((raws, time_rows))
      })
      .await?;

    assemble_medications(raws, time_rows)
  }

  async fn replace_medication(
    &self,
    medication_id: Uuid,
    input: NewMedication,
  ) -> Result<Option<Medication>> {
    let id_str    = encode_uuid(medication_id);
    let name      = input.name;
    let dose      = input.dose;
    let from_str  = encode_date(input.active.from);
    let until_str = input.active.until.map(encode_date);
    let quantity  = input.quantity.map(i64::from);
    let times: Vec<String> = input.times.into_iter().map(encode_time).collect();

    let row = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "UPDATE medications
           SET name = ?2, dose = ?3, active_from = ?4, active_until = ?5, quantity = ?6
           WHERE medication_id = ?1",
          rusqlite::params![id_str, name, dose, from_str, until_str, quantity],
        )?;
        if n == 0 {
          // Dropping the transaction rolls it back.
          return Ok(None);
        }
        tx.execute(
          "DELETE FROM schedule_times WHERE medication_id = ?1",
          rusqlite::params![id_str],
        )?;
        insert_times(&tx, &id_str, &times)?;
        let row = select_medication(&tx, &id_str)?;
        tx.commit()?;
        Ok(row)
      })
      .await?;

    row
      .map(|(raw, times)| raw.into_medication(&times))
      .transpose()
  }

  async fn delete_medication(&self, medication_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(medication_id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Children first; the FK cascade is not relied upon.
        tx.execute(
          "DELETE FROM taken_records WHERE medication_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM schedule_times WHERE medication_id = ?1",
          rusqlite::params![id_str],
        )?;
        let n = tx.execute(
          "DELETE FROM medications WHERE medication_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }

  // ── Adherence ledger ──────────────────────────────────────────────────────

  async fn find_taken(
    &self,
    medication_id: Uuid,
    scheduled_for: DateTime<Utc>,
  ) -> Result<Option<TakenRecord>> {
    let med_str = encode_uuid(medication_id);
    let at_str  = encode_dt(scheduled_for);

    let raw = self
      .conn
      .call(move |conn| Ok(select_taken(conn, &med_str, &at_str)?))
      .await?;

    raw.map(RawTaken::into_record).transpose()
  }

  async fn insert_taken(&self, input: NewTakenRecord) -> Result<TakeOutcome> {
    let taken_id = Uuid::new_v4();
    let id_str   = encode_uuid(taken_id);
    let med_str  = encode_uuid(input.medication_id);
    let at_str   = encode_dt(input.scheduled_for);
    let when_str = input.taken_at.map(encode_dt);

    let (inserted, raw) = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO taken_records (taken_id, medication_id, scheduled_for, taken_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (medication_id, scheduled_for) DO NOTHING",
          rusqlite::params![id_str, med_str, at_str, when_str],
        )?;
        let raw = select_taken(conn, &med_str, &at_str)?;
        Ok((n == 1, raw))
      })
      .await?;

    let record = raw
      .ok_or_else(|| Error::Decode(format!("taken record {taken_id} vanished after insert")))?
      .into_record()?;

    if inserted {
      Ok(TakeOutcome::Created(record))
    } else {
      tracing::debug!(
        medication_id = %record.medication_id,
        scheduled_for = %record.scheduled_for,
        "uniqueness conflict on taken record"
      );
      Ok(TakeOutcome::AlreadyMarked(record))
    }
  }

  async fn delete_taken(&self, medication_id: Uuid, scheduled_for: DateTime<Utc>) -> Result<bool> {
    let med_str = encode_uuid(medication_id);
    let at_str  = encode_dt(scheduled_for);

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM taken_records WHERE medication_id = ?1 AND scheduled_for = ?2",
          rusqlite::params![med_str, at_str],
        )?)
      })
      .await?;

    Ok(n > 0)
  }

  async fn list_taken(&self, user_id: Uuid, span: Option<TimeSpan>) -> Result<Vec<TakenRecord>> {
    let user_str  = encode_uuid(user_id);
    let start_str = span.map(|s| encode_dt(s.start));
    let end_str   = span.map(|s| encode_dt(s.end));

    let raws: Vec<RawTaken> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT t.taken_id, t.medication_id, t.scheduled_for, t.taken_at
           FROM taken_records t
           JOIN medications m ON m.medication_id = t.medication_id
           WHERE m.user_id = ?1
             AND (?2 IS NULL OR t.scheduled_for >= ?2)
             AND (?3 IS NULL OR t.scheduled_for < ?3)
           ORDER BY t.scheduled_for, t.medication_id",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_str, start_str, end_str],
            RawTaken::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTaken::into_record).collect()
  }

  async fn taken_counts(&self, user_id: Uuid) -> Result<HashMap<Uuid, u64>> {
    let user_str = encode_uuid(user_id);

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT t.medication_id, COUNT(*)
           FROM taken_records t
           JOIN medications m ON m.medication_id = t.medication_id
           WHERE m.user_id = ?1
           GROUP BY t.medication_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, count)| {
        let count = u64::try_from(count)
          .map_err(|e| Error::Decode(format!("taken count: {e}")))?;
        Ok((decode_uuid(&id)?, count))
      })
      .collect()
  }

  // ── Vitals ────────────────────────────────────────────────────────────────

  async fn add_vitals(&self, user_id: Uuid, input: NewVitals) -> Result<Vitals> {
    let vitals = Vitals {
      vitals_id:   Uuid::new_v4(),
      user_id,
      systolic:    input.systolic,
      diastolic:   input.diastolic,
      heart_rate:  input.heart_rate,
      temperature: input.temperature,
      record_time: input.record_time.trunc_subsecs(0),
    };

    let id_str   = encode_uuid(vitals.vitals_id);
    let user_str = encode_uuid(user_id);
    let at_str   = encode_dt(vitals.record_time);
    let (systolic, diastolic, heart_rate, temperature) =
      (vitals.systolic, vitals.diastolic, vitals.heart_rate, vitals.temperature);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO vitals (
             vitals_id, user_id, systolic, diastolic, heart_rate, temperature, record_time
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, user_str, systolic, diastolic, heart_rate, temperature, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(vitals)
  }

  async fn list_vitals(&self, user_id: Uuid) -> Result<Vec<Vitals>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawVitals> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM vitals WHERE user_id = ?1 ORDER BY record_time DESC",
          RawVitals::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], RawVitals::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVitals::into_vitals).collect()
  }
}
