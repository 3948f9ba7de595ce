//! Integration tests for `SqliteStore` against an in-memory database, plus
//! end-to-end checks of the `Tracker` running on top of it.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use medbuddy_core::{
  EngineConfig, Error as CoreError, TimezonePolicy, Tracker,
  adherence::{NewTakenRecord, TakeOutcome, UntakeOutcome},
  clock::{TimeSpan, parse_instant},
  medication::{MedicationDraft, NewMedication},
  schedule::ScheduledTime,
  store::MedStore,
  user::{NewUser, Session, User},
  vitals::NewVitals,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn utc(s: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

fn times(list: &[&str]) -> Vec<ScheduledTime> {
  list.iter().map(|t| t.parse().unwrap()).collect()
}

async fn user(s: &SqliteStore, email: &str, timezone: &str) -> User {
  s.add_user(NewUser {
    email:         email.to_owned(),
    password_hash: "$argon2id$stub".to_owned(),
    timezone:      timezone.to_owned(),
  })
  .await
  .unwrap()
  .expect("fresh email")
}

fn new_med(name: &str, at: &[&str], quantity: Option<u32>) -> NewMedication {
  NewMedication::new(
    name,
    Some("500mg".to_owned()),
    times(at),
    date("2025-01-01"),
    None,
    quantity,
  )
  .unwrap()
}

fn draft(name: &str, at: &[&str]) -> MedicationDraft {
  MedicationDraft {
    name:       name.to_owned(),
    dose:       Some("500mg".to_owned()),
    times:      times(at),
    start_date: Some(date("2025-01-15")),
    end_date:   None,
    quantity:   Some(10),
  }
}

fn tracker(s: &SqliteStore) -> Tracker<SqliteStore> {
  Tracker::new(Arc::new(s.clone()), EngineConfig::default())
}

// ─── Users & sessions ────────────────────────────────────────────────────────

#[tokio::test]
async fn add_user_and_fetch_credentials() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "Asia/Kolkata").await;

  let fetched = s.get_user(u.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.email, "asha@example.com");
  assert_eq!(fetched.timezone, "Asia/Kolkata");

  let creds = s.get_credentials("asha@example.com").await.unwrap().unwrap();
  assert_eq!(creds.user.user_id, u.user_id);
  assert_eq!(creds.password_hash, "$argon2id$stub");

  assert!(s.get_credentials("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  user(&s, "asha@example.com", "UTC").await;

  let again = s
    .add_user(NewUser {
      email:         "asha@example.com".to_owned(),
      password_hash: "other".to_owned(),
      timezone:      "UTC".to_owned(),
    })
    .await
    .unwrap();
  assert!(again.is_none());
}

#[tokio::test]
async fn sessions_expire() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let now = utc("2025-01-15T08:00:00Z");

  s.add_session(Session {
    token_hash: "abc123".to_owned(),
    user_id:    u.user_id,
    expires_at: now + Duration::hours(1),
  })
  .await
  .unwrap();

  let found = s.session_user("abc123", now).await.unwrap();
  assert_eq!(found.map(|u| u.user_id), Some(u.user_id));

  assert!(s.session_user("abc123", now + Duration::hours(2)).await.unwrap().is_none());
  assert!(s.session_user("unknown", now).await.unwrap().is_none());
}

// ─── Medications ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_medication() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;

  let med = s
    .add_medication(u.user_id, new_med("Paracetamol", &["20:00", "08:00"], Some(30)))
    .await
    .unwrap();

  let fetched = s.get_medication(med.medication_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Paracetamol");
  assert_eq!(fetched.dose.as_deref(), Some("500mg"));
  assert_eq!(fetched.times, times(&["08:00", "20:00"]));
  assert_eq!(fetched.quantity, Some(30));
  assert_eq!(fetched.active.from, date("2025-01-01"));
  assert_eq!(fetched.active.until, None);

  assert!(s.get_medication(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_medications_is_per_user() {
  let s = store().await;
  let a = user(&s, "a@example.com", "UTC").await;
  let b = user(&s, "b@example.com", "UTC").await;

  s.add_medication(a.user_id, new_med("A1", &["08:00"], None)).await.unwrap();
  s.add_medication(a.user_id, new_med("A2", &["09:00", "21:00"], None)).await.unwrap();
  s.add_medication(b.user_id, new_med("B1", &["10:00"], None)).await.unwrap();

  let mut meds = s.list_medications(a.user_id).await.unwrap();
  meds.sort_by(|x, y| x.name.cmp(&y.name));
  assert_eq!(meds.len(), 2);
  assert_eq!(meds[1].times, times(&["09:00", "21:00"]));

  assert_eq!(s.list_medications(b.user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn replace_medication_swaps_times_wholesale() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let med = s
    .add_medication(u.user_id, new_med("Paracetamol", &["08:00", "20:00"], None))
    .await
    .unwrap();

  let replaced = s
    .replace_medication(med.medication_id, new_med("Paracetamol XR", &["12:00"], Some(5)))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(replaced.name, "Paracetamol XR");
  assert_eq!(replaced.times, times(&["12:00"]));
  assert_eq!(replaced.quantity, Some(5));
  assert_eq!(replaced.created_at, med.created_at);

  let missing = s
    .replace_medication(Uuid::new_v4(), new_med("Ghost", &["12:00"], None))
    .await
    .unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn delete_medication_removes_its_ledger() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let med = s
    .add_medication(u.user_id, new_med("Paracetamol", &["08:00"], None))
    .await
    .unwrap();
  s.insert_taken(NewTakenRecord {
    medication_id: med.medication_id,
    scheduled_for: utc("2025-01-15T08:00:00Z"),
    taken_at:      None,
  })
  .await
  .unwrap();

  assert!(s.delete_medication(med.medication_id).await.unwrap());
  assert!(s.get_medication(med.medication_id).await.unwrap().is_none());
  assert!(s.list_taken(u.user_id, None).await.unwrap().is_empty());
  assert!(!s.delete_medication(med.medication_id).await.unwrap());
}

// ─── Adherence ledger ────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_taken_conflict_returns_existing() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let med = s
    .add_medication(u.user_id, new_med("Paracetamol", &["08:00"], None))
    .await
    .unwrap();
  let at = utc("2025-01-15T08:00:00Z");

  let first = s
    .insert_taken(NewTakenRecord {
      medication_id: med.medication_id,
      scheduled_for: at,
      taken_at:      Some(utc("2025-01-15T08:02:00Z")),
    })
    .await
    .unwrap();
  assert!(first.is_created());

  let second = s
    .insert_taken(NewTakenRecord {
      medication_id: med.medication_id,
      scheduled_for: at,
      taken_at:      Some(utc("2025-01-15T08:09:00Z")),
    })
    .await
    .unwrap();
  match &second {
    TakeOutcome::AlreadyMarked(existing) => {
      assert_eq!(existing.taken_id, first.record().taken_id);
      assert_eq!(existing.taken_at, Some(utc("2025-01-15T08:02:00Z")));
    }
    other => panic!("expected AlreadyMarked, got {other:?}"),
  }

  assert_eq!(s.list_taken(u.user_id, None).await.unwrap().len(), 1);
  let found = s.find_taken(med.medication_id, at).await.unwrap().unwrap();
  assert_eq!(found.taken_id, first.record().taken_id);
}

#[tokio::test]
async fn list_taken_respects_span() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let med = s
    .add_medication(u.user_id, new_med("Paracetamol", &["08:00"], None))
    .await
    .unwrap();

  for at in ["2025-01-14T08:00:00Z", "2025-01-15T08:00:00Z", "2025-01-16T00:00:00Z"] {
    s.insert_taken(NewTakenRecord {
      medication_id: med.medication_id,
      scheduled_for: utc(at),
      taken_at:      None,
    })
    .await
    .unwrap();
  }

  let span = TimeSpan::local_day(date("2025-01-15"), chrono_tz::UTC);
  let day = s.list_taken(u.user_id, Some(span)).await.unwrap();
  assert_eq!(day.len(), 1);
  assert_eq!(day[0].scheduled_for, utc("2025-01-15T08:00:00Z"));

  let all = s.list_taken(u.user_id, None).await.unwrap();
  let instants: Vec<_> = all.iter().map(|r| r.scheduled_for).collect();
  assert_eq!(
    instants,
    [
      utc("2025-01-14T08:00:00Z"),
      utc("2025-01-15T08:00:00Z"),
      utc("2025-01-16T00:00:00Z"),
    ]
  );
}

#[tokio::test]
async fn taken_counts_group_by_medication() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let a = s.add_medication(u.user_id, new_med("A", &["08:00"], None)).await.unwrap();
  let b = s.add_medication(u.user_id, new_med("B", &["08:00"], None)).await.unwrap();

  for at in ["2025-01-14T08:00:00Z", "2025-01-15T08:00:00Z"] {
    s.insert_taken(NewTakenRecord {
      medication_id: a.medication_id,
      scheduled_for: utc(at),
      taken_at:      None,
    })
    .await
    .unwrap();
  }

  let counts = s.taken_counts(u.user_id).await.unwrap();
  assert_eq!(counts.get(&a.medication_id), Some(&2));
  assert_eq!(counts.get(&b.medication_id), None);
}

// ─── Vitals ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn vitals_are_listed_newest_first() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;

  let older = NewVitals::new(Some(120), Some(80), Some(72), None, utc("2025-01-14T08:00:00Z"))
    .unwrap();
  let newer = NewVitals::new(None, None, None, Some(37.2), utc("2025-01-15T08:00:00Z")).unwrap();
  s.add_vitals(u.user_id, older).await.unwrap();
  s.add_vitals(u.user_id, newer).await.unwrap();

  let list = s.list_vitals(u.user_id).await.unwrap();
  assert_eq!(list.len(), 2);
  assert_eq!(list[0].temperature, Some(37.2));
  assert_eq!(list[1].systolic, Some(120));
  assert_eq!(list[1].diastolic, Some(80));
  assert_eq!(list[1].heart_rate, Some(72));
}

#[tokio::test]
async fn vitals_are_stored_to_the_second() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;

  let input = NewVitals {
    systolic:    None,
    diastolic:   None,
    heart_rate:  Some(70),
    temperature: None,
    record_time: utc("2025-01-14T08:00:00.750Z"),
  };
  let added = s.add_vitals(u.user_id, input).await.unwrap();
  assert_eq!(added.record_time, utc("2025-01-14T08:00:00Z"));

  let list = s.list_vitals(u.user_id).await.unwrap();
  assert_eq!(list.len(), 1);
  assert_eq!(list[0].record_time, added.record_time);
}

// ─── Tracker over SQLite ─────────────────────────────────────────────────────

#[tokio::test]
async fn paracetamol_morning_dose_for_utc_user() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let t = tracker(&s);
  let now = utc("2025-01-15T08:02:00Z");

  let med = t
    .create_medication(&u, draft("Paracetamol", &["08:00", "20:00"]), now)
    .await
    .unwrap();

  let due = t.reminders(&u, now, None, None).await.unwrap();
  assert_eq!(due.len(), 1);
  assert_eq!(due[0].medication_id, med.medication_id);
  assert_eq!(due[0].scheduled_for.to_rfc3339(), "2025-01-15T08:00:00+00:00");

  let outcome = t
    .mark_taken(&u, med.medication_id, Some(due[0].scheduled_for), None, now)
    .await
    .unwrap();
  assert_eq!(outcome.status(), "ok");
  assert_eq!(outcome.record().taken_at, Some(now));

  assert!(t.reminders(&u, now, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn paracetamol_morning_dose_for_kolkata_user() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "Asia/Kolkata").await;
  let t = tracker(&s);
  // 08:02 in Kolkata.
  let now = utc("2025-01-15T02:32:00Z");

  t.create_medication(&u, draft("Paracetamol", &["08:00", "20:00"]), now)
    .await
    .unwrap();

  let due = t.reminders(&u, now, None, None).await.unwrap();
  assert_eq!(due.len(), 1);
  assert_eq!(due[0].scheduled_for.to_rfc3339(), "2025-01-15T08:00:00+05:30");

  // The same instant is not "due" for someone living in UTC.
  let v = user(&s, "ben@example.com", "UTC").await;
  t.create_medication(&v, draft("Paracetamol", &["08:00", "20:00"]), now)
    .await
    .unwrap();
  assert!(t.reminders(&v, now, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn marking_twice_is_idempotent() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let t = tracker(&s);
  let now = utc("2025-01-15T08:02:00Z");
  let med = t
    .create_medication(&u, draft("Paracetamol", &["08:00"]), now)
    .await
    .unwrap();
  let at = parse_instant("2025-01-15T08:00:00Z").unwrap();

  let first = t.mark_taken(&u, med.medication_id, Some(at), None, now).await.unwrap();
  let second = t
    .mark_taken(&u, med.medication_id, Some(at), None, now + Duration::minutes(1))
    .await
    .unwrap();

  assert_eq!(first.status(), "ok");
  assert_eq!(second.status(), "already_marked");
  assert_eq!(first.record().taken_id, second.record().taken_id);
  assert_eq!(t.list_taken(&u, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn same_instant_in_other_offset_hits_same_key() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "Asia/Kolkata").await;
  let t = tracker(&s);
  let now = utc("2025-01-15T02:32:00Z");
  let med = t
    .create_medication(&u, draft("Paracetamol", &["08:00"]), now)
    .await
    .unwrap();

  let local = parse_instant("2025-01-15T08:00:45+05:30").unwrap();
  let as_utc = parse_instant("2025-01-15T02:30:00Z").unwrap();

  assert_eq!(t.mark_taken(&u, med.medication_id, Some(local), None, now).await.unwrap().status(), "ok");
  assert_eq!(
    t.mark_taken(&u, med.medication_id, Some(as_utc), None, now).await.unwrap().status(),
    "already_marked"
  );
}

#[tokio::test]
async fn take_then_untake_restores_reminder() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let t = tracker(&s);
  let now = utc("2025-01-15T08:02:00Z");
  let med = t
    .create_medication(&u, draft("Paracetamol", &["08:00"]), now)
    .await
    .unwrap();
  let at = parse_instant("2025-01-15T08:00:00Z").unwrap();

  let before = t.reminders(&u, now, None, None).await.unwrap();
  t.mark_taken(&u, med.medication_id, Some(at), None, now).await.unwrap();
  assert_eq!(
    t.unmark_taken(&u, med.medication_id, at).await.unwrap(),
    UntakeOutcome::Removed
  );
  let after = t.reminders(&u, now, None, None).await.unwrap();
  assert_eq!(before, after);

  assert_eq!(
    t.unmark_taken(&u, med.medication_id, at).await.unwrap(),
    UntakeOutcome::NotFound
  );
}

#[tokio::test]
async fn missing_scheduled_for_uses_now_truncated() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let t = tracker(&s);
  let now = utc("2025-01-15T08:02:37Z");
  let med = t
    .create_medication(&u, draft("Paracetamol", &["08:00"]), now)
    .await
    .unwrap();

  let outcome = t.mark_taken(&u, med.medication_id, None, None, now).await.unwrap();
  assert_eq!(outcome.record().scheduled_for, utc("2025-01-15T08:02:00Z"));
}

#[tokio::test]
async fn other_users_medication_is_not_found() {
  let s = store().await;
  let owner = user(&s, "owner@example.com", "UTC").await;
  let intruder = user(&s, "intruder@example.com", "UTC").await;
  let t = tracker(&s);
  let now = utc("2025-01-15T08:02:00Z");
  let med = t
    .create_medication(&owner, draft("Paracetamol", &["08:00"]), now)
    .await
    .unwrap();

  let err = t
    .mark_taken(&intruder, med.medication_id, None, None, now)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::MedicationNotFound(id) if id == med.medication_id));

  let err = t.delete_medication(&intruder, med.medication_id).await.unwrap_err();
  assert!(matches!(err, CoreError::MedicationNotFound(_)));

  assert!(t.list_taken(&owner, None).await.unwrap().is_empty());
  assert_eq!(t.list_medications(&owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_medication_is_not_found() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let t = tracker(&s);

  let err = t
    .mark_taken(&u, Uuid::new_v4(), None, None, utc("2025-01-15T08:00:00Z"))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::MedicationNotFound(_)));
}

#[tokio::test]
async fn list_taken_filters_by_users_local_date() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "Asia/Kolkata").await;
  let t = tracker(&s);
  let now = utc("2025-01-15T02:32:00Z");
  let med = t
    .create_medication(&u, draft("Paracetamol", &["08:00"]), now)
    .await
    .unwrap();

  // 00:15 on the 16th in Kolkata, still the 15th in UTC.
  let late = parse_instant("2025-01-15T18:45:00Z").unwrap();
  let morning = parse_instant("2025-01-15T08:00:00+05:30").unwrap();
  t.mark_taken(&u, med.medication_id, Some(late), None, now).await.unwrap();
  t.mark_taken(&u, med.medication_id, Some(morning), None, now).await.unwrap();

  let on_15th = t.list_taken(&u, Some(date("2025-01-15"))).await.unwrap();
  assert_eq!(on_15th.len(), 1);
  assert_eq!(on_15th[0].scheduled_for, utc("2025-01-15T02:30:00Z"));

  let on_16th = t.list_taken(&u, Some(date("2025-01-16"))).await.unwrap();
  assert_eq!(on_16th.len(), 1);
  assert_eq!(on_16th[0].scheduled_for, utc("2025-01-15T18:45:00Z"));
}

#[tokio::test]
async fn quantity_left_subtracts_taken_doses() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let t = tracker(&s);
  let now = utc("2025-01-15T08:02:00Z");
  let med = t
    .create_medication(&u, draft("Paracetamol", &["08:00", "20:00"]), now)
    .await
    .unwrap();

  for at in ["2025-01-15T08:00:00Z", "2025-01-15T20:00:00Z"] {
    t.mark_taken(&u, med.medication_id, Some(parse_instant(at).unwrap()), None, now)
      .await
      .unwrap();
  }

  let list = t.list_medications(&u).await.unwrap();
  assert_eq!(list.len(), 1);
  assert_eq!(list[0].quantity_left, Some(8));
}

#[tokio::test]
async fn update_keeps_start_date_when_omitted() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "UTC").await;
  let t = tracker(&s);
  let now = utc("2025-01-15T08:02:00Z");
  let med = t
    .create_medication(&u, draft("Paracetamol", &["08:00"]), now)
    .await
    .unwrap();

  let mut edit = draft("Paracetamol", &["09:00"]);
  edit.start_date = None;
  let updated = t.update_medication(&u, med.medication_id, edit).await.unwrap();
  assert_eq!(updated.active.from, date("2025-01-15"));
  assert_eq!(updated.times, times(&["09:00"]));
}

#[tokio::test]
async fn create_defaults_start_to_users_today() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "Asia/Kolkata").await;
  let t = tracker(&s);
  // Already the 16th in Kolkata.
  let now = utc("2025-01-15T20:00:00Z");

  let mut input = draft("Paracetamol", &["08:00"]);
  input.start_date = None;
  let med = t.create_medication(&u, input, now).await.unwrap();
  assert_eq!(med.active.from, date("2025-01-16"));
}

#[tokio::test]
async fn unusable_stored_zone_follows_timezone_policy() {
  let s = store().await;
  let u = user(&s, "asha@example.com", "Mars/Olympus").await;
  let t = tracker(&s);
  // 08:02 in Kolkata, the default zone.
  let now = utc("2025-01-15T02:32:00Z");

  t.create_medication(&u, draft("Paracetamol", &["08:00", "20:00"]), now)
    .await
    .unwrap();

  let due = t.reminders(&u, now, None, None).await.unwrap();
  assert_eq!(due.len(), 1);
  assert_eq!(due[0].scheduled_for.to_rfc3339(), "2025-01-15T08:00:00+05:30");

  let strict = Tracker::new(Arc::new(s.clone()), EngineConfig {
    timezone_policy: TimezonePolicy::Reject,
    ..EngineConfig::default()
  });
  let err = strict.reminders(&u, now, None, None).await.unwrap_err();
  assert!(matches!(err, CoreError::UnknownTimezone(ref id) if id == "Mars/Olympus"));
}
