//! Traveling-visit aggregation: the three derived views over visit+soul joins.
//!
//! All functions are pure. They take an already-fetched snapshot plus the
//! reference date and return rows in their final order; paging happens after.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::{
  project::{AbsentRow, FeedRow, Projector},
  visit::VisitWithSoul,
};

/// Every numbered visit, most recent start first, soul name ascending on ties.
///
/// No deduplication: a soul with five visits yields five rows.
pub fn build_chronological_feed(
  visits: &[VisitWithSoul],
  today: NaiveDate,
  projector: &Projector,
) -> Vec<FeedRow> {
  let mut rows: Vec<FeedRow> = visits
    .iter()
    .filter(|row| row.visit.visit_number.is_some())
    .map(|row| projector.feed_row(row, today))
    .collect();

  // `sort_by` is stable, so full ties keep store order.
  rows.sort_by(|a, b| {
    b.start_date
      .cmp(&a.start_date)
      .then_with(|| a.soul_name.cmp(&b.soul_name))
  });
  rows
}

/// Visits whose window contains `as_of`, in input order.
pub fn build_active_set(
  visits: &[VisitWithSoul],
  as_of: NaiveDate,
) -> Vec<&VisitWithSoul> {
  visits
    .iter()
    .filter(|row| row.visit.is_active_on(as_of))
    .collect()
}

/// One row per distinct soul name, holding that name's latest visit.
///
/// Souls are grouped by `name`, not id, so reruns stored as separate soul rows
/// collapse into one entry. Within a group the visit with the greatest
/// `end_date` wins; on an exact tie the first one seen is kept. Rows are
/// ordered by `days_since_last_visit` ascending, then by name.
pub fn build_longest_absent_ranking(
  visits: &[VisitWithSoul],
  today: NaiveDate,
  projector: &Projector,
) -> Vec<AbsentRow> {
  let mut latest: Vec<&VisitWithSoul> = Vec::new();
  let mut slot_by_name: HashMap<&str, usize> = HashMap::new();

  for row in visits.iter().filter(|r| r.visit.visit_number.is_some()) {
    match slot_by_name.get(row.soul.name.as_str()) {
      Some(&slot) => {
        if row.visit.end_date > latest[slot].visit.end_date {
          latest[slot] = row;
        }
      }
      None => {
        slot_by_name.insert(row.soul.name.as_str(), latest.len());
        latest.push(row);
      }
    }
  }

  let mut rows: Vec<AbsentRow> = latest
    .into_iter()
    .map(|row| projector.absent_row(row, today))
    .collect();

  rows.sort_by(|a, b| {
    a.days_since_last_visit
      .cmp(&b.days_since_last_visit)
      .then_with(|| a.soul.name.cmp(&b.soul.name))
  });
  rows
}

/// Case-insensitive match on soul name, season name, or any keyword.
pub fn matches_query(row: &VisitWithSoul, query: &str) -> bool {
  let needle = query.trim().to_lowercase();
  if needle.is_empty() {
    return true;
  }
  let soul = &row.soul;
  soul.name.to_lowercase().contains(&needle)
    || soul.season_name.to_lowercase().contains(&needle)
    || soul
      .keywords
      .iter()
      .any(|k| k.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;
  use crate::fixtures::{d, joined};

  fn projector() -> Projector { Projector::new("https://cdn.example.com") }

  fn five_visits() -> Vec<VisitWithSoul> {
    vec![
      joined(1, 1, "Bowing Medal", Some(1), d(2024, 1, 4), d(2024, 1, 8)),
      joined(2, 2, "Apologetic Lumberjack", Some(1), d(2024, 1, 4), d(2024, 1, 8)),
      joined(3, 3, "Crab Walker", Some(2), d(2024, 3, 14), d(2024, 3, 18)),
      joined(4, 1, "Bowing Medal", Some(2), d(2024, 5, 2), d(2024, 5, 6)),
      joined(5, 4, "Dozing Gardener", Some(0), d(2023, 11, 9), d(2023, 11, 13)),
    ]
  }

  // ── Chronological feed ──────────────────────────────────────────────────

  #[test]
  fn feed_is_start_desc_then_name_asc() {
    let rows = build_chronological_feed(&five_visits(), d(2024, 6, 1), &projector());
    let ids: Vec<i64> = rows.iter().map(|r| r.visit_id).collect();
    assert_eq!(ids, vec![4, 3, 2, 1, 5]);

    for pair in rows.windows(2) {
      let (a, b) = (&pair[0], &pair[1]);
      assert!(
        a.start_date > b.start_date
          || (a.start_date == b.start_date && a.soul_name <= b.soul_name),
        "{a:?} before {b:?}"
      );
    }
  }

  #[test]
  fn feed_keeps_every_numbered_visit_and_drops_unnumbered() {
    let mut visits = five_visits();
    visits.push(joined(6, 5, "Season Only", None, d(2024, 2, 1), d(2024, 2, 5)));

    let rows = build_chronological_feed(&visits, d(2024, 6, 1), &projector());
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.visit_id != 6));
    assert_eq!(rows.iter().filter(|r| r.soul_name == "Bowing Medal").count(), 2);
  }

  #[test]
  fn feed_marks_rows_active_on_today() {
    let rows = build_chronological_feed(&five_visits(), d(2024, 3, 18), &projector());
    let active: Vec<i64> = rows.iter().filter(|r| r.is_active).map(|r| r.visit_id).collect();
    assert_eq!(active, vec![3]);
  }

  #[test]
  fn feed_is_idempotent() {
    let visits = five_visits();
    let a = build_chronological_feed(&visits, d(2024, 6, 1), &projector());
    let b = build_chronological_feed(&visits, d(2024, 6, 1), &projector());
    assert_eq!(a, b);
  }

  // ── Active set ──────────────────────────────────────────────────────────

  #[test]
  fn active_set_includes_inside_and_excludes_after() {
    let visits = vec![joined(1, 1, "Elder", Some(1), d(2024, 1, 1), d(2024, 1, 31))];
    assert_eq!(build_active_set(&visits, d(2024, 1, 15)).len(), 1);
    assert!(build_active_set(&visits, d(2024, 2, 1)).is_empty());
  }

  #[test]
  fn active_set_preserves_input_order() {
    let visits = vec![
      joined(7, 1, "Zed", Some(1), d(2024, 1, 1), d(2024, 1, 31)),
      joined(3, 2, "Amy", Some(1), d(2024, 1, 10), d(2024, 1, 20)),
      joined(5, 3, "Bob", Some(1), d(2024, 3, 1), d(2024, 3, 2)),
    ];
    let ids: Vec<i64> = build_active_set(&visits, d(2024, 1, 15))
      .iter()
      .map(|r| r.visit.visit_id)
      .collect();
    assert_eq!(ids, vec![7, 3]);
  }

  // ── Longest absent ──────────────────────────────────────────────────────

  #[test]
  fn reruns_with_the_same_name_collapse_into_one_row() {
    let visits = vec![
      joined(1, 10, "Elder", Some(1), d(2024, 1, 5), d(2024, 1, 10)),
      joined(2, 11, "Elder", Some(2), d(2024, 2, 26), d(2024, 3, 1)),
    ];
    let rows = build_longest_absent_ranking(&visits, d(2024, 4, 1), &projector());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].soul.name, "Elder");
    assert_eq!(rows[0].last_visit_date, d(2024, 3, 1));
    assert_eq!(rows[0].days_since_last_visit, 31);
    assert_eq!(rows[0].soul.soul_id, 11);
    assert!(!rows[0].is_active);
  }

  #[test]
  fn one_row_per_distinct_name() {
    let visits = five_visits();
    let rows = build_longest_absent_ranking(&visits, d(2024, 6, 1), &projector());
    let names: HashSet<&str> = visits.iter().map(|v| v.soul.name.as_str()).collect();
    assert_eq!(rows.len(), names.len());

    let medal = rows.iter().find(|r| r.soul.name == "Bowing Medal").unwrap();
    assert_eq!(medal.last_visit_date, d(2024, 5, 6));
    assert_eq!(medal.visit_number, Some(2));
  }

  #[test]
  fn ranking_is_ascending_by_days_absent() {
    let rows = build_longest_absent_ranking(&five_visits(), d(2024, 6, 1), &projector());
    let days: Vec<i64> = rows.iter().map(|r| r.days_since_last_visit).collect();
    let mut sorted = days.clone();
    sorted.sort();
    assert_eq!(days, sorted);
    assert_eq!(rows[0].soul.name, "Bowing Medal");
    assert_eq!(rows.last().unwrap().soul.name, "Dozing Gardener");
  }

  #[test]
  fn equal_absences_are_ordered_by_name() {
    // Inserted out of name order, all ending the same day.
    let visits = vec![
      joined(1, 1, "Prancing Acrobat", Some(1), d(2024, 2, 1), d(2024, 2, 5)),
      joined(2, 2, "Dozing Gardener", Some(1), d(2024, 2, 1), d(2024, 2, 5)),
      joined(3, 3, "Marching Adventurer", Some(1), d(2024, 2, 1), d(2024, 2, 5)),
      joined(4, 4, "Bowing Medal", Some(1), d(2024, 3, 1), d(2024, 3, 5)),
    ];
    let rows = build_longest_absent_ranking(&visits, d(2024, 6, 1), &projector());
    let names: Vec<&str> = rows.iter().map(|r| r.soul.name.as_str()).collect();
    assert_eq!(
      names,
      vec!["Bowing Medal", "Dozing Gardener", "Marching Adventurer", "Prancing Acrobat"]
    );
    assert!(rows[1..].iter().all(|r| r.days_since_last_visit == rows[1].days_since_last_visit));
  }

  #[test]
  fn current_and_future_visits_count_as_zero_days() {
    let visits = vec![
      joined(1, 1, "Now", Some(1), d(2024, 3, 25), d(2024, 4, 5)),
      joined(2, 2, "Later", Some(1), d(2024, 5, 1), d(2024, 5, 5)),
    ];
    let rows = build_longest_absent_ranking(&visits, d(2024, 4, 1), &projector());
    assert!(rows.iter().all(|r| r.days_since_last_visit == 0));
    let now = rows.iter().find(|r| r.soul.name == "Now").unwrap();
    assert!(now.is_active);
  }

  #[test]
  fn unnumbered_visits_are_ignored_by_the_ranking() {
    let visits = vec![
      joined(1, 1, "Elder", Some(1), d(2024, 1, 5), d(2024, 1, 10)),
      joined(2, 1, "Elder", None, d(2024, 3, 5), d(2024, 3, 10)),
      joined(3, 2, "Ghost", None, d(2024, 3, 5), d(2024, 3, 10)),
    ];
    let rows = build_longest_absent_ranking(&visits, d(2024, 4, 1), &projector());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].last_visit_date, d(2024, 1, 10));
  }

  #[test]
  fn empty_input_yields_empty_views() {
    assert!(build_chronological_feed(&[], d(2024, 1, 1), &projector()).is_empty());
    assert!(build_active_set(&[], d(2024, 1, 1)).is_empty());
    assert!(build_longest_absent_ranking(&[], d(2024, 1, 1), &projector()).is_empty());
  }

  #[test]
  fn ranking_is_idempotent() {
    let visits = five_visits();
    let a = build_longest_absent_ranking(&visits, d(2024, 6, 1), &projector());
    let b = build_longest_absent_ranking(&visits, d(2024, 6, 1), &projector());
    assert_eq!(a, b);
  }

  // ── Search ──────────────────────────────────────────────────────────────

  #[test]
  fn query_matches_name_season_and_keywords() {
    let mut row = joined(1, 1, "Bowing Medal", Some(1), d(2024, 1, 1), d(2024, 1, 2));
    row.soul.keywords = vec!["Cape".to_owned()];
    assert!(matches_query(&row, "bowing"));
    assert!(matches_query(&row, "ROOTS"));
    assert!(matches_query(&row, "cap"));
    assert!(matches_query(&row, "  "));
    assert!(!matches_query(&row, "lumberjack"));
  }
}
