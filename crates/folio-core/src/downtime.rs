//! Downtime: a scheduled unavailability notice for one artefact.
//!
//! A downtime has no explicit state; whether it is upcoming, public or over is
//! derived from the current time against its window. Its message is derived
//! from the window when left blank, and its temporal checks only apply when
//! the record is first created, so a notice whose window has since passed
//! can still be edited.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  safe_html::SafeHtml,
  validation::{Category, Validate, ValidationContext, ValidationErrors, is_blank, require},
};

/// `3:00pm on 10 October`.
const BOUNDARY_FORMAT: &str = "%-I:%M%P on %-d %B";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Downtime {
  pub id:          Uuid,
  /// The artefact this notice belongs to; required.
  pub artefact_id: Option<Uuid>,
  pub message:     Option<String>,
  pub start_time:  Option<DateTime<Utc>>,
  pub end_time:    Option<DateTime<Utc>>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  /// Attributes without a declared field.
  #[serde(flatten)]
  pub extra:       Map<String, Value>,
}

impl Downtime {
  pub fn new(
    artefact_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      id:          Uuid::new_v4(),
      artefact_id: Some(artefact_id),
      message:     None,
      start_time:  Some(start_time),
      end_time:    Some(end_time),
      created_at:  now,
      updated_at:  now,
      extra:       Map::new(),
    }
  }

  /// The message describing this window in `tz`, if both ends are set.
  pub fn derived_message<Tz>(&self, tz: &Tz) -> Option<String>
  where
    Tz: TimeZone,
    Tz::Offset: Display,
  {
    let start = self.start_time?.with_timezone(tz);
    let end = self.end_time?.with_timezone(tz);
    Some(format!(
      "This service will be unavailable between {} and {}",
      start.format(BOUNDARY_FORMAT),
      end.format(BOUNDARY_FORMAT),
    ))
  }

  /// Fill in the message from the window when it is absent or whitespace.
  /// Runs before validation.
  pub fn generate_message<Tz>(&mut self, tz: &Tz)
  where
    Tz: TimeZone,
    Tz::Offset: Display,
  {
    if is_blank(self.message.as_deref())
      && let Some(message) = self.derived_message(tz)
    {
      self.message = Some(message);
    }
  }

  /// Derive the message, then validate.
  pub fn prepare_and_validate<Tz>(&mut self, ctx: &ValidationContext, tz: &Tz) -> ValidationErrors
  where
    Tz: TimeZone,
    Tz::Offset: Display,
  {
    self.generate_message(tz);
    self.validate(ctx)
  }

  /// Whether the notice should be shown at `now`.
  ///
  /// Visibility starts at midnight in `tz` on the day before the start
  /// time's calendar day, whatever the time of day of the start, and ends
  /// at the end time. Both bounds are inclusive. When that midnight does
  /// not exist locally the window opens when the clocks resume.
  pub fn publicise_at<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> bool {
    let (Some(start), Some(end)) = (self.start_time, self.end_time) else {
      return false;
    };
    let Some(day) = start.with_timezone(tz).date_naive().pred_opt() else {
      return false;
    };
    // A DST gap can swallow local midnight; open at the first hour that exists.
    let Some(opens) = (0..24).find_map(|hour| {
      let local = day.and_hms_opt(hour, 0, 0)?;
      tz.from_local_datetime(&local).earliest()
    }) else {
      return false;
    };
    opens.with_timezone(&Utc) <= now && now <= end
  }

  /// [`Self::publicise_at`] for the current time in the local zone.
  pub fn publicise(&self) -> bool { self.publicise_at(Utc::now(), &Local) }
}

impl SafeHtml for Downtime {}

impl Validate for Downtime {
  fn validate(&self, ctx: &ValidationContext) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    require(&mut errors, "message", self.message.as_deref());
    if self.start_time.is_none() {
      errors.blank("start_time");
    }
    if self.end_time.is_none() {
      errors.blank("end_time");
    }
    if self.artefact_id.is_none() {
      errors.blank("artefact");
    }

    if ctx.is_create() {
      if let Some(end) = self.end_time
        && end <= ctx.now
      {
        errors.add("end_time", Category::Timing, "must be in the future");
      }
      if let (Some(start), Some(end)) = (self.start_time, self.end_time)
        && start > end
      {
        errors.add("start_time", Category::Relational, "can't be later than end time");
      }
    }

    self.check_safe_html(&mut errors);
    errors
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
  };

  use super::*;
  use crate::factories;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2030, 3, 14, 9, 30, 0).unwrap() }

  fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
  }

  #[test]
  fn start_time_is_required() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.start_time = None;
    let errors = d.validate(&ValidationContext::create(now()));
    assert_eq!(errors.messages("start_time"), ["can't be blank"]);
  }

  #[test]
  fn end_time_is_required() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.end_time = None;
    let errors = d.validate(&ValidationContext::create(now()));
    assert_eq!(errors.messages("end_time"), ["can't be blank"]);
  }

  #[test]
  fn artefact_is_required() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.artefact_id = None;
    let errors = d.validate(&ValidationContext::create(now()));
    assert_eq!(errors.messages("artefact"), ["can't be blank"]);
  }

  #[test]
  fn end_time_must_be_in_the_future() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.start_time = Some(now() - Duration::days(2));
    d.end_time = Some(now() - Duration::days(1));
    let errors = d.validate(&ValidationContext::create(now()));
    assert_eq!(errors.messages("end_time"), ["must be in the future"]);
    assert_eq!(errors.violations("end_time")[0].category, Category::Timing);
  }

  #[test]
  fn start_time_must_not_follow_end_time() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.start_time = Some(now() + Duration::days(2));
    d.end_time = Some(now() + Duration::days(1));
    let errors = d.validate(&ValidationContext::create(now()));
    assert_eq!(errors.messages("start_time"), ["can't be later than end time"]);
  }

  #[test]
  fn temporal_checks_only_run_on_create() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.start_time = Some(now() + Duration::days(2));
    d.end_time = Some(now() + Duration::days(1));
    assert!(d.is_valid(&ValidationContext::update(now())));

    d.start_time = Some(now() - Duration::days(3));
    d.end_time = Some(now() - Duration::days(2));
    assert!(d.is_valid(&ValidationContext::update(now())));
  }

  #[test]
  fn message_is_generated_when_missing_or_blank() {
    let year = now().year() + 1;
    for message in [None, Some("  ".to_owned())] {
      let mut d = factories::downtime(Uuid::new_v4(), now());
      d.message = message;
      d.start_time = Some(at(year, 10, 10, 15));
      d.end_time = Some(at(year, 10, 11, 18));

      let errors = d.prepare_and_validate(&ValidationContext::create(now()), &Utc);
      assert!(errors.is_empty(), "{errors}");
      assert_eq!(
        d.message.as_deref(),
        Some("This service will be unavailable between 3:00pm on 10 October and 6:00pm on 11 October")
      );
    }
  }

  #[test]
  fn message_uses_the_given_zone() {
    let year = now().year() + 1;
    let local = |d, h| {
      Local
        .from_local_datetime(&NaiveDate::from_ymd_opt(year, 10, d).unwrap().and_hms_opt(h, 0, 0).unwrap())
        .earliest()
        .unwrap()
        .with_timezone(&Utc)
    };
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.message = None;
    d.start_time = Some(local(10, 15));
    d.end_time = Some(local(11, 18));
    d.generate_message(&Local);
    assert_eq!(
      d.message.as_deref(),
      Some("This service will be unavailable between 3:00pm on 10 October and 6:00pm on 11 October")
    );
  }

  #[test]
  fn explicit_message_is_kept() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.message = Some("Back soon".into());
    d.generate_message(&Utc);
    assert_eq!(d.message.as_deref(), Some("Back soon"));
  }

  #[test]
  fn morning_and_single_digit_days_are_unpadded() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.start_time = Some(at(2031, 1, 2, 9));
    d.end_time = Some(at(2031, 1, 2, 12));
    assert_eq!(
      d.derived_message(&Utc).as_deref(),
      Some("This service will be unavailable between 9:00am on 2 January and 12:00pm on 2 January")
    );
  }

  #[test]
  fn publicity_window_opens_at_midnight_the_day_before() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.start_time = Some(at(2030, 10, 10, 21));
    d.end_time = Some(at(2030, 10, 11, 6));

    assert!(d.publicise_at(at(2030, 10, 10, 3), &Utc));
    assert!(d.publicise_at(at(2030, 10, 9, 0), &Utc));
    assert!(!d.publicise_at(at(2030, 10, 9, 0) - Duration::seconds(1), &Utc));
    assert!(!d.publicise_at(at(2030, 10, 8, 21), &Utc));
    assert!(d.publicise_at(at(2030, 10, 11, 6), &Utc));
    assert!(!d.publicise_at(at(2030, 10, 11, 6) + Duration::seconds(1), &Utc));
  }

  /// Clocks go forward at local midnight on 9 October 2030, from UTC to
  /// one hour ahead, so 00:00 to 00:59 that day never happens.
  #[derive(Debug, Clone, Copy)]
  struct SkipsMidnight;

  impl SkipsMidnight {
    fn transition() -> NaiveDateTime { at(2030, 10, 9, 0).naive_utc() }

    fn offset(hours: i32) -> FixedOffset {
      FixedOffset::east_opt(hours * 3600).expect("offset in range")
    }
  }

  impl TimeZone for SkipsMidnight {
    type Offset = FixedOffset;

    fn from_offset(_: &FixedOffset) -> Self { SkipsMidnight }

    fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
      self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
      let gap_end = Self::transition() + Duration::hours(1);
      if *local < Self::transition() {
        LocalResult::Single(Self::offset(0))
      } else if *local < gap_end {
        LocalResult::None
      } else {
        LocalResult::Single(Self::offset(1))
      }
    }

    fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
      self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
      if *utc < Self::transition() { Self::offset(0) } else { Self::offset(1) }
    }
  }

  #[test]
  fn publicity_window_opens_when_clocks_skip_midnight() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.start_time = Some(at(2030, 10, 10, 21));
    d.end_time = Some(at(2030, 10, 11, 6));

    // 01:00 local is the first instant of the day before the start.
    assert!(d.publicise_at(at(2030, 10, 9, 0), &SkipsMidnight));
    assert!(d.publicise_at(at(2030, 10, 10, 12), &SkipsMidnight));
    assert!(!d.publicise_at(at(2030, 10, 9, 0) - Duration::seconds(1), &SkipsMidnight));
  }

  #[test]
  fn unsafe_message_is_rejected() {
    let mut d = factories::downtime(Uuid::new_v4(), now());
    d.message = Some("<script>alert('down')</script>".into());
    let errors = d.validate(&ValidationContext::create(now()));
    assert!(errors.contains("message"));
  }
}
