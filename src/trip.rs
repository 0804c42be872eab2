//! Community hosted trips: hosting, browsing and joining them.

use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    client::SoonClient,
    id::TripId,
    optimistic::{LocalState, Optimistic},
    profile::UserSummary,
    scroll::LivenessGuard,
};

/// The date format of the host-a-trip form.
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The number of steps in the host-a-trip form.
const LAST_DRAFT_STEP: u8 = 3;

/// A trip hosted by a community member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// The trip's ID.
    #[serde(rename = "_id")]
    pub id: TripId,
    /// The trip's name.
    #[serde(default)]
    pub title: Option<String>,
    /// Where the trip goes.
    #[serde(default)]
    pub location: Option<String>,
    /// What the trip is about.
    #[serde(default)]
    pub description: Option<String>,
    /// Link to the trip's cover photo.
    #[serde(default)]
    pub cover_image: Option<String>,
    /// When the trip starts, as an ISO 8601 timestamp.
    #[serde(default)]
    pub start_date: Option<String>,
    /// When the trip ends, as an ISO 8601 timestamp.
    #[serde(default)]
    pub end_date: Option<String>,
    /// How many travellers the trip takes.
    #[serde(default)]
    pub capacity: Option<u32>,
    /// What the trip costs per traveller.
    #[serde(default)]
    pub price: Option<f64>,
    /// Who hosts the trip.
    #[serde(default)]
    pub host: Option<UserSummary>,
    /// Whether the logged in user has joined.
    #[serde(default)]
    pub is_joined: bool,
    /// How many travellers have joined.
    #[serde(default)]
    pub joined_count: u64,
}

impl Trip {
    /// The trip's dates as "start → end", using only the calendar day of each.
    pub fn date_range(&self) -> Option<String> {
        let day = |date: &Option<String>| {
            date.as_deref()
                .map(|date| date.get(..10).unwrap_or(date).to_owned())
                .unwrap_or_default()
        };

        if self.start_date.is_none() && self.end_date.is_none() {
            return None;
        }

        Some(format!("{} → {}", day(&self.start_date), day(&self.end_date)))
    }
}

/// Whether joining put the user on the trip or on its waitlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStatus {
    /// The user is going on the trip.
    Joined,
    /// The trip is full and the user is waiting for a spot.
    Waitlisted,
}

/// The backend's answer to a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    /// The outcome of the request.
    pub status: JoinStatus,
}

/// The trips shown on a profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserTrips {
    /// Trips the user hosts.
    #[serde(default)]
    pub hosted: Vec<Trip>,
    /// Trips the user has joined.
    #[serde(default)]
    pub joined: Vec<Trip>,
}

/// The payload for hosting a trip. Build it with [TripDraft::to_new_trip].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrip {
    /// The trip's name.
    pub title: String,
    /// Where the trip goes.
    pub location: String,
    /// What the trip is about.
    pub description: String,
    /// Link to the trip's cover photo.
    pub cover_image: String,
    /// The first day, YYYY-MM-DD.
    pub start_date: Option<String>,
    /// The last day, YYYY-MM-DD.
    pub end_date: Option<String>,
    /// How many travellers the trip takes.
    pub capacity: Option<u32>,
    /// What the trip costs per traveller.
    pub price: Option<f64>,
}

/// The host-a-trip form, filled in over three steps.
///
/// Step 1 asks for the title, location and cover image, step 2 for the dates,
/// capacity and price, and step 3 for the description. Fields hold the raw
/// text the user typed and are only checked by [TripDraft::to_new_trip].
#[derive(Debug, Clone, PartialEq)]
pub struct TripDraft {
    step: u8,
    /// The trip's name. Required.
    pub title: String,
    /// Where the trip goes.
    pub location: String,
    /// Link to the trip's cover photo.
    pub cover_image: String,
    /// The first day, YYYY-MM-DD or empty.
    pub start_date: String,
    /// The last day, YYYY-MM-DD or empty.
    pub end_date: String,
    /// A whole number or empty.
    pub capacity: String,
    /// A number or empty.
    pub price: String,
    /// What the trip is about.
    pub description: String,
}

impl Default for TripDraft {
    fn default() -> Self {
        Self {
            step: 1,
            title: String::new(),
            location: String::new(),
            cover_image: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            capacity: String::new(),
            price: String::new(),
            description: String::new(),
        }
    }
}

impl TripDraft {
    /// The current step, from 1 to 3.
    pub fn step(&self) -> u8 {
        self.step
    }

    /// Whether the form is on its last step and can be submitted.
    pub fn is_last_step(&self) -> bool {
        self.step == LAST_DRAFT_STEP
    }

    /// Go to the next step, staying on the last one.
    pub fn next(&mut self) {
        self.step = (self.step + 1).min(LAST_DRAFT_STEP);
    }

    /// Go back a step, staying on the first one.
    pub fn prev(&mut self) {
        self.step = self.step.saturating_sub(1).max(1);
    }

    /// Check the form and convert it to the payload the backend expects.
    ///
    /// Empty dates, capacity and price are sent as null.
    ///
    /// # Errors
    /// Returns [Error::InvalidDraft] if the title is missing, a number or
    /// date cannot be parsed, or the trip ends before it starts.
    pub fn to_new_trip(&self) -> Result<NewTrip, Error> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidDraft("the trip needs a title".to_owned()));
        }

        let start = parse_date(&self.start_date, "start date")?;
        let end = parse_date(&self.end_date, "end date")?;
        if matches!((start, end), (Some(start), Some(end)) if end < start) {
            return Err(Error::InvalidDraft(
                "the trip cannot end before it starts".to_owned(),
            ));
        }

        let capacity = non_empty(&self.capacity)
            .map(|capacity| {
                capacity.parse::<u32>().map_err(|_| {
                    Error::InvalidDraft("capacity must be a whole number".to_owned())
                })
            })
            .transpose()?;

        let price = non_empty(&self.price)
            .map(|price| match price.parse::<f64>() {
                Ok(price) if price.is_finite() && price >= 0.0 => Ok(price),
                _ => Err(Error::InvalidDraft("price must be a number".to_owned())),
            })
            .transpose()?;

        Ok(NewTrip {
            title: title.to_owned(),
            location: self.location.trim().to_owned(),
            description: self.description.trim().to_owned(),
            cover_image: self.cover_image.trim().to_owned(),
            start_date: start.map(|_| self.start_date.trim().to_owned()),
            end_date: end.map(|_| self.end_date.trim().to_owned()),
            capacity,
            price,
        })
    }
}

fn non_empty(field: &str) -> Option<&str> {
    let field = field.trim();
    (!field.is_empty()).then_some(field)
}

fn parse_date(field: &str, name: &str) -> Result<Option<Date>, Error> {
    non_empty(field)
        .map(|date| {
            Date::parse(date, DATE_FORMAT)
                .map_err(|_| Error::InvalidDraft(format!("{name} must be YYYY-MM-DD")))
        })
        .transpose()
}

impl SoonClient {
    /// Get a single trip.
    pub async fn trip(&self, trip_id: &TripId) -> Result<Trip, Error> {
        let result = self.api.trip(trip_id).await;
        self.report(result, "load the trip")
    }

    /// Host the trip described by `draft`.
    ///
    /// The draft is checked before anything is sent.
    pub async fn create_trip(&self, draft: &TripDraft) -> Result<Trip, Error> {
        let Some(token) = self.session.token()? else {
            return self.report(Err(Error::Unauthenticated("host trips")), "host the trip");
        };

        let new_trip = match draft.to_new_trip() {
            Ok(new_trip) => new_trip,
            Err(error) => return self.report(Err(error), "host the trip"),
        };

        let result = self.api.create_trip(&token, &new_trip).await;
        self.report(result, "host the trip")
    }

    /// Join the trip in `trip`.
    ///
    /// The trip shows as joined straight away. If the trip is full the backend
    /// puts the user on the waitlist instead, in which case the trip goes back
    /// to how it was and the user is told they are on the waitlist.
    pub async fn join_trip(
        &self,
        trip: &impl LocalState<Trip>,
        liveness: Option<&LivenessGuard>,
    ) -> Result<JoinResponse, Error> {
        let trip_id = trip.update(|trip: &mut Trip| trip.id.clone())?;

        Optimistic {
            sign_in_to: "join trips",
            failure: "join the trip",
            apply: |trip: &mut Trip| {
                let prior = (trip.is_joined, trip.joined_count);
                if !trip.is_joined {
                    trip.is_joined = true;
                    trip.joined_count += 1;
                }
                Ok(prior)
            },
            request: |token: String| async move { self.api.join_trip(&token, &trip_id).await },
            reconcile: |trip: &mut Trip, response: &JoinResponse, (is_joined, joined_count): (bool, u64)| {
                if response.status == JoinStatus::Waitlisted {
                    trip.is_joined = is_joined;
                    trip.joined_count = joined_count;
                    self.notifications.push("You're on the waitlist");
                }
            },
            rollback: |trip: &mut Trip, (is_joined, joined_count): (bool, u64)| {
                trip.is_joined = is_joined;
                trip.joined_count = joined_count;
            },
        }
        .run(&self.session, &self.notifications, trip, liveness)
        .await
    }
}
