//! The check-in itself: fetch the tables, decide on a seat, write the
//! registration back.

mod random;
mod roster;

use core::time::Duration;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::SeedableRng as _;
use seat_checkin_config::{Columns, Config, Mode, Seating, Worksheets};
use seat_checkin_sheets::{Memoized, SheetsError, Table, TableStore};
use tracing::{info, warn};

pub use random::eligible_seats;
pub use roster::resolve;

/// What the entered text is matched against in the roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    Identifier,
    Name,
}

/// Outcomes that leave the attendee with an answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckIn {
    Seated { name: String, seat: String },
    /// The registration limit is reached. Derived from the live count on every
    /// submission, nothing marks the event as closed.
    RegistrationClosed { registered: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(thiserror::Error, Debug)]
pub enum CheckInError {
    #[error("入力してください。")]
    EmptyInput,
    #[error("{name}さんは既に登録されています。")]
    Duplicate { name: String },
    #[error("名前が見つかりません。")]
    NameNotFound,
    #[error("番号が見つかりません。")]
    IdentifierNotFound,
    #[error("シートに '{column}' 列が存在しません。")]
    MissingColumn { column: String },
    #[error("{name}さんの座席が名簿に登録されていません。")]
    MissingSeat { name: String },
    #[error("空いている席がありません。")]
    SeatsExhausted,
    #[error("データの取得に失敗しました。後でもう一度お試しください。({0})")]
    Fetch(SheetsError),
    #[error("登録の保存に失敗しました。後でもう一度お試しください。({0})")]
    Save(SheetsError),
}

impl CheckInError {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::EmptyInput
            | Self::Duplicate { .. }
            | Self::NameNotFound
            | Self::IdentifierNotFound => Severity::Warning,
            Self::MissingColumn { .. }
            | Self::MissingSeat { .. }
            | Self::SeatsExhausted
            | Self::Fetch(_)
            | Self::Save(_) => Severity::Error,
        }
    }

    /// The backing store failed, as opposed to a decision about the input.
    #[must_use]
    pub const fn is_provider_error(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Save(_))
    }
}

pub struct CheckInService<S> {
    store: Memoized<S>,
    mode: Mode,
    worksheets: Worksheets,
    columns: Columns,
    seating: Seating,
    /// Held across fetch, decide and save so concurrent submissions cannot both
    /// pass the duplicate and capacity checks before either one writes.
    writer: tokio::sync::Mutex<()>,
    rng: Mutex<StdRng>,
}

impl<S: TableStore> CheckInService<S> {
    pub fn new(store: S, config: &Config) -> Self {
        Self::with_rng(store, config, StdRng::from_entropy())
    }

    pub fn with_rng(store: S, config: &Config, rng: StdRng) -> Self {
        Self::from_parts(
            store,
            config.mode,
            config.worksheets.clone(),
            config.columns.clone(),
            config.seating.clone(),
            config.cache_ttl(),
            rng,
        )
    }

    pub fn from_parts(
        store: S,
        mode: Mode,
        worksheets: Worksheets,
        columns: Columns,
        seating: Seating,
        cache_ttl: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            store: Memoized::new(store, cache_ttl),
            mode,
            worksheets,
            columns,
            seating,
            writer: tokio::sync::Mutex::new(()),
            rng: Mutex::new(rng),
        }
    }

    /// Runs the configured check-in for the entered text. `lookup` only matters
    /// in roster mode.
    pub async fn check_in(&self, input: &str, lookup: Lookup) -> Result<CheckIn, CheckInError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CheckInError::EmptyInput);
        }
        let result = match self.mode {
            Mode::Roster => self.check_in_from_roster(input, lookup).await,
            Mode::Random => self.check_in_with_random_seat(input).await,
        };
        match &result {
            Ok(CheckIn::Seated { name, seat }) => info!(%name, %seat, "checked in"),
            Ok(CheckIn::RegistrationClosed { registered }) => {
                info!(registered, "registration is closed");
            }
            Err(err) if err.is_provider_error() => tracing::error!(%input, "{err}"),
            Err(err) => warn!(%input, "{err}"),
        }
        result
    }

    /// Roster lookup. Both tables are read through the memo.
    pub async fn check_in_from_roster(
        &self,
        input: &str,
        lookup: Lookup,
    ) -> Result<CheckIn, CheckInError> {
        let _writer = self.writer.lock().await;
        let registered = self
            .store
            .fetch(&self.worksheets.registered)
            .await
            .map_err(CheckInError::Fetch)?;
        let roster = self
            .store
            .fetch(&self.worksheets.roster)
            .await
            .map_err(CheckInError::Fetch)?;
        let (name, seat) = resolve(&registered, &roster, &self.columns, input, lookup)?;
        self.register(registered, name, seat).await
    }

    /// Random seat draw. Registrations are always read fresh from the provider.
    pub async fn check_in_with_random_seat(&self, name: &str) -> Result<CheckIn, CheckInError> {
        let _writer = self.writer.lock().await;
        let registered = self
            .store
            .inner()
            .fetch(&self.worksheets.registered)
            .await
            .map_err(CheckInError::Fetch)?;
        if registered.contains(&self.columns.name, name) {
            return Err(CheckInError::Duplicate {
                name: name.to_owned(),
            });
        }
        if registered.len() >= self.seating.max_registrations {
            return Ok(CheckIn::RegistrationClosed {
                registered: registered.len(),
            });
        }
        let seat = self.draw_seat(&registered)?;
        self.register(registered, name.to_owned(), seat.to_string())
            .await
    }

    fn draw_seat(&self, registered: &Table) -> Result<u32, CheckInError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        random::draw_seat(&self.seating, registered, &self.columns.seat, &mut *rng)
    }

    async fn register(
        &self,
        mut registered: Table,
        name: String,
        seat: String,
    ) -> Result<CheckIn, CheckInError> {
        registered.push_record(&[
            (self.columns.name.as_str(), name.as_str()),
            (self.columns.seat.as_str(), seat.as_str()),
        ]);
        self.store
            .save(&self.worksheets.registered, &registered)
            .await
            .map_err(CheckInError::Save)?;
        Ok(CheckIn::Seated { name, seat })
    }
}
