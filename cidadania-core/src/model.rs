//! Records read from (and written to) the content store.
//!
//! Category, day of week and contact subject are closed enumerations: values
//! the store sends that are not listed here fail to deserialize, so the row is
//! rejected at the ingestion boundary instead of reaching a view.

use crate::error::CoreError;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// News article category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Destaque,
    Eventos,
    Radio,
    Saude,
    Educacao,
    Esportes,
}

impl Category {
    /// All categories in the order the filter bar shows them
    pub const ALL: [Self; 6] = [
        Self::Destaque,
        Self::Eventos,
        Self::Radio,
        Self::Saude,
        Self::Educacao,
        Self::Esportes,
    ];

    /// Identifier stored in the `category` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Destaque => "destaque",
            Self::Eventos => "eventos",
            Self::Radio => "radio",
            Self::Saude => "saude",
            Self::Educacao => "educacao",
            Self::Esportes => "esportes",
        }
    }

    /// Human readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Destaque => "Destaque",
            Self::Eventos => "Eventos",
            Self::Radio => "Rádio",
            Self::Saude => "Saúde",
            Self::Educacao => "Educação",
            Self::Esportes => "Esportes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::UnknownCategory {
                value: s.to_string(),
            })
    }
}

/// Day of week a program airs on.
///
/// Ordering follows the broadcast week, Monday first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    #[default]
    Segunda,
    Terca,
    Quarta,
    Quinta,
    Sexta,
    Sabado,
    Domingo,
}

impl DayOfWeek {
    /// All days in week order
    pub const ALL: [Self; 7] = [
        Self::Segunda,
        Self::Terca,
        Self::Quarta,
        Self::Quinta,
        Self::Sexta,
        Self::Sabado,
        Self::Domingo,
    ];

    /// Identifier stored in the `day_of_week` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Segunda => "segunda",
            Self::Terca => "terca",
            Self::Quarta => "quarta",
            Self::Quinta => "quinta",
            Self::Sexta => "sexta",
            Self::Sabado => "sabado",
            Self::Domingo => "domingo",
        }
    }

    /// Human readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Segunda => "Segunda-feira",
            Self::Terca => "Terça-feira",
            Self::Quarta => "Quarta-feira",
            Self::Quinta => "Quinta-feira",
            Self::Sexta => "Sexta-feira",
            Self::Sabado => "Sábado",
            Self::Domingo => "Domingo",
        }
    }

    /// The day before, wrapping from segunda to domingo
    #[must_use]
    pub const fn previous(self) -> Self {
        match self {
            Self::Segunda => Self::Domingo,
            Self::Terca => Self::Segunda,
            Self::Quarta => Self::Terca,
            Self::Quinta => Self::Quarta,
            Self::Sexta => Self::Quinta,
            Self::Sabado => Self::Sexta,
            Self::Domingo => Self::Sabado,
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Self::Segunda,
            Weekday::Tue => Self::Terca,
            Weekday::Wed => Self::Quarta,
            Weekday::Thu => Self::Quinta,
            Weekday::Fri => Self::Sexta,
            Weekday::Sat => Self::Sabado,
            Weekday::Sun => Self::Domingo,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| CoreError::UnknownDay {
                value: s.to_string(),
            })
    }
}

/// Parse a time of day written as `HH:MM` or `HH:MM:SS`
///
/// # Errors
///
/// Returns [`CoreError::InvalidTime`] for anything else.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, CoreError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| CoreError::InvalidTime {
            value: value.to_string(),
        })
}

/// Serde adapter for `time` columns
mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M:%S"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw).map_err(serde::de::Error::custom)
    }
}

/// A news article as stored in the `news` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Editor who owns the record
    pub user_id: String,
}

/// A weekly program as stored in the `programs` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub host: String,
    pub host_photo: Option<String>,
    pub day_of_week: DayOfWeek,
    #[serde(with = "time_of_day")]
    pub start_time: NaiveTime,
    #[serde(with = "time_of_day")]
    pub end_time: NaiveTime,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Program {
    /// A program whose end is not after its start runs past midnight
    #[must_use]
    pub fn runs_past_midnight(&self) -> bool {
        self.end_time <= self.start_time
    }

    /// Whether the program is on air at `time` on its own day.
    ///
    /// Overnight programs air from `start_time` to the end of their day here;
    /// the remainder is covered by [`Program::airs_after_midnight_at`].
    #[must_use]
    pub fn airs_at(&self, time: NaiveTime) -> bool {
        if self.runs_past_midnight() {
            self.start_time <= time
        } else {
            self.start_time <= time && time < self.end_time
        }
    }

    /// Whether an overnight program is still on air at `time` on the following day
    #[must_use]
    pub fn airs_after_midnight_at(&self, time: NaiveTime) -> bool {
        self.runs_past_midnight() && time < self.end_time
    }

    /// Time slot formatted as `HH:MM - HH:MM`
    #[must_use]
    pub fn slot_label(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

/// Subject picked on the contact form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactSubject {
    #[serde(rename = "Sugestão de Programa")]
    SugestaoDePrograma,
    #[serde(rename = "Reclamação")]
    Reclamacao,
    #[serde(rename = "Elogio")]
    Elogio,
    #[serde(rename = "Dúvida")]
    Duvida,
    #[serde(rename = "Parceria")]
    Parceria,
    #[serde(rename = "Outro")]
    Outro,
}

impl ContactSubject {
    pub const ALL: [Self; 6] = [
        Self::SugestaoDePrograma,
        Self::Reclamacao,
        Self::Elogio,
        Self::Duvida,
        Self::Parceria,
        Self::Outro,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SugestaoDePrograma => "Sugestão de Programa",
            Self::Reclamacao => "Reclamação",
            Self::Elogio => "Elogio",
            Self::Duvida => "Dúvida",
            Self::Parceria => "Parceria",
            Self::Outro => "Outro",
        }
    }
}

impl fmt::Display for ContactSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContactSubject {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|subject| subject.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::UnknownSubject {
                value: s.to_string(),
            })
    }
}

/// Insert payload for the `contacts` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: ContactSubject,
    pub message: String,
    pub read: bool,
}
