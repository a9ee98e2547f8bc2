//! Console commands.

use cidadania_core::{Category, DayOfWeek};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Toggle the live stream
    Play,
    Volume(i32),
    Mute,
    /// Reload the feed; `None` shows every category
    News(Option<Category>),
    /// Share the article at this 1-based position in the feed
    Share(usize),
    /// Show the schedule for a day, or the selected day
    Schedule(Option<DayOfWeek>),
    Now,
    Contact,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Comando desconhecido: {0} (digite 'help')")]
    Unknown(String),

    #[error("Uso: {0}")]
    Usage(&'static str),

    #[error("Categoria desconhecida: {0}")]
    UnknownCategory(String),

    #[error("Dia desconhecido: {0} (use segunda ... domingo)")]
    UnknownDay(String),
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match name.to_lowercase().as_str() {
        "play" | "p" | "tocar" => Command::Play,
        "vol" | "volume" => {
            let level = arg
                .and_then(|a| a.parse::<i32>().ok())
                .ok_or(CommandError::Usage("vol <0-100>"))?;
            Command::Volume(level)
        }
        "mute" | "m" | "mudo" => Command::Mute,
        "news" | "noticias" => match arg.map(str::to_lowercase).as_deref() {
            None | Some("all" | "todas") => Command::News(None),
            Some(category) => Command::News(Some(
                category
                    .parse::<Category>()
                    .map_err(|_| CommandError::UnknownCategory(category.to_string()))?,
            )),
        },
        "share" | "compartilhar" => {
            let position = arg
                .and_then(|a| a.parse::<usize>().ok())
                .filter(|&n| n > 0)
                .ok_or(CommandError::Usage("share <n>"))?;
            Command::Share(position)
        }
        "schedule" | "programacao" => match arg {
            None => Command::Schedule(None),
            Some(day) => Command::Schedule(Some(
                day.to_lowercase()
                    .parse::<DayOfWeek>()
                    .map_err(|_| CommandError::UnknownDay(day.to_string()))?,
            )),
        },
        "now" | "agora" => Command::Now,
        "contact" | "contato" => Command::Contact,
        "status" => Command::Status,
        "help" | "ajuda" | "?" => Command::Help,
        "quit" | "exit" | "sair" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}
