//! Plain-text rendering of the player, the news feed and the schedule.

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use cidadania_core::{
    Category, CoreError, DayOfWeek, DayView, NewsArticle, PlaybackSession, Program, StationConfig,
    SyncState, CONTACT_FAILED,
};
use std::fmt::Write;

pub const EMPTY_FEED: &str = "Nenhuma notícia disponível no momento.";
pub const NOTHING_SCHEDULED: &str = "Nenhum programa agendado para este dia.";

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Long pt-BR date, e.g. `01 de fevereiro de 2024`
pub fn format_date(date: NaiveDate) -> String {
    let month = usize::try_from(date.month0())
        .ok()
        .and_then(|index| MONTHS.get(index))
        .copied()
        .unwrap_or_default();
    format!("{:02} de {} de {}", date.day(), month, date.year())
}

/// Calendar day of `at` in `zone`
pub fn calendar_date<Tz: TimeZone>(at: DateTime<Utc>, zone: &Tz) -> NaiveDate {
    at.with_timezone(zone).date_naive()
}

/// The docked player bar
pub fn player_line(
    station: &StationConfig,
    session: &PlaybackSession,
    on_air: Option<&Program>,
) -> String {
    let transport = if session.is_playing { "■" } else { "▶" };
    let banner = on_air.map_or_else(
        || format!("{} • {}", station.name, station.frequency),
        |p| format!("Programa {} com {} • {}", p.title, p.host, station.frequency),
    );
    let volume = if session.is_muted {
        "Mudo".to_string()
    } else {
        format!("{}%", session.effective_gain())
    };

    format!("{transport} Ao Vivo | {banner} | {volume}")
}

fn category_title(category: Option<Category>) -> &'static str {
    category.map_or("Todas", Category::label)
}

/// The news feed with 1-based positions used by `share`
pub fn feed_view(state: &SyncState<NewsArticle>, category: Option<Category>) -> String {
    let mut out = format!("Notícias ({})\n", category_title(category));

    // Idle renders as loading until the first query settles
    if matches!(state, SyncState::Idle | SyncState::Loading) {
        out.push_str("  Carregando notícias...\n");
        return out;
    }
    if state.items().is_empty() {
        let _ = writeln!(out, "  {EMPTY_FEED}");
        return out;
    }

    for (index, article) in state.items().iter().enumerate() {
        let _ = write!(
            out,
            "  {}. [{}] {}\n     {}",
            index + 1,
            article.category.label(),
            article.title,
            format_date(calendar_date(article.created_at, &Local))
        );
        if let Some(author) = article.author.as_deref().filter(|a| !a.is_empty()) {
            let _ = write!(out, " • por {author}");
        }
        out.push('\n');
    }
    out
}

/// One day of the schedule
pub fn day_view(day: DayOfWeek, view: &DayView) -> String {
    let mut out = format!("Programação: {}\n", day.label());

    match view {
        DayView::Loading => out.push_str("  Carregando programação...\n"),
        DayView::NothingScheduled => {
            let _ = writeln!(out, "  {NOTHING_SCHEDULED}");
        }
        DayView::Programs(programs) => {
            for program in programs {
                let _ = writeln!(
                    out,
                    "  {}  {} (com {})",
                    program.slot_label(),
                    program.title,
                    program.host
                );
                if let Some(description) = program.description.as_deref().filter(|d| !d.is_empty())
                {
                    let _ = writeln!(out, "                 {description}");
                }
            }
        }
    }
    out
}

/// Message for a contact form that was not sent.
///
/// Store failures return `None`: the error toast already covers them.
pub fn contact_error(error: &CoreError) -> Option<String> {
    let message = match error {
        CoreError::StoreRequestFailed { .. } | CoreError::NetworkError(_) => return None,
        CoreError::InvalidContactField { field: "name", .. } => "Informe seu nome.".to_string(),
        CoreError::InvalidContactField { field: "email", .. } => {
            "Informe um e-mail válido.".to_string()
        }
        CoreError::InvalidContactField {
            field: "message", ..
        } => "Escreva sua mensagem.".to_string(),
        CoreError::InvalidContactField { field, .. } => format!("Verifique o campo {field}."),
        CoreError::UnknownSubject { value } => {
            format!("Assunto inválido: {value}. Escolha um número da lista.")
        }
        _ => CONTACT_FAILED.to_string(),
    };
    Some(message)
}

pub const HELP: &str = "\
Comandos:
  play                 tocar / pausar a transmissão ao vivo
  vol <0-100>          ajustar o volume
  mute                 silenciar / restaurar o som
  news [categoria|all] listar notícias (destaque, eventos, radio, saude, educacao, esportes)
  share <n>            compartilhar a notícia n
  schedule [dia]       programação do dia (segunda ... domingo)
  now                  programa no ar agora
  contact              enviar uma mensagem para a rádio
  status               mostrar o player
  quit                 sair
";
