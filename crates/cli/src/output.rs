// Terminal rendering for characters and storyboards

use colored::Colorize;
use panelcraft_core::application::BatchReport;
use panelcraft_core::domain::{Character, ItemPhase, ItemState, Storyboard};
use tabled::{Table, Tabled};

const PREVIEW_CHARS: usize = 48;

#[derive(Tabled)]
struct CharacterRow {
    id: String,
    name: String,
    description: String,
    reference: String,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    index: usize,
    item: String,
    status: String,
    result: String,
}

pub fn print_characters(characters: &[Character]) {
    if characters.is_empty() {
        println!("{}", "No characters yet".yellow());
        return;
    }
    let rows: Vec<CharacterRow> = characters
        .iter()
        .map(|c| CharacterRow {
            id: c.id.clone(),
            name: c.name.clone(),
            description: preview(&c.description),
            reference: c.image_url.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    println!("{}", Table::new(rows));
}

pub fn print_character(character: &Character) {
    println!("{}", character.name.cyan().bold());
    println!("  {} {}", "ID:".bold(), character.id);
    println!("  {} {}", "Description:".bold(), character.description);
    match &character.image_url {
        Some(url) => println!("  {} {}", "Reference:".bold(), url),
        None => println!("  {} {}", "Reference:".bold(), "none".dimmed()),
    }
}

pub fn print_storyboard(board: &Storyboard) {
    let mut rows = Vec::with_capacity(board.len());
    for (index, panel) in board.panels().iter().enumerate() {
        rows.push(item_row(
            index,
            format!("Panel {}: {}", panel.panel_number, preview(&panel.scene.description)),
            &panel.state,
        ));
    }
    for (index, page) in board.pages().iter().enumerate() {
        rows.push(item_row(
            index,
            format!(
                "Page {}: {} ({} scenes)",
                page.page_number,
                page.display_title(),
                page.scenes.len()
            ),
            &page.state,
        ));
    }
    println!("{}", Table::new(rows));
}

pub fn print_report(report: &BatchReport) {
    let status = &report.status;
    let summary = format!(
        "{} generated, {} failed, {} skipped",
        status.completed, status.failed, report.skipped
    );
    if status.failed == 0 {
        println!("{} {}", "✓".green().bold(), summary.green());
    } else {
        println!("{} {}", "!".yellow().bold(), summary.yellow());
    }
}

fn item_row(index: usize, item: String, state: &ItemState) -> ItemRow {
    let (status, result) = match state.phase() {
        _ if state.generating => ("generating", String::new()),
        ItemPhase::Ready => ("ready", state.image_url().unwrap_or_default().to_string()),
        ItemPhase::Failed => ("failed", state.error.clone().unwrap_or_default()),
        ItemPhase::Empty => ("empty", String::new()),
    };
    ItemRow {
        index,
        item,
        status: status.to_string(),
        result,
    }
}

fn preview(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_CHARS - 1).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelcraft_core::domain::GeneratedImage;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("  short  "), "short");
        let long = "é".repeat(60);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_item_row_status() {
        let mut state = ItemState::default();
        assert_eq!(item_row(0, "p".into(), &state).status, "empty");

        state.begin("panel-1").unwrap();
        assert_eq!(item_row(0, "p".into(), &state).status, "generating");

        state.succeed(GeneratedImage::new("https://oss/1.png"));
        let row = item_row(0, "p".into(), &state);
        assert_eq!(row.status, "ready");
        assert_eq!(row.result, "https://oss/1.png");

        state.begin("panel-1").unwrap();
        state.fail("quota exceeded");
        let row = item_row(0, "p".into(), &state);
        assert_eq!(row.status, "failed");
        assert_eq!(row.result, "quota exceeded");
    }
}
