use super::ui;
use crate::core::catalog::{self, CatalogEntry, POPULAR_SERIES};
use comfy_table::{Cell, CellAlignment};

/// Renders catalog entries in the order given.
pub fn display_catalog(entries: &[&CatalogEntry]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Category"),
        ui::header_cell("Code"),
        ui::header_cell("Name"),
        ui::header_cell("Description"),
        ui::header_cell("Freq"),
    ]);

    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.category),
            Cell::new(entry.code).set_alignment(CellAlignment::Right),
            Cell::new(entry.name),
            Cell::new(entry.description),
            Cell::new(entry.frequency).set_alignment(CellAlignment::Center),
        ]);
    }
    table.to_string()
}

/// Prints the whole catalog, or the entries matching `query`.
pub fn run(query: Option<&str>) {
    let entries: Vec<&CatalogEntry> = match query {
        Some(q) => catalog::search(q),
        None => POPULAR_SERIES.iter().collect(),
    };

    if entries.is_empty() {
        let message = match query {
            Some(q) => format!("No catalog series match '{q}' (queries need at least 2 characters)"),
            None => "Catalog is empty".to_string(),
        };
        println!("{}", ui::style_text(&message, ui::StyleType::Warning));
        return;
    }

    println!(
        "{}\n",
        ui::style_text("Popular SGS series", ui::StyleType::Title)
    );
    println!("{}", display_catalog(&entries));
    println!(
        "{}",
        ui::style_text(
            &format!("{} series. Any other SGS code can be queried directly.", entries.len()),
            ui::StyleType::Subtle
        )
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_catalog_lists_matches() {
        let entries = catalog::search("selic");
        let output = display_catalog(&entries);
        assert!(output.contains("Selic Target"));
        assert!(output.contains("432"));
        assert!(output.contains("Selic Over"));
        assert!(!output.contains("IPCA"));
    }
}
