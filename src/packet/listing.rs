//! Text bodies for list responses.
//!
//! Records are newline separated:
//! - available categories: `ID: <producer>, Category: <category>`
//! - own subscriptions: `Category: <category>`

use super::{Body, Category, ClientId, MAX_BODY_LEN};

/// One line of an available-categories listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryListing {
    pub producer: ClientId,
    pub category: Category,
}

/// Rendered listing plus the number of records that did not fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub body: Body,
    pub omitted: usize,
}

/// Join records into a body, stopping at the last whole record that fits.
fn render(records: impl ExactSizeIterator<Item = String>) -> Rendered {
    let total = records.len();
    let mut text = String::new();
    let mut written = 0;

    for record in records {
        let extra = if text.is_empty() { 0 } else { 1 } + record.len();
        if text.len() + extra > MAX_BODY_LEN {
            break;
        }
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&record);
        written += 1;
    }

    Rendered {
        body: Body::truncated(&text),
        omitted: total - written,
    }
}

pub fn render_categories(listings: &[CategoryListing]) -> Rendered {
    render(
        listings
            .iter()
            .map(|l| format!("ID: {}, Category: {}", l.producer, l.category)),
    )
}

pub fn render_subscriptions(categories: &[Category]) -> Rendered {
    render(categories.iter().map(|c| format!("Category: {}", c)))
}

/// Parse an available-categories body; malformed lines are skipped.
pub fn parse_categories(body: &Body) -> Vec<CategoryListing> {
    body.as_str()
        .lines()
        .filter_map(|line| {
            let (id, category) = line.split_once(", ")?;
            let producer = id.strip_prefix("ID: ")?.trim().parse().ok()?;
            let category = category.strip_prefix("Category: ")?.trim().parse().ok()?;
            Some(CategoryListing {
                producer: ClientId(producer),
                category: Category(category),
            })
        })
        .collect()
}

/// Parse a subscriptions body; malformed lines are skipped.
pub fn parse_subscriptions(body: &Body) -> Vec<Category> {
    body.as_str()
        .lines()
        .filter_map(|line| line.strip_prefix("Category: ")?.trim().parse().ok())
        .map(Category)
        .collect()
}
