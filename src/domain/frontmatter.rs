//! TOML frontmatter for Markdown articles.
//!
//! A document may open with a `+++` fence; everything up to the closing `+++`
//! line is a TOML table using the same keys as the CMS projection
//! (`title`, `slug`, `publishedAt`, `isFeatured`, `category`, `series`,
//! `tags`, `excerpt`, `mainImage`).

use thiserror::Error;

use super::articles::RawArticle;

const FENCE: &str = "+++";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontmatterError {
    #[error("frontmatter fence opened but never closed")]
    Unterminated,
    #[error("frontmatter is not valid TOML: {0}")]
    Toml(String),
    #[error("frontmatter does not describe an article: {0}")]
    Shape(String),
}

/// Split a document into its frontmatter text (if any) and body.
pub fn split_frontmatter(input: &str) -> Result<(Option<&str>, &str), FrontmatterError> {
    let document = input.strip_prefix('\u{feff}').unwrap_or(input);

    let Some(first_line_end) = line_end(document, 0) else {
        return Ok((None, document));
    };
    if document[..first_line_end].trim_end() != FENCE {
        return Ok((None, document));
    }

    let header_start = next_line_start(document, first_line_end);
    let mut cursor = header_start;
    while cursor < document.len() {
        let end = line_end(document, cursor).unwrap_or(document.len());
        if document[cursor..end].trim_end() == FENCE {
            let body_start = next_line_start(document, end);
            return Ok((Some(&document[header_start..cursor]), &document[body_start..]));
        }
        cursor = next_line_start(document, end);
    }

    Err(FrontmatterError::Unterminated)
}

/// Parse frontmatter into a [`RawArticle`], returning the remaining body.
///
/// Documents without frontmatter yield an empty record.
pub fn parse_article(input: &str) -> Result<(RawArticle, &str), FrontmatterError> {
    let (header, body) = split_frontmatter(input)?;
    let Some(header) = header else {
        return Ok((RawArticle::default(), body));
    };

    let mut table: toml::Table =
        toml::from_str(header).map_err(|err| FrontmatterError::Toml(err.to_string()))?;
    for (_, value) in table.iter_mut() {
        stringify_datetimes(value);
    }

    let article = toml::Value::Table(table)
        .try_into::<RawArticle>()
        .map_err(|err| FrontmatterError::Shape(err.to_string()))?;

    Ok((article, body))
}

fn stringify_datetimes(value: &mut toml::Value) {
    match value {
        toml::Value::Datetime(datetime) => *value = toml::Value::String(datetime.to_string()),
        toml::Value::Array(items) => items.iter_mut().for_each(stringify_datetimes),
        toml::Value::Table(table) => table
            .iter_mut()
            .for_each(|(_, value)| stringify_datetimes(value)),
        _ => {}
    }
}

fn line_end(document: &str, from: usize) -> Option<usize> {
    if from >= document.len() {
        return None;
    }
    Some(
        document[from..]
            .find('\n')
            .map_or(document.len(), |offset| from + offset),
    )
}

fn next_line_start(document: &str, line_end: usize) -> usize {
    (line_end + 1).min(document.len())
}
