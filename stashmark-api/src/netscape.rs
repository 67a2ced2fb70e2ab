//! Netscape bookmark file format, as exported and imported by browsers.
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::sync::OnceLock;

use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use stashmark_types::{Bookmark, Folder};

use crate::pipeline::metadata::{clean_text, selector};

const HEADER: &str = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<!-- This is an automatically generated file.
     It will be read and overwritten.
     DO NOT EDIT! -->
<META HTTP-EQUIV="Content-Type" CONTENT="text/html; charset=UTF-8">
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
"#;

/// A link read from a bookmark file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetscapeLink {
    pub url: String,
    pub name: Option<String>,
    /// Text of the `<DD>` right after the link.
    pub description: Option<String>,
    /// Comma separated `TAGS` attribute.
    pub tags: Vec<String>,
}

/// Collects every http(s) link of the file in document order. Folder structure is ignored.
pub fn parse(html: &str) -> Vec<NetscapeLink> {
    static LINK: OnceLock<Selector> = OnceLock::new();

    let document = Html::parse_document(html);
    document
        .select(selector(&LINK, "a[href]"))
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            let scheme = href.split_once(':')?.0.to_ascii_lowercase();
            if scheme != "http" && scheme != "https" {
                return None;
            }
            let tags = el
                .value()
                .attr("tags")
                .map(|tags| {
                    tags.split(',')
                        .filter_map(clean_text)
                        .unique()
                        .collect_vec()
                })
                .unwrap_or_default();
            Some(NetscapeLink {
                url: href.to_string(),
                name: clean_text(&el.text().collect::<String>()),
                description: description_of(el),
                tags,
            })
        })
        .collect()
}

/// Own text of the `<DD>` following the link's `<DT>`, nested lists excluded.
fn description_of(link: ElementRef) -> Option<String> {
    let dt = link.parent().and_then(ElementRef::wrap)?;
    let dd = dt.next_siblings().find_map(ElementRef::wrap)?;
    if dd.value().name() != "dd" {
        return None;
    }
    let text: String = dd
        .children()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect();
    clean_text(&text)
}

/// Renders folders and bookmarks as a nested Netscape file. Bookmarks whose folder is not
/// among `folders` end up at the top level.
pub fn render(folders: &[Folder], bookmarks: &[Bookmark]) -> String {
    let known: HashSet<i32> = folders.iter().map(|f| f.id).collect();
    let parent_of = |id: Option<i32>| id.filter(|id| known.contains(id));

    let children: HashMap<Option<i32>, Vec<&Folder>> = folders
        .iter()
        .sorted_by(|a, b| a.name.cmp(&b.name))
        .into_group_map_by(|f| parent_of(f.parent_id));
    let contents: HashMap<Option<i32>, Vec<&Bookmark>> = bookmarks
        .iter()
        .into_group_map_by(|m| parent_of(m.folder_id));

    let mut out = String::from(HEADER);
    let mut visited = HashSet::new();
    render_level(&mut out, None, 0, &children, &contents, &mut visited);
    out
}

fn render_level(
    out: &mut String,
    folder_id: Option<i32>,
    depth: usize,
    children: &HashMap<Option<i32>, Vec<&Folder>>,
    contents: &HashMap<Option<i32>, Vec<&Bookmark>>,
    visited: &mut HashSet<i32>,
) {
    let indent = "    ".repeat(depth);
    _ = writeln!(out, "{indent}<DL><p>");

    for folder in children.get(&folder_id).into_iter().flatten() {
        if !visited.insert(folder.id) {
            continue;
        }
        _ = writeln!(
            out,
            r#"{indent}    <DT><H3 ADD_DATE="{}" LAST_MODIFIED="{}">{}</H3>"#,
            folder.created_at.unix_timestamp(),
            folder.updated_at.unix_timestamp(),
            escape(&folder.name)
        );
        if let Some(description) = &folder.description {
            _ = writeln!(out, "{indent}    <DD>{}", escape(description));
        }
        render_level(out, Some(folder.id), depth + 1, children, contents, visited);
    }

    for m in contents.get(&folder_id).into_iter().flatten() {
        _ = write!(
            out,
            r#"{indent}    <DT><A HREF="{}" ADD_DATE="{}" LAST_MODIFIED="{}""#,
            escape(&m.url),
            m.created_at.unix_timestamp(),
            m.updated_at.unix_timestamp(),
        );
        if let Some(favicon) = &m.favicon {
            _ = write!(out, r#" ICON_URI="{}""#, escape(favicon));
        }
        if !m.tags.is_empty() {
            _ = write!(out, r#" TAGS="{}""#, escape(&m.tags.join(",")));
        }
        _ = writeln!(out, ">{}</A>", escape(&m.name));
        if let Some(description) = &m.description {
            _ = writeln!(out, "{indent}    <DD>{}", escape(description));
        }
    }

    _ = writeln!(out, "{indent}</DL><p>");
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
