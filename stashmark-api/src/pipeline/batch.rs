use itertools::Itertools;
use stashmark_types::{BatchReport, Operation};
use tracing::{info, warn};

use super::limiter::{run_bounded, Progress};
use super::metadata::MetadataFetcher;
use super::report::{aggregate, ItemKey};
use super::writer::{BookmarkWriter, ResyncMode};
use crate::db::bookmark::{NewBookmark, ResyncBookmark};
use crate::utils::{ItemError, PipelineError};

/// Where imported bookmarks land. Folder ownership and tag ids are resolved by the caller
/// before the batch starts.
#[derive(Debug, Clone, Default)]
pub struct ImportTarget {
    pub user_id: i32,
    pub folder_id: Option<i32>,
    pub tag_ids: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportItem {
    pub url: String,
    /// Used when the page has no title.
    pub name: Option<String>,
    /// Used when the page has no description.
    pub description: Option<String>,
    /// Added on top of the target's tags.
    pub tag_ids: Vec<i32>,
}

impl ImportItem {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

pub async fn import_bookmarks<F, W, P>(
    fetcher: &F,
    writer: &W,
    target: &ImportTarget,
    items: Vec<ImportItem>,
    concurrency: usize,
    on_progress: P,
) -> Result<BatchReport, PipelineError>
where
    F: MetadataFetcher + ?Sized,
    W: BookmarkWriter + ?Sized,
    P: FnMut(Progress),
{
    let keys = items.iter().map(|i| ItemKey::url(i.url.clone())).collect();
    let outcomes = run_bounded(
        items,
        concurrency,
        |item| import_one(fetcher, writer, target, item),
        on_progress,
    )
    .await?;

    let report = aggregate(Operation::Import, keys, outcomes);
    info!(
        user_id = target.user_id,
        succeeded = report.succeeded,
        failed = report.failed,
        "import finished"
    );
    Ok(report)
}

async fn import_one<F, W>(
    fetcher: &F,
    writer: &W,
    target: &ImportTarget,
    item: ImportItem,
) -> Result<i32, ItemError>
where
    F: MetadataFetcher + ?Sized,
    W: BookmarkWriter + ?Sized,
{
    let url = item.url.trim().to_string();
    let metadata = fetcher
        .fetch(&url)
        .await
        .inspect_err(|e| warn!(%url, error = %e, "failed to fetch metadata"))?;

    let name = metadata
        .title
        .or(item.name)
        .unwrap_or_else(|| url.clone());
    let new_bookmark = NewBookmark {
        user_id: target.user_id,
        folder_id: target.folder_id,
        url,
        name,
        description: metadata.description.or(item.description),
        favicon: metadata.favicon,
        image: metadata.image,
        is_favorite: false,
    };

    let tag_ids = target
        .tag_ids
        .iter()
        .chain(&item.tag_ids)
        .copied()
        .sorted()
        .dedup()
        .collect_vec();
    let m = writer.create(new_bookmark, &tag_ids).await?;
    Ok(m.id)
}

pub async fn resync_bookmarks<F, W, P>(
    fetcher: &F,
    writer: &W,
    user_id: i32,
    ids: Vec<i32>,
    mode: ResyncMode,
    concurrency: usize,
    on_progress: P,
) -> Result<BatchReport, PipelineError>
where
    F: MetadataFetcher + ?Sized,
    W: BookmarkWriter + ?Sized,
    P: FnMut(Progress),
{
    let keys = ids.iter().copied().map(ItemKey::id).collect();
    let outcomes = run_bounded(
        ids,
        concurrency,
        |id| async move {
            let m = writer.find(user_id, id).await?;
            let metadata = fetcher
                .fetch(&m.url)
                .await
                .inspect_err(|e| warn!(id, url = %m.url, error = %e, "failed to fetch metadata"))?;
            let changes = ResyncBookmark::new(&metadata, mode);
            writer.resync(user_id, id, changes).await.map(|m| m.id)
        },
        on_progress,
    )
    .await?;

    let report = aggregate(Operation::Resync, keys, outcomes);
    info!(
        user_id,
        ?mode,
        succeeded = report.succeeded,
        failed = report.failed,
        "resync finished"
    );
    Ok(report)
}

pub async fn delete_bookmarks<W, P>(
    writer: &W,
    user_id: i32,
    ids: Vec<i32>,
    concurrency: usize,
    on_progress: P,
) -> Result<BatchReport, PipelineError>
where
    W: BookmarkWriter + ?Sized,
    P: FnMut(Progress),
{
    let keys = ids.iter().copied().map(ItemKey::id).collect();
    let outcomes = run_bounded(
        ids,
        concurrency,
        |id| async move { writer.delete(user_id, id).await.map(|_| id) },
        on_progress,
    )
    .await?;

    let report = aggregate(Operation::Delete, keys, outcomes);
    info!(
        user_id,
        succeeded = report.succeeded,
        failed = report.failed,
        "delete finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::bookmark::test::fake_bookmark;
    use crate::db::bookmark::Bookmark;
    use crate::pipeline::metadata::{truncate, PageMetadata, TITLE_MAX_CHARS};
    use crate::utils::{DatabaseError, FetchError};

    use stashmark_types::BatchStatus;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves pages from memory. URLs containing "unreachable" fail, every fetch yields a
    /// few times so that items interleave.
    #[derive(Default)]
    struct FakeFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[rocket::async_trait]
    impl MetadataFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<PageMetadata, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let call = self.calls.fetch_add(1, Ordering::SeqCst);

            for _ in 0..(1 + call % 4) {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.contains("unreachable") {
                return Err(FetchError::Timeout);
            }
            Ok(PageMetadata {
                title: Some(truncate(&format!("Title of {url}"), TITLE_MAX_CHARS)),
                description: Some(format!("About {url}")),
                image: Some(format!("{url}/cover.png")),
                favicon: Some(format!("{url}/favicon.ico")),
            })
        }
    }

    /// In-memory rows. URLs containing "conflict" fail to insert.
    #[derive(Default)]
    struct FakeWriter {
        next_id: AtomicI32,
        rows: Mutex<HashMap<i32, Bookmark>>,
        links: Mutex<Vec<(i32, i32)>>,
    }

    impl FakeWriter {
        fn insert(&self, m: Bookmark) {
            self.next_id.fetch_max(m.id, Ordering::SeqCst);
            self.rows.lock().unwrap().insert(m.id, m);
        }

        fn row(&self, id: i32) -> Option<Bookmark> {
            self.rows.lock().unwrap().get(&id).cloned()
        }
    }

    #[rocket::async_trait]
    impl BookmarkWriter for FakeWriter {
        async fn create(&self, new: NewBookmark, tag_ids: &[i32]) -> Result<Bookmark, ItemError> {
            tokio::task::yield_now().await;
            if new.url.contains("conflict") {
                return Err(DatabaseError::ViolationError().into());
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let mut m = fake_bookmark(id, new.user_id);
            m.folder_id = new.folder_id;
            m.url = new.url;
            m.name = new.name;
            m.description = new.description;
            m.favicon = new.favicon;
            m.image = new.image;
            self.rows.lock().unwrap().insert(id, m.clone());
            self.links
                .lock()
                .unwrap()
                .extend(tag_ids.iter().map(|&tag_id| (id, tag_id)));
            Ok(m)
        }

        async fn find(&self, user_id: i32, id: i32) -> Result<Bookmark, ItemError> {
            self.row(id)
                .filter(|m| m.user_id == user_id)
                .ok_or(ItemError::NotFound(id))
        }

        async fn resync(
            &self,
            user_id: i32,
            id: i32,
            changes: ResyncBookmark,
        ) -> Result<Bookmark, ItemError> {
            let mut rows = self.rows.lock().unwrap();
            let m = rows
                .get_mut(&id)
                .filter(|m| m.user_id == user_id)
                .ok_or(ItemError::NotFound(id))?;
            changes.apply(m);
            Ok(m.clone())
        }

        async fn delete(&self, user_id: i32, id: i32) -> Result<(), ItemError> {
            let mut rows = self.rows.lock().unwrap();
            match rows.get(&id) {
                Some(m) if m.user_id == user_id => {
                    rows.remove(&id);
                    Ok(())
                }
                _ => Err(ItemError::NotFound(id)),
            }
        }
    }

    fn target() -> ImportTarget {
        ImportTarget {
            user_id: 1,
            folder_id: Some(5),
            tag_ids: vec![7, 8],
        }
    }

    fn urls(n: usize) -> Vec<ImportItem> {
        (0..n)
            .map(|i| ImportItem::url(format!("https://site{i}.example")))
            .collect()
    }

    #[tokio::test]
    async fn imports_all_urls() {
        let fetcher = FakeFetcher::default();
        let writer = FakeWriter::default();
        let mut progress = Vec::new();

        let report = import_bookmarks(&fetcher, &writer, &target(), urls(12), 10, |p| {
            progress.push(p)
        })
        .await
        .unwrap();

        assert_eq!(report.items.len(), 12);
        assert_eq!(report.succeeded, 12);
        assert_eq!(report.status, BatchStatus::Success);
        assert_eq!(report.message, "12/12 succeeded");
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 10);
        assert_eq!(progress.len(), 12);

        for (i, item) in report.items.iter().enumerate() {
            let url = format!("https://site{i}.example");
            assert_eq!(item.url.as_deref(), Some(url.as_str()));
            let m = writer.row(item.id.unwrap()).unwrap();
            assert_eq!(m.url, url);
            assert_eq!(m.name, format!("Title of {url}"));
            assert_eq!(m.folder_id, Some(5));
        }
        assert_eq!(writer.links.lock().unwrap().len(), 24);
    }

    #[tokio::test]
    async fn unreachable_url_fails_alone() {
        let fetcher = FakeFetcher::default();
        let writer = FakeWriter::default();
        let items = vec![
            ImportItem::url("https://one.example"),
            ImportItem::url("https://unreachable.example"),
            ImportItem::url("https://three.example"),
        ];

        let report = import_bookmarks(&fetcher, &writer, &target(), items, 4, |_| {})
            .await
            .unwrap();

        assert_eq!(
            report.items.iter().map(|i| i.success).collect::<Vec<_>>(),
            vec![true, false, true]
        );
        assert_eq!(
            report.items[1].error.as_deref(),
            Some("failed to fetch metadata: request timed out")
        );
        assert_eq!(report.items[1].id, None);
        assert_eq!(report.status, BatchStatus::Partial);
        assert_eq!(report.message, "2 imported, 1 failed");
        assert_eq!(writer.rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn write_failure_is_reported_per_item() {
        let fetcher = FakeFetcher::default();
        let writer = FakeWriter::default();
        let items = vec![
            ImportItem::url("https://conflict.example"),
            ImportItem::url("https://fine.example"),
        ];

        let report = import_bookmarks(&fetcher, &writer, &target(), items, 2, |_| {})
            .await
            .unwrap();

        assert!(!report.items[0].success);
        assert_eq!(
            report.items[0].error.as_deref(),
            Some("foreign key constraint violation")
        );
        assert!(report.items[1].success);
        // a failed item leaves no tag links behind
        assert_eq!(writer.links.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn all_failed_import() {
        let fetcher = FakeFetcher::default();
        let writer = FakeWriter::default();
        let items = vec![
            ImportItem::url("https://unreachable-a.example"),
            ImportItem::url("not a url but unreachable"),
        ];
        let report = import_bookmarks(&fetcher, &writer, &target(), items, 2, |_| {})
            .await
            .unwrap();
        assert_eq!(report.status, BatchStatus::Failure);
        assert_eq!(report.message, "2/2 failed");
    }

    #[tokio::test]
    async fn caps_concurrent_fetches() {
        let fetcher = FakeFetcher::default();
        let writer = FakeWriter::default();

        let report = import_bookmarks(&fetcher, &writer, &target(), urls(30), 4, |_| {})
            .await
            .unwrap();

        assert_eq!(report.succeeded, 30);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn falls_back_to_given_name() {
        struct Untitled;

        #[rocket::async_trait]
        impl MetadataFetcher for Untitled {
            async fn fetch(&self, _url: &str) -> Result<PageMetadata, FetchError> {
                Ok(PageMetadata::default())
            }
        }

        let writer = FakeWriter::default();
        let items = vec![
            ImportItem {
                url: "https://a.example".to_string(),
                name: Some("From the file".to_string()),
                description: Some("Kept from the file".to_string()),
                ..Default::default()
            },
            ImportItem::url("https://b.example"),
        ];
        let report = import_bookmarks(&Untitled, &writer, &target(), items, 2, |_| {})
            .await
            .unwrap();

        let names: Vec<String> = report
            .items
            .iter()
            .map(|i| writer.row(i.id.unwrap()).unwrap().name)
            .collect();
        assert_eq!(names, vec!["From the file", "https://b.example"]);

        let first = writer.row(report.items[0].id.unwrap()).unwrap();
        assert_eq!(first.description.as_deref(), Some("Kept from the file"));
    }

    #[tokio::test]
    async fn merges_item_tags_with_target_tags() {
        let fetcher = FakeFetcher::default();
        let writer = FakeWriter::default();
        let items = vec![
            ImportItem {
                url: "https://tagged.example".to_string(),
                tag_ids: vec![9, 7],
                ..Default::default()
            },
            ImportItem::url("https://plain.example"),
        ];
        let report = import_bookmarks(&fetcher, &writer, &target(), items, 2, |_| {})
            .await
            .unwrap();
        let tagged = report.items[0].id.unwrap();
        let plain = report.items[1].id.unwrap();

        let links = writer.links.lock().unwrap();
        let tags_of = |id: i32| {
            links
                .iter()
                .filter(|(m, _)| *m == id)
                .map(|(_, t)| *t)
                .sorted()
                .collect_vec()
        };
        assert_eq!(tags_of(tagged), vec![7, 8, 9]);
        assert_eq!(tags_of(plain), vec![7, 8]);
    }

    #[tokio::test]
    async fn resync_assets_only_keeps_text() {
        let fetcher = FakeFetcher::default();
        let writer = FakeWriter::default();
        writer.insert(fake_bookmark(1, 1));
        writer.insert(fake_bookmark(2, 1));

        let report = resync_bookmarks(
            &fetcher,
            &writer,
            1,
            vec![1, 2],
            ResyncMode::AssetsOnly,
            4,
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(report.message, "2/2 succeeded");
        for id in [1, 2] {
            let m = writer.row(id).unwrap();
            assert_eq!(m.name, "Example");
            assert_eq!(m.description.as_deref(), Some("An example page"));
            assert_eq!(
                m.favicon,
                Some(format!("https://example.com/{id}/favicon.ico"))
            );
        }
    }

    #[tokio::test]
    async fn resync_full_overwrites_text() {
        let fetcher = FakeFetcher::default();
        let writer = FakeWriter::default();
        writer.insert(fake_bookmark(1, 1));

        resync_bookmarks(&fetcher, &writer, 1, vec![1], ResyncMode::Full, 4, |_| {})
            .await
            .unwrap();

        let m = writer.row(1).unwrap();
        assert_eq!(m.name, "Title of https://example.com/1");
        assert_eq!(m.description.as_deref(), Some("About https://example.com/1"));
    }

    #[tokio::test]
    async fn resync_checks_ownership() {
        let fetcher = FakeFetcher::default();
        let writer = FakeWriter::default();
        writer.insert(fake_bookmark(1, 1));
        writer.insert(fake_bookmark(2, 2));

        let report = resync_bookmarks(
            &fetcher,
            &writer,
            1,
            vec![2, 1, 99],
            ResyncMode::Full,
            2,
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(
            report.items.iter().map(|i| (i.id, i.success)).collect::<Vec<_>>(),
            vec![(Some(2), false), (Some(1), true), (Some(99), false)]
        );
        assert_eq!(report.items[0].error.as_deref(), Some("bookmark 2 not found"));
        assert_eq!(writer.row(2).unwrap().name, "Example");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deletes_owned_rows_only() {
        let writer = FakeWriter::default();
        writer.insert(fake_bookmark(1, 1));
        writer.insert(fake_bookmark(2, 2));

        let report = delete_bookmarks(&writer, 1, vec![1, 2], 3, |_| {})
            .await
            .unwrap();

        assert_eq!(report.message, "1 deleted, 1 failed");
        assert!(writer.row(1).is_none());
        assert!(writer.row(2).is_some());
    }

    #[tokio::test]
    async fn zero_concurrency_fails_the_batch() {
        let fetcher = FakeFetcher::default();
        let writer = FakeWriter::default();
        let rv = import_bookmarks(&fetcher, &writer, &target(), urls(2), 0, |_| {}).await;
        assert!(matches!(rv, Err(PipelineError::ZeroConcurrency)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
