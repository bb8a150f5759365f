use crate::api::Sheet;
use crate::Result;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// Wraps another `Sheet` and serves repeated reads of a table from memory for `ttl`. Any write to
/// a table drops its cached rows.
pub(super) struct CachedSheet {
    inner: Box<dyn Sheet + Send>,
    ttl: Duration,
    reads: HashMap<String, (Instant, Vec<Vec<String>>)>,
}

impl CachedSheet {
    pub(super) fn new(inner: Box<dyn Sheet + Send>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            reads: HashMap::new(),
        }
    }

    fn invalidate(&mut self, table: &str) {
        self.reads.remove(table);
    }
}

#[async_trait::async_trait]
impl Sheet for CachedSheet {
    async fn ensure_table(&mut self, table: &str, header: &[String]) -> Result<bool> {
        let written = self.inner.ensure_table(table, header).await?;
        if written {
            self.invalidate(table);
        }
        Ok(written)
    }

    async fn get_rows(&mut self, table: &str) -> Result<Vec<Vec<String>>> {
        if let Some((read_at, rows)) = self.reads.get(table) {
            if read_at.elapsed() < self.ttl {
                trace!("Serving {table} from the read cache");
                return Ok(rows.clone());
            }
        }
        let rows = self.inner.get_rows(table).await?;
        self.reads
            .insert(table.to_string(), (Instant::now(), rows.clone()));
        Ok(rows)
    }

    async fn append_row(&mut self, table: &str, row: &[String]) -> Result<()> {
        self.invalidate(table);
        self.inner.append_row(table, row).await
    }

    async fn update_range(
        &mut self,
        table: &str,
        start_row: usize,
        rows: &[Vec<String>],
    ) -> Result<()> {
        self.invalidate(table);
        self.inner.update_range(table, start_row, rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts the reads that reach the wrapped store.
    struct Counting {
        inner: TestSheet,
        reads: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Sheet for Counting {
        async fn ensure_table(&mut self, table: &str, header: &[String]) -> Result<bool> {
            self.inner.ensure_table(table, header).await
        }

        async fn get_rows(&mut self, table: &str) -> Result<Vec<Vec<String>>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_rows(table).await
        }

        async fn append_row(&mut self, table: &str, row: &[String]) -> Result<()> {
            self.inner.append_row(table, row).await
        }

        async fn update_range(
            &mut self,
            table: &str,
            start_row: usize,
            rows: &[Vec<String>],
        ) -> Result<()> {
            self.inner.update_range(table, start_row, rows).await
        }
    }

    fn cached(ttl: Duration) -> (CachedSheet, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let inner = Counting {
            inner: TestSheet::blank(uuid::Uuid::new_v4().to_string()),
            reads: reads.clone(),
        };
        (CachedSheet::new(Box::new(inner), ttl), reads)
    }

    #[tokio::test]
    async fn test_reads_are_cached_until_a_write() {
        let (mut sheet, reads) = cached(Duration::from_secs(60));
        let header = vec![String::from("Key"), String::from("Value")];
        sheet.ensure_table("T", &header).await.unwrap();

        assert_eq!(sheet.get_rows("T").await.unwrap().len(), 1);
        assert_eq!(sheet.get_rows("T").await.unwrap().len(), 1);
        assert_eq!(reads.load(Ordering::SeqCst), 1);

        sheet.append_row("T", &header).await.unwrap();
        assert_eq!(sheet.get_rows("T").await.unwrap().len(), 2);
        assert_eq!(reads.load(Ordering::SeqCst), 2);

        sheet.update_range("T", 3, &[header.clone()]).await.unwrap();
        assert_eq!(sheet.get_rows("T").await.unwrap().len(), 3);
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_caches() {
        let (mut sheet, reads) = cached(Duration::ZERO);
        sheet.ensure_table("T", &[String::from("A")]).await.unwrap();
        sheet.get_rows("T").await.unwrap();
        sheet.get_rows("T").await.unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }
}
