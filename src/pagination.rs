// Paginated collector shared by the reservation, bill and voucher streams
//
// Pages are requested one after the other until the service returns an empty page.
// There is no upper bound on the number of requests: a service that never returns
// an empty page keeps the loop running.

use std::future::Future;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    pub start: u64,
    pub step: u64,
    pub page_size: u64,
}

impl PageCursor {
    // REST paging: page numbers, one page at a time
    pub fn pages(first_page: u64, step: u64) -> Self {
        Self {
            start: first_page,
            step,
            page_size: 0,
        }
    }

    // GraphQL paging: offset plus limit, the offset step is independent of the limit
    pub fn offsets(limit: u64, step: u64) -> Self {
        Self {
            start: 0,
            step,
            page_size: limit,
        }
    }
}

// Calls `fetch_page` with the current cursor value and concatenates the pages in order
pub async fn collect_pages<T, E, F, Fut>(
    stream: &str,
    cursor: PageCursor,
    mut fetch_page: F,
) -> Result<Vec<T>, E>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let mut records = Vec::new();
    let mut position = cursor.start;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(position).await?;
        if page.is_empty() {
            break;
        }

        pages += 1;
        debug!(stream, position, received = page.len(), "collected page");
        records.extend(page);
        position += cursor.step;
    }

    debug!(stream, pages, total = records.len(), "pagination finished");
    Ok(records)
}
