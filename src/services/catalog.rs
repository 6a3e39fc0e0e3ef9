use crate::config::PAGE_SIZE;
use crate::db::DatasetRepository;
use crate::error::CatalogResult;
use crate::models::Dataset;

/// One page of a listing or search.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Dataset>,
    /// 1-based, already clamped into `1..=num_pages`.
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
}

impl Page {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}

pub fn num_pages(total: i64, page_size: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + page_size - 1) / page_size
    }
}

/// Missing, unparsable or sub-1 page numbers select page 1; numbers past the
/// end select the last page.
pub fn clamp_page(requested: Option<&str>, num_pages: i64) -> i64 {
    let requested = requested
        .and_then(|p| p.trim().parse::<i64>().ok())
        .unwrap_or(1);
    requested.clamp(1, num_pages.max(1))
}

/// Lists datasets newest first, or searches when `query` is non-blank.
pub async fn handle_list(
    repo: &dyn DatasetRepository,
    query: Option<&str>,
    page: Option<&str>,
) -> CatalogResult<Page> {
    let query = query.map(str::trim).filter(|q| !q.is_empty());
    let total = repo.count(query).await?;
    let num_pages = num_pages(total, PAGE_SIZE);
    let number = clamp_page(page, num_pages);
    let offset = (number - 1) * PAGE_SIZE;

    let items = match query {
        Some(q) => repo.search(q, offset, PAGE_SIZE).await?,
        None => repo.list_ordered(offset, PAGE_SIZE).await?,
    };

    Ok(Page {
        items,
        number,
        num_pages,
        total,
    })
}
