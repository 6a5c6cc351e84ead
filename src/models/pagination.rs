use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;
pub const MAX_PAGE: i64 = 10_000;

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, starting at 1 (at most 10000)
    pub page: Option<i64>,
    /// Page size, at most 100
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn skip(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit()) as u64
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, query: &PageQuery, total: u64) -> Self {
        let limit = query.limit();
        Self {
            items,
            page: query.page(),
            limit,
            total,
            total_pages: total.div_ceil(limit as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_page_and_limit() {
        let q = PageQuery { page: Some(0), limit: Some(500) };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), MAX_LIMIT);
        assert_eq!(q.skip(), 0);

        let q = PageQuery { page: Some(3), limit: Some(10) };
        assert_eq!(q.skip(), 20);

        let q = PageQuery { page: Some(i64::MAX), limit: Some(20) };
        assert_eq!(q.page(), MAX_PAGE);
        assert_eq!(q.skip(), ((MAX_PAGE - 1) * 20) as u64);

        let q = PageQuery { page: Some(i64::MIN), limit: Some(i64::MAX) };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), MAX_LIMIT);
    }

    #[test]
    fn counts_pages() {
        let q = PageQuery { page: None, limit: Some(10) };
        assert_eq!(Paginated::new(vec![1, 2, 3], &q, 21).total_pages, 3);
        assert_eq!(Paginated::<i32>::new(vec![], &q, 0).total_pages, 0);
    }
}
