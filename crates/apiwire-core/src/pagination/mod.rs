//! Page-by-page traversal of list endpoints.
//!
//! `Pages` drives `Client::execute` with `page=1, 2, ...` and a fixed
//! `per_page`, one request per `next()`. `Paginator` flattens the pages into
//! items. Both stop for good after the last page or the first error.

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::client::Client;
use crate::envelope;
use crate::error::ApiError;
use crate::request::Request;

pub const PAGE_PARAM: &str = "page";
pub const PER_PAGE_PARAM: &str = "per_page";

/// `result_info` block of a list response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultInfo {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    /// Items on this page. Filled from the decoded items when the server omits it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(alias = "total", skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u32>,
}

impl ResultInfo {
    /// True when no page follows this one.
    ///
    /// With a non-zero `total_pages` the page number decides. Otherwise a short page
    /// (`count < per_page`) is the last one; `requested_per_page` stands in
    /// when the server did not echo `per_page`.
    pub fn is_last_page(&self, requested_per_page: u32) -> bool {
        match self.total_pages {
            Some(total) if total > 0 => self.page >= total,
            _ => {
                let per_page = if self.per_page == 0 {
                    requested_per_page
                } else {
                    self.per_page
                };
                // Without a count nothing says the page was short; an empty page ends the walk.
                self.count.map_or(false, |count| count < per_page)
            }
        }
    }
}

/// One decoded page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: ResultInfo,
}

/// Lazy iterator over the pages of a list endpoint.
pub struct Pages<T> {
    client: Client,
    cancel: CancelToken,
    template: Request,
    operation: String,
    per_page: u32,
    next_page: u32,
    fetched: u32,
    done: bool,
    _items: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Pages<T> {
    pub fn new(client: Client, cancel: CancelToken, template: Request, per_page: u32) -> Self {
        let operation = template.operation_name();
        Self {
            client,
            cancel,
            template,
            operation,
            per_page: per_page.max(1),
            next_page: 1,
            fetched: 0,
            done: false,
            _items: PhantomData,
        }
    }

    /// Requests that returned a decodable page so far.
    pub fn pages_fetched(&self) -> u32 {
        self.fetched
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    fn fetch(&self, page: u32) -> Result<Page<T>, ApiError> {
        let operation = format!("{} (page {})", self.operation, page);
        let request = self
            .template
            .with_query_replaced(PAGE_PARAM, page.to_string())
            .with_query_replaced(PER_PAGE_PARAM, self.per_page.to_string())
            .operation(operation.as_str());

        let response = self.client.execute(&self.cancel, &request)?;
        let env = envelope::decode::<Vec<T>>(&operation, &response.body)?;
        let items = env.result.unwrap_or_default();
        let mut info = env.result_info.unwrap_or(ResultInfo {
            page,
            per_page: self.per_page,
            total_pages: None,
            count: None,
            total_count: None,
        });
        if info.page == 0 {
            info.page = page;
        }
        info.count.get_or_insert(items.len() as u32);
        Ok(Page { items, info })
    }
}

impl<T: DeserializeOwned> Iterator for Pages<T> {
    type Item = Result<Page<T>, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let page = self.next_page;
        match self.fetch(page) {
            Ok(p) => {
                self.fetched += 1;
                // An empty page ends the walk even if the metadata says otherwise.
                let last = p.items.is_empty() || p.info.is_last_page(self.per_page);
                match page.checked_add(1) {
                    Some(next) if !last => self.next_page = next,
                    _ => self.done = true,
                }
                tracing::debug!(
                    operation = %self.operation,
                    page,
                    items = p.items.len(),
                    total_pages = ?p.info.total_pages,
                    last,
                    "page fetched"
                );
                Some(Ok(p))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<T: DeserializeOwned> FusedIterator for Pages<T> {}

/// Items of every page, in page order. Yields at most one error, then ends.
pub struct Paginator<T> {
    pages: Pages<T>,
    buffered: VecDeque<T>,
}

impl<T: DeserializeOwned> Paginator<T> {
    pub fn new(pages: Pages<T>) -> Self {
        Self {
            pages,
            buffered: VecDeque::new(),
        }
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages.pages_fetched()
    }

    /// Drain every page into one vector, or return the first page error.
    pub fn collect_all(self) -> Result<Vec<T>, ApiError> {
        self.collect()
    }
}

impl<T: DeserializeOwned> Iterator for Paginator<T> {
    type Item = Result<T, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Some(Ok(item));
            }
            match self.pages.next()? {
                Ok(page) => self.buffered.extend(page.items),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<T: DeserializeOwned> FusedIterator for Paginator<T> {}
