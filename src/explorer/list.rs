use anyhow::{anyhow, Result};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::numeric::{de_opt_u64, de_u64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    Cursor,
    Offset,
}

/// Sort direction as the backend spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum SortDirection {
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[default]
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// What the caller asked the backend for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PageRequest {
    Cursor {
        before: Option<String>,
        after: Option<String>,
        limit: u32,
    },
    Offset {
        page: u64,
        page_size: u32,
    },
}

impl PageRequest {
    pub fn cursor(before: Option<String>, after: Option<String>, limit: u32) -> Self {
        Self::Cursor {
            before: non_empty(before),
            after: non_empty(after),
            limit,
        }
    }

    /// Pages are 1-indexed; page 0 is read as the first page.
    pub fn offset(page: u64, page_size: u32) -> Self {
        Self::Offset {
            page: page.max(1),
            page_size,
        }
    }

    pub fn mode(&self) -> PaginationMode {
        match self {
            Self::Cursor { .. } => PaginationMode::Cursor,
            Self::Offset { .. } => PaginationMode::Offset,
        }
    }

    pub fn page_size(&self) -> u32 {
        match self {
            Self::Cursor { limit, .. } => *limit,
            Self::Offset { page_size, .. } => *page_size,
        }
    }

    /// Replaces a page size outside `allowed` with `default`.
    pub fn with_allowed_page_size(self, allowed: &[u32], default: u32) -> Self {
        let fix = |size: u32| {
            if allowed.contains(&size) {
                size
            } else {
                warn!("Page size {} not allowed, using {}", size, default);
                default
            }
        };
        match self {
            Self::Cursor {
                before,
                after,
                limit,
            } => Self::Cursor {
                before,
                after,
                limit: fix(limit),
            },
            Self::Offset { page, page_size } => Self::Offset {
                page,
                page_size: fix(page_size),
            },
        }
    }

    /// Query string parameters in the backend's wire format.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Cursor {
                before,
                after,
                limit,
            } => {
                let mut pairs = vec![("limit", limit.to_string())];
                if let Some(before) = before {
                    pairs.push(("before", before.clone()));
                }
                if let Some(after) = after {
                    pairs.push(("after", after.clone()));
                }
                pairs
            }
            Self::Offset { page, page_size } => vec![
                ("page", page.to_string()),
                ("page_size", page_size.to_string()),
            ],
        }
    }
}

/// Pagination state of a normalized page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PageInfo {
    Cursor {
        before: Option<String>,
        after: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Offset { page: u64, page_size: u32 },
}

/// A normalized, read-only page of list items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    items: Vec<T>,
    page_info: PageInfo,
    total_count: u64,
}

impl<T> ListPage<T> {
    /// A zero total is authoritative: items reported alongside it are dropped.
    pub fn new(items: Vec<T>, page_info: PageInfo, total_count: u64) -> Self {
        let items = if total_count == 0 && !items.is_empty() {
            warn!(
                "Backend reported a total of 0 with {} items, dropping them",
                items.len()
            );
            Vec::new()
        } else {
            items
        };
        Self {
            items,
            page_info,
            total_count,
        }
    }

    /// The page substituted when the backend could not be reached.
    pub fn empty(request: &PageRequest) -> Self {
        let page_info = match request {
            PageRequest::Cursor { before, after, .. } => PageInfo::Cursor {
                before: before.clone(),
                after: after.clone(),
            },
            PageRequest::Offset { page, page_size } => PageInfo::Offset {
                page: *page,
                page_size: *page_size,
            },
        };
        Self {
            items: Vec::new(),
            page_info,
            total_count: 0,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn page_info(&self) -> &PageInfo {
        &self.page_info
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Converts every item, keeping the page info and total.
    pub fn map<U, F>(self, f: F) -> ListPage<U>
    where
        F: FnMut(T) -> U,
    {
        ListPage {
            items: self.items.into_iter().map(f).collect(),
            page_info: self.page_info,
            total_count: self.total_count,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCursorMetadata {
    #[serde(default, deserialize_with = "de_u64")]
    pub total_count: u64,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
}

/// `{ entries, metadata: { total_count, before, after } }`
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de>"))]
pub struct RawCursorList<R> {
    #[serde(alias = "records")]
    pub entries: Vec<R>,
    #[serde(default)]
    pub metadata: RawCursorMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOffsetMeta {
    #[serde(default, alias = "total_count", deserialize_with = "de_opt_u64")]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub page: Option<u64>,
}

/// `{ records, total, page }`, optionally with the counters nested in `meta`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de>"))]
pub struct RawOffsetList<R> {
    #[serde(alias = "data", alias = "txs", alias = "entries")]
    pub records: Vec<R>,
    #[serde(default, alias = "total_count", deserialize_with = "de_opt_u64")]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub page: Option<u64>,
    #[serde(default)]
    pub meta: Option<RawOffsetMeta>,
}

/// A raw paginated response in one of the two backend shapes.
#[derive(Debug, Clone)]
pub enum RawListResponse<R> {
    Cursor(RawCursorList<R>),
    Offset(RawOffsetList<R>),
}

impl<R: DeserializeOwned> RawListResponse<R> {
    /// Decodes a response body in the shape used by `mode`.
    pub fn decode(value: Value, mode: PaginationMode) -> Result<Self> {
        match mode {
            PaginationMode::Cursor => serde_json::from_value(value)
                .map(Self::Cursor)
                .map_err(|e| anyhow!("Failed to decode cursor list: {}", e)),
            PaginationMode::Offset => serde_json::from_value(value)
                .map(Self::Offset)
                .map_err(|e| anyhow!("Failed to decode offset list: {}", e)),
        }
    }
}

/// Maps a raw list response onto a `ListPage`, adapting each item with `Into`.
///
/// Items keep the backend's order. For offset lists the page size is the one
/// the caller requested, since the backend does not always echo it.
pub fn normalize<R, T>(raw: RawListResponse<R>, request: &PageRequest) -> ListPage<T>
where
    R: Into<T>,
{
    match raw {
        RawListResponse::Cursor(list) => {
            let items = list.entries.into_iter().map(Into::into).collect();
            let page_info = PageInfo::Cursor {
                before: non_empty(list.metadata.before),
                after: non_empty(list.metadata.after),
            };
            ListPage::new(items, page_info, list.metadata.total_count)
        }
        RawListResponse::Offset(list) => {
            let meta = list.meta.unwrap_or_default();
            let total = list.total.or(meta.total).unwrap_or_default();
            let requested_page = match request {
                PageRequest::Offset { page, .. } => *page,
                PageRequest::Cursor { .. } => 1,
            };
            let page = list
                .page
                .or(meta.page)
                .filter(|page| *page > 0)
                .unwrap_or(requested_page);
            let page_size = request.page_size();
            let items = list.records.into_iter().map(Into::into).collect();
            ListPage::new(items, PageInfo::Offset { page, page_size }, total)
        }
    }
}

fn non_empty(cursor: Option<String>) -> Option<String> {
    cursor.filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value, mode: PaginationMode) -> RawListResponse<Value> {
        RawListResponse::decode(value, mode).unwrap()
    }

    #[test]
    fn test_empty_cursor_list() {
        let raw = decode(
            json!({ "entries": [], "metadata": { "total_count": "0", "before": null, "after": null } }),
            PaginationMode::Cursor,
        );
        let page: ListPage<Value> = normalize(raw, &PageRequest::cursor(None, None, 20));

        assert!(page.items().is_empty());
        assert_eq!(page.total_count(), 0);
        assert_eq!(
            page.page_info(),
            &PageInfo::Cursor {
                before: None,
                after: None
            }
        );
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({
                "items": [],
                "pageInfo": { "mode": "cursor", "before": null, "after": null },
                "totalCount": 0
            })
        );
    }

    #[test]
    fn test_cursor_list_keeps_cursors_and_order() {
        let raw = decode(
            json!({
                "entries": [{ "name": "b" }, { "name": "a" }, { "name": "c" }],
                "metadata": { "total_count": 31, "before": "", "after": "g3QAAAAB" }
            }),
            PaginationMode::Cursor,
        );
        let page: ListPage<Value> = normalize(raw, &PageRequest::cursor(None, None, 3));

        let names: Vec<&str> = page
            .items()
            .iter()
            .map(|item| item["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert_eq!(page.total_count(), 31);
        assert_eq!(
            page.page_info(),
            &PageInfo::Cursor {
                before: None,
                after: Some("g3QAAAAB".to_string())
            }
        );
    }

    #[test]
    fn test_offset_list_preserves_requested_page_size() {
        let raw = decode(
            json!({ "records": [{ "hash": "tx1" }, { "hash": "tx2" }], "total": "57", "page": "2" }),
            PaginationMode::Offset,
        );
        let page: ListPage<Value> = normalize(raw, &PageRequest::offset(2, 10));

        assert_eq!(page.items(), &[json!({ "hash": "tx1" }), json!({ "hash": "tx2" })]);
        assert_eq!(page.total_count(), 57);
        assert_eq!(
            page.page_info(),
            &PageInfo::Offset {
                page: 2,
                page_size: 10
            }
        );
        assert_eq!(
            serde_json::to_value(page.page_info()).unwrap(),
            json!({ "mode": "offset", "page": 2, "pageSize": 10 })
        );
    }

    #[test]
    fn test_offset_list_with_nested_meta() {
        let raw = decode(
            json!({ "data": [{ "id": 1 }], "meta": { "total": 41, "page": 5 } }),
            PaginationMode::Offset,
        );
        let page: ListPage<Value> = normalize(raw, &PageRequest::offset(5, 10));
        assert_eq!(page.total_count(), 41);
        assert_eq!(
            page.page_info(),
            &PageInfo::Offset {
                page: 5,
                page_size: 10
            }
        );
    }

    #[test]
    fn test_offset_page_falls_back_to_request() {
        let raw = decode(json!({ "txs": [{ "id": 1 }], "total_count": 3 }), PaginationMode::Offset);
        let page: ListPage<Value> = normalize(raw, &PageRequest::offset(3, 50));
        assert_eq!(
            page.page_info(),
            &PageInfo::Offset {
                page: 3,
                page_size: 50
            }
        );
    }

    #[test]
    fn test_zero_total_means_no_items() {
        let raw = decode(
            json!({ "records": [{ "id": 1 }], "total": 0, "page": 1 }),
            PaginationMode::Offset,
        );
        let page: ListPage<Value> = normalize(raw, &PageRequest::offset(1, 10));
        assert_eq!(page.total_count(), 0);
        assert!(page.items().is_empty());
    }

    #[test]
    fn test_map_keeps_order_and_page_info() {
        let raw = decode(
            json!({ "records": [{ "id": 2 }, { "id": 1 }], "total": 7, "page": 2 }),
            PaginationMode::Offset,
        );
        let page: ListPage<Value> = normalize(raw, &PageRequest::offset(2, 10));
        let ids = page.map(|item| item["id"].as_u64().unwrap_or_default());
        assert_eq!(ids.items(), [2u64, 1].as_slice());
        assert_eq!(ids.total_count(), 7);
        assert_eq!(
            ids.page_info(),
            &PageInfo::Offset {
                page: 2,
                page_size: 10
            }
        );
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let body = json!({ "records": [{ "id": 1 }, { "id": 2 }], "total": 2, "page": 1 });
        let request = PageRequest::offset(1, 20);
        let first: ListPage<Value> =
            normalize(decode(body.clone(), PaginationMode::Offset), &request);
        let second: ListPage<Value> = normalize(decode(body, PaginationMode::Offset), &request);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_page_echoes_request() {
        let cursor = PageRequest::cursor(None, Some("abc".to_string()), 20);
        let page: ListPage<Value> = ListPage::empty(&cursor);
        assert_eq!(page.total_count(), 0);
        assert_eq!(
            page.page_info(),
            &PageInfo::Cursor {
                before: None,
                after: Some("abc".to_string())
            }
        );

        let offset = PageRequest::offset(4, 10);
        let page: ListPage<Value> = ListPage::empty(&offset);
        assert!(page.items().is_empty());
        assert_eq!(
            page.page_info(),
            &PageInfo::Offset {
                page: 4,
                page_size: 10
            }
        );
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let result = RawListResponse::<Value>::decode(json!({ "total": 1 }), PaginationMode::Offset);
        assert!(result.is_err());
    }

    #[test]
    fn test_page_request_wire_format() {
        assert_eq!(
            PageRequest::offset(0, 20).query_pairs(),
            vec![("page", "1".to_string()), ("page_size", "20".to_string())]
        );
        assert_eq!(
            PageRequest::cursor(Some(String::new()), Some("x".to_string()), 10).query_pairs(),
            vec![("limit", "10".to_string()), ("after", "x".to_string())]
        );

        let clamped = PageRequest::offset(1, 33).with_allowed_page_size(&[10, 20, 50, 100], 20);
        assert_eq!(clamped.page_size(), 20);
    }

    #[test]
    fn test_sort_direction() {
        assert_eq!(SortDirection::default(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.as_str(), "DESC");
        assert_eq!(serde_json::to_value(SortDirection::Asc).unwrap(), json!("ASC"));
        let parsed: SortDirection = serde_json::from_value(json!("desc")).unwrap();
        assert_eq!(parsed, SortDirection::Desc);
    }
}
