use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

use crate::api::client::Lenient;

/// A page as the backend sends it. The usual shape is a Spring-style page
/// object with `content`; older endpoints answer with a bare array or put the
/// rows under `items` or `data`.
///
/// Decoding never fails on shape: fields of the wrong type are ignored, rows
/// that do not decode are skipped, and anything else is an empty page.
#[derive(Debug, Clone)]
pub enum PagePayload<T> {
    Items(Vec<T>),
    Envelope(PageEnvelope<T>),
}

#[derive(Debug, Clone)]
pub struct PageEnvelope<T> {
    pub content: Option<Vec<T>>,
    pub items: Option<Vec<T>>,
    pub data: Option<Vec<T>>,
    pub last: Option<bool>,
    pub number: Option<u32>,
    pub total_pages: Option<u32>,
    pub size: Option<u32>,
    pub number_of_elements: Option<u32>,
}

impl<T> Default for PageEnvelope<T> {
    fn default() -> Self {
        Self {
            content: None,
            items: None,
            data: None,
            last: None,
            number: None,
            total_pages: None,
            size: None,
            number_of_elements: None,
        }
    }
}

type RawRows<T> = Vec<Lenient<T>>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope<T> {
    content: Option<Lenient<RawRows<T>>>,
    items: Option<Lenient<RawRows<T>>>,
    data: Option<Lenient<RawRows<T>>>,
    last: Option<Lenient<bool>>,
    number: Option<Lenient<u32>>,
    total_pages: Option<Lenient<u32>>,
    size: Option<Lenient<u32>>,
    number_of_elements: Option<Lenient<u32>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPayload<T> {
    Rows(RawRows<T>),
    Envelope(RawEnvelope<T>),
    Other(IgnoredAny),
}

fn rows<T>(raw: RawRows<T>) -> Vec<T> {
    let total = raw.len();
    let rows: Vec<T> = raw.into_iter().filter_map(Lenient::into_option).collect();
    if rows.len() < total {
        tracing::warn!("Skipped {} malformed rows out of {}", total - rows.len(), total);
    }
    rows
}

fn array<T>(field: Option<Lenient<RawRows<T>>>) -> Option<Vec<T>> {
    field.and_then(Lenient::into_option).map(rows)
}

fn scalar<V>(field: Option<Lenient<V>>) -> Option<V> {
    field.and_then(Lenient::into_option)
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for PagePayload<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match RawPayload::<T>::deserialize(deserializer)? {
            RawPayload::Rows(raw) => PagePayload::Items(rows(raw)),
            RawPayload::Envelope(raw) => PagePayload::Envelope(PageEnvelope {
                content: array(raw.content),
                items: array(raw.items),
                data: array(raw.data),
                last: scalar(raw.last),
                number: scalar(raw.number),
                total_pages: scalar(raw.total_pages),
                size: scalar(raw.size),
                number_of_elements: scalar(raw.number_of_elements),
            }),
            RawPayload::Other(_) => {
                tracing::warn!("Page body has no rows, treating it as empty");
                PagePayload::Items(Vec::new())
            }
        })
    }
}

/// What a fetch hands back to the page: the rows of this page plus enough
/// paging information to decide whether to keep loading.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSummary<T> {
    pub content: Vec<T>,
    pub is_last_page: bool,
    pub page_number: u32,
    pub total_pages: Option<u32>,
    pub page_size: Option<u32>,
}

impl<T> PageSummary<T> {
    /// Whether the page that produced this summary was the end of the list.
    pub fn exhausted(&self) -> bool {
        self.is_last_page || self.content.is_empty()
    }
}

impl<T> PagePayload<T> {
    /// A Spring-style page, mostly for fixtures.
    pub fn page(content: Vec<T>, number: u32, total_pages: u32) -> Self {
        PagePayload::Envelope(PageEnvelope {
            number_of_elements: Some(content.len() as u32),
            last: Some(number + 1 >= total_pages),
            number: Some(number),
            total_pages: Some(total_pages),
            content: Some(content),
            ..Default::default()
        })
    }

    /// Flattens any accepted shape into an ordered row sequence.
    ///
    /// # Arguments
    ///
    /// * `requested_page` - Page number that was asked for, used when the
    ///   payload does not say which page it is.
    pub fn normalize(self, requested_page: u32) -> PageSummary<T> {
        match self {
            PagePayload::Items(items) => PageSummary {
                page_size: Some(items.len() as u32),
                content: items,
                is_last_page: true,
                page_number: requested_page,
                total_pages: None,
            },
            PagePayload::Envelope(envelope) => {
                let is_last_page = envelope.last.unwrap_or(match (envelope.number, envelope.total_pages) {
                    (Some(number), Some(total)) => number + 1 >= total,
                    _ => false,
                });
                PageSummary {
                    content: envelope
                        .content
                        .or(envelope.items)
                        .or(envelope.data)
                        .unwrap_or_default(),
                    is_last_page,
                    page_number: envelope.number.unwrap_or(requested_page),
                    total_pages: envelope.total_pages,
                    page_size: envelope.size,
                }
            }
        }
    }
}

/// Result of one list fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// The page was applied to the list.
    Loaded(PageSummary<T>),
    /// The fetch failed; the message is already stored as the list error.
    Failed(String),
    /// A newer fetch was issued for the same list; this response was dropped.
    Superseded,
    /// The list was closed before the response arrived; it was dropped.
    Detached,
}

impl<T> FetchOutcome<T> {
    pub fn summary(&self) -> Option<&PageSummary<T>> {
        match self {
            FetchOutcome::Loaded(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, FetchOutcome::Loaded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Row {
        id: u32,
    }

    fn ids(summary: &PageSummary<Row>) -> Vec<u32> {
        summary.content.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_spring_page_object() {
        let payload: PagePayload<Row> = sonic_rs::from_str(
            r#"{"content":[{"id":1},{"id":2}],"last":false,"number":0,"totalPages":3,"size":2,"numberOfElements":2}"#,
        )
        .unwrap();
        let summary = payload.normalize(0);

        assert_eq!(ids(&summary), vec![1, 2]);
        assert!(!summary.is_last_page);
        assert_eq!(summary.total_pages, Some(3));
        assert_eq!(summary.page_size, Some(2));
    }

    #[test]
    fn test_bare_array_is_a_single_last_page() {
        let payload: PagePayload<Row> = sonic_rs::from_str(r#"[{"id":4}]"#).unwrap();
        let summary = payload.normalize(0);

        assert_eq!(ids(&summary), vec![4]);
        assert!(summary.is_last_page);
    }

    #[test]
    fn test_items_and_data_fallbacks() {
        let items: PagePayload<Row> = sonic_rs::from_str(r#"{"items":[{"id":5}]}"#).unwrap();
        assert_eq!(ids(&items.normalize(1)), vec![5]);

        let data: PagePayload<Row> = sonic_rs::from_str(r#"{"data":[{"id":6}],"number":1,"totalPages":2}"#).unwrap();
        let summary = data.normalize(1);
        assert_eq!(ids(&summary), vec![6]);
        assert!(summary.is_last_page);
    }

    #[test]
    fn test_wrong_typed_content_falls_through_to_items() {
        let payload: PagePayload<Row> =
            sonic_rs::from_str(r#"{"content":"n/a","items":[{"id":1}],"last":"maybe","number":-1}"#).unwrap();
        let summary = payload.normalize(2);

        assert_eq!(ids(&summary), vec![1]);
        assert!(!summary.is_last_page);
        assert_eq!(summary.page_number, 2);
    }

    #[test]
    fn test_scalar_body_is_an_empty_page() {
        for body in [r#""no results""#, "42", "true"] {
            let payload: PagePayload<Row> = sonic_rs::from_str(body).unwrap();
            let summary = payload.normalize(0);
            assert!(summary.content.is_empty(), "{}", body);
            assert!(summary.exhausted());
        }
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let payload: PagePayload<Row> =
            sonic_rs::from_str(r#"{"content":[{"id":1},{"id":"two"},7,{"id":3}],"last":true}"#).unwrap();
        assert_eq!(ids(&payload.normalize(0)), vec![1, 3]);

        let bare: PagePayload<Row> = sonic_rs::from_str(r#"[{"id":"x"},{"id":9}]"#).unwrap();
        assert_eq!(ids(&bare.normalize(0)), vec![9]);
    }

    #[test]
    fn test_unknown_shape_is_empty() {
        let payload: PagePayload<Row> = sonic_rs::from_str(r#"{"rows":[{"id":1}]}"#).unwrap();
        let summary = payload.normalize(3);

        assert!(summary.content.is_empty());
        assert!(summary.exhausted());
        assert_eq!(summary.page_number, 3);
    }
}
